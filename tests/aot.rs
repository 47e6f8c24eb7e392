#![cfg(feature = "macros")]

use lookout::{
    Assembly, Config, Error, Members, Monitored, MonitoringManager, Reflect, TypeSyntax,
    aot::AotGenerator,
};

#[derive(Clone, Copy, Debug, Reflect)]
#[reflect(debug)]
#[allow(dead_code)]
enum Mood {
    Calm,
    Angry,
}

#[derive(Debug, Default, Reflect)]
#[reflect(debug)]
struct Pixel(u8, u8, u8);

#[derive(Reflect, Monitored)]
#[monitor(describe = "Npc::extra")]
pub struct Npc {
    #[monitor]
    name: String,
    #[monitor]
    mood: Mood,
    #[monitor]
    tint: Pixel,
}

impl Npc {
    fn extra(members: &mut Members<Self>) {
        members.property("shouting", |npc: &Npc| matches!(npc.mood, Mood::Angry));
    }
}

#[derive(Reflect, Monitored)]
#[reflect(reference)]
struct Camp {
    #[monitor]
    fires: Vec<u16>,
}

fn assemblies() -> Vec<Assembly> {
    vec![
        Assembly::new("world").register::<Npc>().register::<Camp>(),
        Assembly::new("editor_tools")
            .register::<Npc>()
            .editor_only(true),
    ]
}

#[test]
fn definitions_round_trip_through_parser() {
    let mut generator = AotGenerator::new();
    let definitions = generator.collect(&assemblies(), &Config::default()).to_vec();
    assert!(!definitions.is_empty());

    for definition in &definitions {
        let parsed = TypeSyntax::parse(&definition.full).expect("parsable definition");
        assert_eq!(parsed.to_string(), definition.full);
        let raw = TypeSyntax::parse(&definition.raw).expect("parsable raw definition");
        assert_eq!(raw.to_string(), definition.raw);
    }
}

#[test]
fn substitutes_private_types() {
    let mut generator = AotGenerator::new();
    let definitions = generator.collect(&assemblies(), &Config::default()).to_vec();

    let mood = definitions
        .iter()
        .find(|d| d.raw == "FieldProfile<Npc, Mood>")
        .expect("mood definition");
    assert_eq!(
        mood.full,
        "lookout::profiles::FieldProfile<aot::Npc, lookout::aot::Enum8>"
    );

    let camp = definitions
        .iter()
        .find(|d| d.raw == "FieldProfile<Camp, Vec<u16>>")
        .expect("camp definition");
    assert_eq!(
        camp.full,
        "lookout::profiles::FieldProfile<lookout::aot::Object, std::vec::Vec<u16>>"
    );

    // `Pixel` is a private value type without a substitute.
    assert!(definitions.iter().all(|d| !d.raw.contains("Pixel")));
    assert_eq!(generator.errors().len(), 1);
}

#[test]
fn writes_manifest_and_creates_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("generated").join("types.rs");
    let config = Config::default().with_aot_output_path(&path);

    let manager = MonitoringManager::new(config);
    let report = manager.generate_aot(&assemblies()).unwrap();
    assert_eq!(report.path, path);
    assert_eq!(report.errors.len(), 1);

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("pub type AotGeneratedType0 = "));
    assert_eq!(
        written.matches("pub type AotGeneratedType").count(),
        report.definitions.len()
    );
    assert!(!manager.type_names().is_empty());
}

#[test]
fn strict_mode_fails_after_writing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strict.rs");
    let config = Config::default()
        .with_aot_output_path(&path)
        .with_strict_type_generation(true);

    let mut generator = AotGenerator::new();
    generator.collect(&assemblies(), &config);
    assert!(matches!(generator.generate(&config), Err(Error::TypeGeneration(1))));
    assert!(path.exists());
}

#[cfg(feature = "serde")]
#[test]
fn report_serializes_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default().with_aot_output_path(dir.path().join("json.rs"));
    let mut generator = AotGenerator::new();
    generator.collect(&assemblies(), &config);
    let json = generator.generate(&config).unwrap().to_json().unwrap();
    assert!(json.contains("\"definitions\""));
}
