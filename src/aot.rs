//! Ahead-of-time type manifest.
//!
//! Toolchains that cannot instantiate generics at run time need every
//! concrete profile and unit type spelled out in advance. [`AotGenerator`]
//! walks the registered assemblies without building profiles and renders
//! one type alias per concrete instantiation. Types that cannot be named
//! from outside their module are replaced by the substitutes in this
//! module, or dropped and logged when no substitute exists.

use std::{
    collections::HashSet,
    fmt::Write as _,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    Assembly, Config, Error, ErrorLog, Label, MemberInfo, Reflect, Result, TypeInfo, TypeKind,
    config::DEFAULT_AOT_FILE, profiles::generic_descriptors, type_name::TypeNameCache,
};

/// Stand-in for inaccessible reference types and static-only types.
#[derive(Debug, Clone, Copy, Default)]
pub struct Object;

impl Reflect for Object {
    fn type_info() -> TypeInfo {
        TypeInfo::reference("Object", "lookout::aot::Object")
    }
}

macro_rules! enum_surrogate {
    ($($name:ident: $repr:ty),* $(,)?) => {
        $(
            #[doc = concat!("Stand-in for inaccessible fieldless enums stored as `", stringify!($repr), "`.")]
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
            #[repr(transparent)]
            pub struct $name(pub $repr);

            impl Reflect for $name {
                fn type_info() -> TypeInfo {
                    TypeInfo::enumeration(
                        stringify!($name),
                        concat!("lookout::aot::", stringify!($name)),
                        size_of::<$repr>(),
                    )
                }
            }
        )*
    };
}

enum_surrogate!(Enum8: u8, Enum16: u16, Enum32: u32, Enum64: u64);

/// The type to use in generated code in place of `info`.
///
/// Accessible types are used as they are. Reference kinds and static-only
/// types become [`Object`], enums become the surrogate of the same size.
/// Inaccessible value types have no substitute.
pub fn check_type(info: &TypeInfo) -> Option<TypeInfo> {
    if info.is_accessible() {
        return Some(info.clone());
    }
    if info.is_static() || info.kind() == TypeKind::Reference {
        return Some(Object::type_info());
    }
    match info.kind() {
        TypeKind::Enum { size: 1 } => Some(Enum8::type_info()),
        TypeKind::Enum { size: 2 } => Some(Enum16::type_info()),
        TypeKind::Enum { size: 4 } => Some(Enum32::type_info()),
        TypeKind::Enum { size: 8 } => Some(Enum64::type_info()),
        _ => None,
    }
}

/// Targets always sit behind `Rc<RefCell<_>>`.
fn check_target(info: &TypeInfo) -> TypeInfo {
    if info.is_accessible() {
        info.clone()
    } else {
        Object::type_info()
    }
}

/// One generated type: the substituted full definition and the raw
/// definition it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeDefinition {
    pub full: String,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AotReport {
    pub path: PathBuf,
    pub definitions: Vec<TypeDefinition>,
    pub errors: Vec<String>,
}

#[cfg(feature = "serde")]
impl AotReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Collects type definitions and writes the manifest.
#[derive(Debug)]
pub struct AotGenerator {
    names: Arc<TypeNameCache>,
    definitions: Vec<TypeDefinition>,
    seen: HashSet<TypeDefinition>,
    errors: ErrorLog,
}

impl Default for AotGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl AotGenerator {
    pub fn new() -> Self {
        Self::with_cache(Arc::new(TypeNameCache::new()))
    }

    /// Share the type-name cache of a running manager.
    pub fn with_cache(names: Arc<TypeNameCache>) -> Self {
        Self {
            names,
            definitions: Vec::new(),
            seen: HashSet::new(),
            errors: ErrorLog::new(),
        }
    }

    /// Add the definitions of every monitored member of `assemblies`.
    pub fn collect(&mut self, assemblies: &[Assembly], config: &Config) -> &[TypeDefinition] {
        for assembly in assemblies {
            if assembly.is_editor_only()
                || assembly.is_monitoring_disabled()
                || config.is_assembly_excluded(assembly.name())
            {
                tracing::debug!(assembly = %assembly.label(), "assembly skipped by AOT generation");
                continue;
            }
            for entry in assembly.types() {
                if entry.is_monitoring_disabled() {
                    continue;
                }
                for member in entry.members() {
                    self.add_member(member.info());
                }
            }
        }
        &self.definitions
    }

    fn add_member(&mut self, member: &MemberInfo) {
        let mut resolved = true;
        for param in member.parameters() {
            resolved &= self.resolve(param.type_info()).is_some();
        }
        let Some(value) = self.resolve(member.value_type()) else {
            return;
        };
        if !resolved {
            return;
        }

        let declaring = member.declaring_type();
        let full = generic_descriptors(member.kind(), check_target(declaring), value);
        let raw = generic_descriptors(member.kind(), declaring.clone(), member.value_type().clone());
        for (full, raw) in full.iter().zip(raw.iter()) {
            let definition = TypeDefinition {
                full: self.names.full_name(full).to_string(),
                raw: raw.syntax_name(),
            };
            if self.seen.insert(definition.clone()) {
                self.definitions.push(definition);
            }
        }
    }

    fn resolve(&self, info: &TypeInfo) -> Option<TypeInfo> {
        let checked = check_type(info);
        if checked.is_none() {
            self.errors.record(Error::inaccessible(info));
        }
        checked
    }

    pub fn definitions(&self) -> &[TypeDefinition] {
        &self.definitions
    }

    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    /// The manifest source: a header followed by one alias per definition.
    pub fn render_manifest(&self) -> String {
        let mut out = String::new();
        out.push_str("// ---------- AUTOGENERATED CONTENT, DO NOT EDIT ----------\n");
        out.push_str("// ---------- AOT TYPE MANIFEST ----------\n");
        let _ = writeln!(out, "// lookout {}", env!("CARGO_PKG_VERSION"));
        for (index, definition) in self.definitions.iter().enumerate() {
            let _ = write!(
                out,
                "\n// {}\n#[allow(dead_code)]\npub type AotGeneratedType{index} = {};\n",
                definition.raw, definition.full
            );
        }
        out
    }

    /// Write the manifest to the configured path.
    ///
    /// Paths that are not `.rs` files are replaced by `lookout_aot.rs`.
    /// In strict mode, collected errors fail the generation after the file
    /// has been written.
    pub fn generate(&self, config: &Config) -> Result<AotReport> {
        let path = manifest_path(&config.aot_output_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.render_manifest())?;
        tracing::info!(
            path = %path.display(),
            definitions = self.definitions.len(),
            errors = self.errors.len(),
            "AOT type manifest written"
        );

        if config.strict_type_generation && !self.errors.is_empty() {
            return Err(Error::TypeGeneration(self.errors.len()));
        }
        Ok(AotReport {
            path,
            definitions: self.definitions.clone(),
            errors: self.errors.entries().iter().map(ToString::to_string).collect(),
        })
    }
}

fn manifest_path(configured: &Path) -> PathBuf {
    if configured.extension().is_some_and(|ext| ext == "rs") {
        configured.to_path_buf()
    } else {
        PathBuf::from(DEFAULT_AOT_FILE)
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write;

    use super::*;
    use crate::{Members, Monitored, Visibility};

    struct Hidden;

    impl Reflect for Hidden {
        fn type_info() -> TypeInfo {
            TypeInfo::reference("Hidden", "game::Hidden").with_visibility(Visibility::Private)
        }
    }

    #[derive(Default)]
    struct Tint(u32);

    impl Reflect for Tint {
        fn type_info() -> TypeInfo {
            TypeInfo::value("Tint", "game::Tint").with_visibility(Visibility::Restricted)
        }
    }

    impl crate::Inspect for Tint {
        fn inspect(&self, _: &crate::RenderSpec, out: &mut String) {
            let _ = write!(out, "#{:06x}", self.0);
        }
    }

    #[derive(Default)]
    struct Lamp {
        lit: bool,
        tint: Tint,
    }

    impl Reflect for Lamp {
        fn type_info() -> TypeInfo {
            TypeInfo::reference("Lamp", "game::Lamp").with_visibility(Visibility::Private)
        }
    }

    impl Monitored for Lamp {
        fn describe(members: &mut Members<Self>) {
            members.field("lit", |l: &Lamp| &l.lit);
            members.field("tint", |l: &Lamp| &l.tint);
            members.property("lit_again", |l: &Lamp| l.lit);
        }
    }

    #[test]
    fn substitutes_by_kind() {
        assert_eq!(check_type(&i32::type_info()), Some(i32::type_info()));
        assert_eq!(check_type(&Hidden::type_info()), Some(Object::type_info()));
        assert_eq!(check_type(&Tint::type_info()), None);

        let flags = TypeInfo::enumeration("Flags", "game::Flags", 2)
            .with_visibility(Visibility::Private);
        assert_eq!(check_type(&flags), Some(Enum16::type_info()));
        assert_eq!(size_of::<Enum16>(), 2);
        assert_eq!(Enum64::type_info().kind(), TypeKind::Enum { size: 8 });

        let holder = TypeInfo::value("Globals", "game::Globals")
            .with_visibility(Visibility::Private)
            .with_static(true);
        assert_eq!(check_type(&holder), Some(Object::type_info()));
    }

    #[test]
    fn collects_deduplicated_definitions() {
        let mut generator = AotGenerator::new();
        let assemblies = [Assembly::new("game").register::<Lamp>()];
        let definitions = generator.collect(&assemblies, &Config::default()).to_vec();

        assert_eq!(
            definitions[0].full,
            "lookout::profiles::FieldProfile<lookout::aot::Object, bool>"
        );
        assert_eq!(definitions[0].raw, "FieldProfile<Lamp, bool>");
        assert_eq!(
            definitions[1].full,
            "lookout::units::ValueUnit<lookout::aot::Object, bool>"
        );
        // `tint` has no substitute, `lit_again` reuses the unit definition.
        assert_eq!(definitions.len(), 3);
        assert_eq!(generator.errors().len(), 1);
    }

    #[test]
    fn skips_editor_only_and_disabled_assemblies() {
        let mut generator = AotGenerator::new();
        let assemblies = [
            Assembly::new("tools").register::<Lamp>().editor_only(true),
            Assembly::new("legacy").register::<Lamp>().disable_monitoring(true),
        ];
        assert!(generator.collect(&assemblies, &Config::default()).is_empty());
    }

    #[test]
    fn falls_back_to_default_file_name() {
        assert_eq!(manifest_path(Path::new("out/types.txt")), PathBuf::from(DEFAULT_AOT_FILE));
        assert_eq!(manifest_path(Path::new("out/types.rs")), PathBuf::from("out/types.rs"));
    }

    #[test]
    fn manifest_lists_aliases_with_raw_comment() {
        let mut generator = AotGenerator::new();
        generator.collect(&[Assembly::new("game").register::<Lamp>()], &Config::default());
        let manifest = generator.render_manifest();
        assert!(manifest.starts_with("// ---------- AUTOGENERATED CONTENT"));
        assert!(manifest.contains("// FieldProfile<Lamp, bool>\n"));
        assert!(manifest.contains(
            "pub type AotGeneratedType0 = lookout::profiles::FieldProfile<lookout::aot::Object, bool>;"
        ));
    }
}
