#![cfg(feature = "macros")]

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use lookout::{
    Assembly, Config, Error, Members, MonitorUnit, Monitored, MonitoringManager, Reflect,
    UiPosition, UnitStatus, profiles::Arguments,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

thread_local! {
    static FRAME: Cell<i32> = const { Cell::new(0) };
}

#[derive(Reflect, Monitored)]
#[monitor(describe = "Player::describe_more")]
pub struct Player {
    #[monitor(label = "HP", format = "N0")]
    health: i32,
    #[monitor(position = "upper_right", element_indent = 4)]
    inventory: Vec<String>,
    speed: f32,
}

impl Player {
    fn describe_more(members: &mut Members<Self>) {
        members.static_field("frame", || FRAME.with(Cell::get));
    }
}

#[derive(Reflect, Monitored)]
#[monitor(disable)]
pub struct Muted {
    #[monitor]
    level: u8,
}

#[derive(Debug, Reflect)]
#[reflect(debug)]
struct Hidden {
    x: i32,
}

#[derive(Reflect, Monitored)]
pub struct Holder {
    #[monitor]
    hidden: Hidden,
    #[monitor]
    visible: bool,
}

#[derive(Reflect, Monitored)]
#[monitor(describe = "Worker::methods")]
pub struct Worker {
    #[monitor]
    jobs: u32,
}

impl Worker {
    fn do_work(&self, code: &mut i32) {
        *code = 42;
    }

    fn methods(members: &mut Members<Self>) {
        members
            .method("do_work", |w: &Worker, args: &mut Arguments| {
                let mut code = 0;
                w.do_work(&mut code);
                args.set(0, code);
            })
            .out::<i32>("code");
    }
}

fn player() -> Rc<RefCell<Player>> {
    Rc::new(RefCell::new(Player {
        health: 12345,
        inventory: vec!["rope".into(), "lamp".into()],
        speed: 2.5,
    }))
}

#[test]
fn derived_attributes_shape_the_units() {
    init_tracing();
    let mut manager = MonitoringManager::new(Config::default());
    manager
        .run_profiling(&[Assembly::new("game").register::<Player>()])
        .unwrap();
    let player = player();
    assert_eq!(manager.register_instance(&player).unwrap(), 2);
    manager.refresh_all();

    let units = manager.units_for(&player);
    assert_eq!(units[0].cached_state(), "HP: 12,345");
    assert_eq!(units[0].profile().format().group(), Some("Player"));
    assert_eq!(units[1].cached_state(), "Inventory:\n    [0]: rope\n    [1]: lamp");
    assert_eq!(units[1].profile().format().position(), UiPosition::UpperRight);

    let _ = player.borrow().speed;
}

#[test]
fn static_field_follows_value_after_refresh() {
    let mut manager = MonitoringManager::new(Config::default());
    manager
        .run_profiling(&[Assembly::new("game").register::<Player>()])
        .unwrap();
    let frame = manager.static_units()[0].clone();

    FRAME.with(|f| f.set(10));
    manager.refresh_all();
    assert_eq!(frame.cached_state(), "Frame: 10");

    FRAME.with(|f| f.set(11));
    manager.refresh_all();
    assert_eq!(frame.cached_state(), "Frame: 11");
}

#[test]
fn disabled_assembly_and_type_produce_no_units() {
    let mut manager = MonitoringManager::new(Config::default());
    let report = manager
        .run_profiling(&[
            Assembly::new("legacy")
                .register::<Player>()
                .disable_monitoring(true),
            Assembly::new("game").register::<Muted>(),
        ])
        .unwrap();
    assert_eq!(report.types_profiled, 0);
    assert!(manager.static_units().is_empty());

    assert_eq!(manager.register_instance(&player()).unwrap(), 0);
    let muted = Rc::new(RefCell::new(Muted { level: 1 }));
    assert_eq!(manager.register_instance(&muted).unwrap(), 0);
    assert!(manager.instance_units().is_empty());
    let _ = muted.borrow().level;
}

#[test]
fn private_value_field_is_skipped_with_one_error() {
    let mut manager = MonitoringManager::new(Config::default());
    manager
        .run_profiling(&[Assembly::new("game").register::<Holder>()])
        .unwrap();

    let first = Rc::new(RefCell::new(Holder {
        hidden: Hidden { x: 1 },
        visible: true,
    }));
    let second = Rc::new(RefCell::new(Holder {
        hidden: Hidden { x: 2 },
        visible: false,
    }));
    manager.register_instance(&first).unwrap();
    manager.register_instance(&second).unwrap();

    assert_eq!(manager.profiles().len(), 1);
    assert_eq!(manager.units_for(&first).len(), 1);
    assert_eq!(manager.errors().len(), 1);
    assert!(matches!(
        &manager.errors().entries()[0],
        Error::InaccessibleType { name, .. } if name == "Hidden"
    ));
    let _ = first.borrow().hidden.x;
}

#[test]
fn out_parameter_method_produces_two_lines() {
    let mut manager = MonitoringManager::new(Config::default());
    manager.run_profiling(&[]).unwrap();
    let worker = Rc::new(RefCell::new(Worker { jobs: 3 }));
    manager.register_instance(&worker).unwrap();
    manager.refresh_all();

    let units = manager.units_for(&worker);
    assert_eq!(units[0].cached_state(), "Jobs: 3");
    let state = units[1].cached_state();
    assert_eq!(state.lines().collect::<Vec<_>>(), ["Do Work", "    out code: 42"]);
}

#[test]
fn dispose_is_idempotent() {
    let mut manager = MonitoringManager::new(Config::default());
    manager.run_profiling(&[]).unwrap();
    let worker = Rc::new(RefCell::new(Worker { jobs: 0 }));
    manager.register_instance(&worker).unwrap();
    let unit = manager.units_for(&worker)[0].clone();

    unit.refresh();
    unit.dispose();
    unit.dispose();
    assert_eq!(unit.status(), UnitStatus::Disposed);
    assert_eq!(unit.cached_state(), "Jobs: 0");

    assert_eq!(manager.unregister_instance(&worker), 2);
    assert_eq!(manager.unregister_instance(&worker), 0);
    assert!(unit.is_disposed());
}

#[test]
fn derived_reflect_records_visibility_and_kind() {
    use lookout::{TypeKind, Visibility};

    #[derive(Clone, Copy, Reflect)]
    #[allow(dead_code)]
    enum Stance {
        Idle,
        Running,
    }

    let info = Player::type_info();
    assert_eq!(info.visibility(), Visibility::Public);
    assert_eq!(info.kind(), TypeKind::Value);
    assert!(info.path().ends_with("::Player"));

    assert_eq!(Hidden::type_info().visibility(), Visibility::Private);
    assert_eq!(Stance::type_info().kind(), TypeKind::Enum { size: 1 });
    assert!(Muted::monitoring_disabled());
}
