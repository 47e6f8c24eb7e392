#![cfg(feature = "macros")]

use std::{cell::RefCell, rc::Rc};

use lookout::{
    Assembly, Config, DisplayController, Label, MonitorUnit, Monitored, MonitoringDisplay,
    MonitoringManager, Reflect, UnitObserver,
};

#[derive(Reflect, Monitored)]
pub struct Enemy {
    #[monitor]
    armor: u16,
    #[monitor(label = "Target")]
    target: Option<String>,
}

fn enemy() -> Rc<RefCell<Enemy>> {
    Rc::new(RefCell::new(Enemy {
        armor: 5,
        target: None,
    }))
}

#[derive(Default)]
struct Panel {
    visible: bool,
    shown: Vec<String>,
    removed: usize,
    query: String,
}

impl DisplayController for Panel {
    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn filter(&mut self, query: &str) {
        self.query = query.to_owned();
    }

    fn on_unit_created(&mut self, unit: &Rc<dyn MonitorUnit>) {
        self.shown.push(unit.label().into_owned());
    }

    fn on_unit_disposed(&mut self, _unit: &Rc<dyn MonitorUnit>) {
        self.removed += 1;
    }
}

#[derive(Default)]
struct Counts {
    created: usize,
    disposed: usize,
    completed: usize,
}

struct Counter(Rc<RefCell<Counts>>);

impl UnitObserver for Counter {
    fn on_unit_created(&self, _unit: &Rc<dyn MonitorUnit>) {
        self.0.borrow_mut().created += 1;
    }

    fn on_unit_disposed(&self, _unit: &Rc<dyn MonitorUnit>) {
        self.0.borrow_mut().disposed += 1;
    }

    fn on_profiling_completed(
        &self,
        _static_units: &[Rc<dyn MonitorUnit>],
        instance_units: &[Rc<dyn MonitorUnit>],
    ) {
        let mut counts = self.0.borrow_mut();
        counts.completed += 1;
        assert_eq!(instance_units.len(), counts.created);
    }
}

#[test]
fn observers_see_lifecycle_in_order() {
    let counts = Rc::new(RefCell::new(Counts::default()));
    let mut manager = MonitoringManager::new(Config::default());
    manager.add_observer(Counter(counts.clone()));

    let early = enemy();
    manager.register_instance(&early).unwrap();
    assert_eq!(counts.borrow().created, 0);

    manager
        .run_profiling(&[Assembly::new("game").register::<Enemy>()])
        .unwrap();
    manager.run_profiling(&[]).unwrap();
    assert_eq!(counts.borrow().created, 2);
    assert_eq!(counts.borrow().completed, 1);

    manager.pause_observers();
    manager.register_instance(&enemy()).unwrap();
    manager.resume_observers();
    assert_eq!(counts.borrow().created, 2);

    manager.shutdown();
    assert_eq!(counts.borrow().disposed, 4);
}

#[test]
fn display_replays_units_and_forwards_events() {
    let mut manager = MonitoringManager::new(Config::default());
    manager.run_profiling(&[]).unwrap();
    let first = enemy();
    manager.register_instance(&first).unwrap();

    let panel = Rc::new(RefCell::new(Panel::default()));
    let mut display = MonitoringDisplay::new();
    display.attach(panel.clone(), &mut manager);
    assert_eq!(panel.borrow().shown, ["Armor", "Target"]);
    assert!(display.is_visible());

    let second = enemy();
    manager.register_instance(&second).unwrap();
    assert_eq!(panel.borrow().shown.len(), 4);

    assert!(!display.toggle());
    assert!(!panel.borrow().visible);
    assert!(display.filter("armor"));
    assert_eq!(panel.borrow().query, "armor");

    manager.unregister_instance(&first);
    assert_eq!(panel.borrow().removed, 2);

    assert!(display.detach(&mut manager));
    assert!(!display.show());
    assert!(display.active_controller().is_none());
    manager.unregister_instance(&second);
    assert_eq!(panel.borrow().removed, 2);
}

#[test]
fn display_respects_open_on_load() {
    let mut manager = MonitoringManager::new(Config::default().with_open_display_on_load(false));
    let panel = Rc::new(RefCell::new(Panel {
        visible: true,
        ..Panel::default()
    }));
    let mut display = MonitoringDisplay::new();
    display.attach(panel, &mut manager);
    assert!(!display.is_visible());
    assert!(display.toggle());
}

#[test]
fn option_member_renders_null_until_set() {
    let mut manager = MonitoringManager::new(Config::default());
    manager.run_profiling(&[]).unwrap();
    let enemy = enemy();
    manager.register_instance(&enemy).unwrap();
    let target = manager.units_for(&enemy)[1].clone();

    assert_eq!(target.get_state(), "Target: null");
    enemy.borrow_mut().target = Some("player".into());
    assert_eq!(target.get_state(), "Target: player");
}
