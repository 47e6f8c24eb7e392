use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

use lookout::{
    Assembly, Config, DisplayController, EventSource, Label, Members, MonitorUnit, Monitored,
    MonitoringDisplay, MonitoringManager, Reflect, RefreshDriver, Result, profiles::Arguments,
};

thread_local! {
    static FRAME: Cell<u64> = const { Cell::new(0) };
}

#[derive(Clone, Copy, Debug, Reflect)]
#[reflect(debug)]
pub enum Stance {
    Idle,
    Running,
}

#[derive(Reflect, Monitored)]
#[monitor(describe = "Player::extra_members")]
pub struct Player {
    #[monitor(label = "HP", format = "N0")]
    health: i32,
    #[monitor]
    stance: Stance,
    #[monitor(position = "upper_right")]
    inventory: Vec<String>,
    damaged: EventSource<i32>,
}

impl Player {
    fn extra_members(members: &mut Members<Self>) {
        members.static_property("frame", || FRAME.with(Cell::get));
        members.property("is_alive", |p: &Player| p.health > 0);
        members.event("damaged", |p: &Player| &p.damaged);
        members
            .method("distance_to", |p: &Player, args: &mut Arguments| {
                let target = args.get::<f32>(0).copied().unwrap_or_default();
                target - p.inventory.len() as f32
            })
            .param::<f32>("target")
            .arg(10.0_f32);
    }

    fn take_hit(&mut self, amount: i32) {
        self.health -= amount;
        self.stance = Stance::Running;
        self.damaged.invoke(&amount);
    }
}

/// Prints unit states to stdout.
#[derive(Default)]
struct Console {
    visible: bool,
    units: Vec<Rc<dyn MonitorUnit>>,
}

impl Console {
    fn print(&self) {
        if !self.visible {
            return;
        }
        println!("---- frame {} ----", FRAME.with(Cell::get));
        for unit in &self.units {
            println!("{}", unit.cached_state());
        }
    }
}

impl DisplayController for Console {
    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn on_unit_created(&mut self, unit: &Rc<dyn MonitorUnit>) {
        println!("+ {}", unit.label());
        self.units.push(unit.clone());
    }

    fn on_unit_disposed(&mut self, unit: &Rc<dyn MonitorUnit>) {
        self.units.retain(|u| u.id() != unit.id());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let mut manager = MonitoringManager::new(Config::default());
    let console = Rc::new(RefCell::new(Console::default()));
    let mut display = MonitoringDisplay::new();
    display.attach(console.clone(), &mut manager);

    let player = Rc::new(RefCell::new(Player {
        health: 1500,
        stance: Stance::Idle,
        inventory: vec!["rope".into(), "lamp".into()],
        damaged: EventSource::new(),
    }));
    manager.register_instance(&player)?;
    let report = manager.run_profiling(&[Assembly::new("game").register::<Player>()])?;
    println!("{report:?}");

    let driver = RefreshDriver::new(Duration::from_millis(250));
    let canceller = driver.clone();
    let game = async {
        for round in 1..=4 {
            tokio::time::sleep(Duration::from_millis(300)).await;
            FRAME.with(|f| f.set(round));
            player.borrow_mut().take_hit(120 * round as i32);
            console.borrow().print();
        }
        canceller.cancel();
    };
    let (ticks, ()) = tokio::join!(driver.run(&manager), game);

    println!("refreshed {ticks} times");
    display.detach(&mut manager);
    manager.shutdown();
    Ok(())
}
