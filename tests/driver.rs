#![cfg(all(feature = "driver", feature = "macros"))]

use std::{cell::Cell, time::Duration};

use lookout::{Assembly, Config, Members, MonitorUnit, Monitored, MonitoringManager, Reflect, RefreshDriver};

thread_local! {
    static READS: Cell<u32> = const { Cell::new(0) };
}

#[derive(Reflect, Monitored)]
#[monitor(describe = "Ticker::statics")]
pub struct Ticker;

impl Ticker {
    fn statics(members: &mut Members<Self>) {
        members.static_property("reads", || {
            READS.with(|reads| {
                reads.set(reads.get() + 1);
                reads.get()
            })
        });
    }
}

#[tokio::test(start_paused = true)]
async fn refreshes_on_every_tick_until_cancelled() {
    let mut manager = MonitoringManager::new(Config::default());
    manager
        .run_profiling(&[Assembly::new("game").register::<Ticker>()])
        .unwrap();

    let driver = RefreshDriver::new(Duration::from_millis(100));
    let canceller = driver.clone();
    let (ticks, ()) = tokio::join!(driver.run(&manager), async move {
        tokio::time::sleep(Duration::from_millis(350)).await;
        canceller.cancel();
    });

    assert_eq!(ticks, 4);
    assert_eq!(manager.static_units()[0].cached_state(), "Reads: 4");
}

#[tokio::test(start_paused = true)]
async fn cancelled_driver_returns_immediately() {
    let manager = MonitoringManager::new(Config::default());
    let driver = RefreshDriver::new(Duration::from_secs(1));
    driver.cancel();
    assert!(driver.cancel_token().is_cancelled());
    assert_eq!(driver.run(&manager).await, 0);
}
