use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::{
    Label,
    lifecycle::{LifecycleEvent, ObserverId, UnitObserver},
};

/// Ordered list of lifecycle observers.
///
/// Delivery follows registration order. An observer that panics is
/// removed after the current delivery.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<(ObserverId, Box<dyn UnitObserver>)>,
    last_id: ObserverId,
    paused: bool,
    ids_to_remove: Vec<ObserverId>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<O: UnitObserver + 'static>(&mut self, observer: O) -> ObserverId {
        let id = self.last_id;
        self.observers.push((id, Box::new(observer)));
        self.last_id += 1;
        id
    }

    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(current, _)| *current != id);
        self.observers.len() != before
    }

    /// Suspend delivery. Events raised while paused are dropped.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub(crate) fn dispatch(&mut self, event: LifecycleEvent<'_>) {
        if self.paused {
            return;
        }
        use LifecycleEvent::*;
        match event {
            UnitCreated(unit) => {
                tracing::trace!(unit = %unit.label(), id = %unit.id(), "unit created");
                self.notify(|o| o.on_unit_created(unit));
            }
            UnitDisposed(unit) => {
                tracing::trace!(unit = %unit.label(), id = %unit.id(), "unit disposed");
                self.notify(|o| o.on_unit_disposed(unit));
            }
            ProfilingCompleted {
                static_units,
                instance_units,
            } => {
                self.notify(|o| o.on_profiling_completed(static_units, instance_units));
            }
        }
    }

    fn notify(&mut self, f: impl Fn(&dyn UnitObserver)) {
        for (id, observer) in &self.observers {
            let result = catch_unwind(AssertUnwindSafe(|| f(observer.as_ref())));
            if result.is_err() {
                tracing::error!(observer_id = %id, "Observer panicked, removing");
                self.ids_to_remove.push(*id);
            }
        }

        self.ids_to_remove.drain(..).for_each(|id| {
            self.observers.retain(|(current, _)| *current != id);
        });
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .field("paused", &self.paused)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::MonitorUnit;

    struct Recording {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl UnitObserver for Recording {
        fn on_profiling_completed(
            &self,
            static_units: &[Rc<dyn MonitorUnit>],
            _instance_units: &[Rc<dyn MonitorUnit>],
        ) {
            self.log
                .borrow_mut()
                .push(format!("{}:{}", self.name, static_units.len()));
        }
    }

    struct Panicking;

    impl UnitObserver for Panicking {
        fn on_profiling_completed(&self, _: &[Rc<dyn MonitorUnit>], _: &[Rc<dyn MonitorUnit>]) {
            panic!("observer failure");
        }
    }

    fn completed(registry: &mut ObserverRegistry) {
        registry.dispatch(LifecycleEvent::ProfilingCompleted {
            static_units: &[],
            instance_units: &[],
        });
    }

    #[test]
    fn delivers_in_order_and_drops_panicking_observers() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = ObserverRegistry::new();
        registry.add(Recording {
            name: "first",
            log: log.clone(),
        });
        registry.add(Panicking);
        registry.add(Recording {
            name: "second",
            log: log.clone(),
        });

        completed(&mut registry);
        assert_eq!(*log.borrow(), vec!["first:0", "second:0"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn pause_suppresses_delivery() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = ObserverRegistry::new();
        let id = registry.add(Recording {
            name: "only",
            log: log.clone(),
        });

        registry.pause();
        completed(&mut registry);
        assert!(log.borrow().is_empty());

        registry.resume();
        completed(&mut registry);
        assert_eq!(log.borrow().len(), 1);

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
    }
}
