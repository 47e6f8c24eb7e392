//! Control surface of the monitoring display.
//!
//! The UI layer implements [`DisplayController`]. [`MonitoringDisplay`]
//! holds the active controller, forwards unit lifecycle events to it and
//! exposes visibility and filtering to the host.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use crate::{
    Label, MonitorUnit, MonitoringManager,
    lifecycle::{ObserverId, UnitObserver},
};

pub trait DisplayController {
    fn show(&mut self);

    fn hide(&mut self);

    fn is_visible(&self) -> bool;

    /// Restrict the displayed units to those matching `query`.
    fn filter(&mut self, _query: &str) {}

    fn on_unit_created(&mut self, unit: &Rc<dyn MonitorUnit>);

    fn on_unit_disposed(&mut self, unit: &Rc<dyn MonitorUnit>);
}

type SharedController = Rc<RefCell<dyn DisplayController>>;

/// Forwards lifecycle events to a controller without keeping it alive.
struct Forwarder {
    controller: Weak<RefCell<dyn DisplayController>>,
}

impl Forwarder {
    fn forward(&self, unit: &Rc<dyn MonitorUnit>, f: impl FnOnce(&mut dyn DisplayController)) {
        let Some(controller) = self.controller.upgrade() else {
            return;
        };
        match controller.try_borrow_mut() {
            Ok(mut controller) => f(&mut *controller),
            Err(_) => tracing::warn!(unit = %unit.label(), "display controller busy, event dropped"),
        }
    }
}

impl UnitObserver for Forwarder {
    fn on_unit_created(&self, unit: &Rc<dyn MonitorUnit>) {
        self.forward(unit, |c| c.on_unit_created(unit));
    }

    fn on_unit_disposed(&self, unit: &Rc<dyn MonitorUnit>) {
        self.forward(unit, |c| c.on_unit_disposed(unit));
    }
}

/// Holder of at most one active [`DisplayController`].
///
/// Every operation is a no-op returning `false` (or `None`) when no
/// controller is attached or the controller is currently borrowed.
#[derive(Default)]
pub struct MonitoringDisplay {
    active: Option<SharedController>,
    observer: Option<ObserverId>,
}

impl MonitoringDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `controller` the active controller.
    ///
    /// Existing units are replayed to it before it starts receiving
    /// lifecycle events. It is then shown or hidden according to
    /// [`Config::open_display_on_load`](crate::Config::open_display_on_load).
    pub fn attach<C: DisplayController + 'static>(
        &mut self,
        controller: Rc<RefCell<C>>,
        manager: &mut MonitoringManager,
    ) {
        self.detach(manager);
        let controller: SharedController = controller;
        {
            let mut active = controller.borrow_mut();
            for unit in manager.static_units() {
                active.on_unit_created(unit);
            }
            for unit in manager.instance_units() {
                active.on_unit_created(&unit);
            }
            if manager.config().open_display_on_load {
                active.show();
            } else {
                active.hide();
            }
        }
        self.observer = Some(manager.add_observer(Forwarder {
            controller: Rc::downgrade(&controller),
        }));
        self.active = Some(controller);
        tracing::debug!("display controller attached");
    }

    /// Stop forwarding lifecycle events and drop the active controller.
    pub fn detach(&mut self, manager: &mut MonitoringManager) -> bool {
        if let Some(id) = self.observer.take() {
            manager.remove_observer(id);
        }
        self.active.take().is_some()
    }

    pub fn active_controller(&self) -> Option<SharedController> {
        self.active.clone()
    }

    fn with_controller<R>(&self, f: impl FnOnce(&mut dyn DisplayController) -> R) -> Option<R> {
        let controller = self.active.as_ref()?;
        let mut controller = controller.try_borrow_mut().ok()?;
        Some(f(&mut *controller))
    }

    pub fn show(&self) -> bool {
        self.with_controller(|c| c.show()).is_some()
    }

    pub fn hide(&self) -> bool {
        self.with_controller(|c| c.hide()).is_some()
    }

    /// Flip visibility. Returns the new visibility.
    pub fn toggle(&self) -> bool {
        self.with_controller(|c| {
            if c.is_visible() {
                c.hide();
            } else {
                c.show();
            }
            c.is_visible()
        })
        .unwrap_or(false)
    }

    pub fn is_visible(&self) -> bool {
        self.with_controller(|c| c.is_visible()).unwrap_or(false)
    }

    pub fn filter(&self, query: &str) -> bool {
        self.with_controller(|c| c.filter(query)).is_some()
    }
}

impl std::fmt::Debug for MonitoringDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringDisplay")
            .field("attached", &self.active.is_some())
            .field("visible", &self.is_visible())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    #[derive(Default)]
    struct Badge {
        visible: bool,
    }

    impl DisplayController for Badge {
        fn show(&mut self) {
            self.visible = true;
        }

        fn hide(&mut self) {
            self.visible = false;
        }

        fn is_visible(&self) -> bool {
            self.visible
        }

        fn on_unit_created(&mut self, _unit: &Rc<dyn MonitorUnit>) {}

        fn on_unit_disposed(&mut self, _unit: &Rc<dyn MonitorUnit>) {}
    }

    #[test]
    fn default_filter_is_accepted_without_effect() {
        let mut manager = MonitoringManager::new(Config::default());
        let mut display = MonitoringDisplay::new();
        assert!(!display.filter("hp"));

        display.attach(Rc::new(RefCell::new(Badge::default())), &mut manager);
        assert!(display.filter("hp"));
        assert!(display.is_visible());
    }
}
