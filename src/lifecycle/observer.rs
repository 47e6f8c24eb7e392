use std::rc::Rc;

use crate::MonitorUnit;

/// Receiver of unit lifecycle events, typically a UI layer.
///
/// Events are delivered synchronously: a unit is announced before its
/// first refresh and retired after its last use. Observers must not keep
/// units alive past [`on_unit_disposed`](Self::on_unit_disposed).
pub trait UnitObserver {
    fn on_unit_created(&self, _unit: &Rc<dyn MonitorUnit>) {}

    fn on_unit_disposed(&self, _unit: &Rc<dyn MonitorUnit>) {}

    /// Fired once, after the first profiling pass.
    fn on_profiling_completed(
        &self,
        _static_units: &[Rc<dyn MonitorUnit>],
        _instance_units: &[Rc<dyn MonitorUnit>],
    ) {
    }
}
