use std::rc::Rc;

use crate::MonitorUnit;

pub(crate) enum LifecycleEvent<'a> {
    UnitCreated(&'a Rc<dyn MonitorUnit>),
    UnitDisposed(&'a Rc<dyn MonitorUnit>),
    ProfilingCompleted {
        static_units: &'a [Rc<dyn MonitorUnit>],
        instance_units: &'a [Rc<dyn MonitorUnit>],
    },
}
