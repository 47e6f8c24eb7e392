use std::rc::Rc;

use crate::{
    EventSource, Inspect, MemberInfo, MonitorAttribute, MonitorUnit, Result,
    processing::ElementWriter,
    profiles::{MonitorProfile, ProfileCtorArgs, ProfileInfo, UnitTarget, bind_target},
    units::EventUnit,
};

/// Accessor of the event source a unit subscribes to.
pub enum EventAccess<T, A> {
    Instance(Rc<dyn for<'a> Fn(&'a T) -> &'a EventSource<A>>),
    Static(Rc<dyn Fn() -> EventSource<A>>),
}

/// Profile of a monitored event.
///
/// Units subscribe a handler when they are created and render the last
/// arguments with the invocation count.
pub struct EventProfile<T, A> {
    info: Rc<ProfileInfo>,
    access: EventAccess<T, A>,
    writer: ElementWriter<A>,
}

impl<T: 'static, A: Inspect> EventProfile<T, A> {
    pub fn new(
        member: &MemberInfo,
        attribute: &MonitorAttribute,
        access: EventAccess<T, A>,
        args: &ProfileCtorArgs<'_>,
    ) -> Result<Self> {
        let info = Rc::new(ProfileInfo::new::<T>(member, attribute, args.config));
        let writer = args.factory.element_processor::<A>(info.format());
        Ok(Self {
            info,
            access,
            writer,
        })
    }
}

impl<T: 'static, A: Inspect> MonitorProfile for EventProfile<T, A> {
    fn info(&self) -> &Rc<ProfileInfo> {
        &self.info
    }

    fn create_unit(&self, target: UnitTarget<'_>) -> Result<Rc<dyn MonitorUnit>> {
        let binding = bind_target::<T>(&self.info, target)?;
        let unit: Rc<dyn MonitorUnit> =
            EventUnit::subscribe(self.info.clone(), binding, &self.access, self.writer.clone());
        Ok(unit)
    }
}
