use std::{marker::PhantomData, rc::Rc};

use crate::{
    Inspect, MemberInfo, MonitorAttribute, MonitorUnit, Result,
    profiles::{Getter, MonitorProfile, ProfileCtorArgs, ProfileInfo, Reader, UnitTarget, bind_target},
    units::ValueUnit,
};

/// Profile of a monitored property: a getter computing its value on demand.
///
/// The getter may be fallible. Its error is rendered into the unit's fault
/// and the last good state is kept.
pub struct PropertyProfile<T, V> {
    info: Rc<ProfileInfo>,
    read: Reader<T>,
    _value: PhantomData<fn() -> V>,
}

impl<T: 'static, V: Inspect> PropertyProfile<T, V> {
    pub fn new(
        member: &MemberInfo,
        attribute: &MonitorAttribute,
        getter: Getter<T, V>,
        args: &ProfileCtorArgs<'_>,
    ) -> Result<Self> {
        let info = Rc::new(ProfileInfo::new::<T>(member, attribute, args.config));
        let processor = args.factory.create_processor_for_type::<V>(info.format());
        Ok(Self {
            read: getter.compile(processor),
            info,
            _value: PhantomData,
        })
    }
}

impl<T: 'static, V: Inspect> MonitorProfile for PropertyProfile<T, V> {
    fn info(&self) -> &Rc<ProfileInfo> {
        &self.info
    }

    fn create_unit(&self, target: UnitTarget<'_>) -> Result<Rc<dyn MonitorUnit>> {
        let binding = bind_target::<T>(&self.info, target)?;
        Ok(Rc::new(ValueUnit::<T, V>::new(
            self.info.clone(),
            binding,
            self.read.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::{Annotate, Config, Fault, Members, Reflect, TypeInfo, UnitStatus, ValueProcessorFactory};

    struct Tank {
        fuel: f32,
        capacity: f32,
    }

    impl Reflect for Tank {
        fn type_info() -> TypeInfo {
            TypeInfo::reference("Tank", "tests::Tank")
        }
    }

    fn profile(members: Members<Tank>) -> Rc<dyn MonitorProfile> {
        let config = Config::default();
        let factory = ValueProcessorFactory::new();
        members
            .into_entries()
            .remove(0)
            .into_profile(&ProfileCtorArgs::new(&config, &factory))
            .expect("property profile")
    }

    #[test]
    fn computes_formatted_value() {
        let mut members = Members::<Tank>::new();
        members
            .property("fill_ratio", |t: &Tank| t.fuel / t.capacity)
            .format("P1");
        let tank = Rc::new(RefCell::new(Tank {
            fuel: 30.0,
            capacity: 40.0,
        }));
        let unit = profile(members)
            .create_unit(UnitTarget::instance(&tank))
            .expect("unit");
        assert_eq!(unit.get_state(), "Fill Ratio: 75.0 %");
    }

    #[test]
    fn failing_getter_faults_unit() {
        let mut members = Members::<Tank>::new();
        members.try_property("range", |t: &Tank| {
            if t.capacity > 0.0 {
                Ok(t.fuel * 12.0)
            } else {
                Err("no capacity")
            }
        });
        let tank = Rc::new(RefCell::new(Tank {
            fuel: 2.0,
            capacity: 10.0,
        }));
        let unit = profile(members)
            .create_unit(UnitTarget::instance(&tank))
            .expect("unit");
        unit.refresh();
        assert_eq!(unit.cached_state(), "Range: 24");

        tank.borrow_mut().capacity = 0.0;
        unit.refresh();
        assert_eq!(unit.status(), UnitStatus::Faulted);
        assert_eq!(unit.fault(), Some(Fault::Failed("no capacity".into())));
        assert_eq!(unit.get_state(), "Range: 24");
    }
}
