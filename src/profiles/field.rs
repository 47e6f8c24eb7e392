use std::{marker::PhantomData, rc::Rc};

use crate::{
    Inspect, MemberInfo, MonitorAttribute, MonitorUnit, Result,
    profiles::{Getter, MonitorProfile, ProfileCtorArgs, ProfileInfo, Reader, UnitTarget, bind_target},
    units::ValueUnit,
};

/// Profile of a monitored field.
///
/// Instance fields are borrowed from the target on every read, so the
/// value is never cloned; static fields are read through a closure.
pub struct FieldProfile<T, V> {
    info: Rc<ProfileInfo>,
    read: Reader<T>,
    _value: PhantomData<fn() -> V>,
}

impl<T: 'static, V: Inspect> FieldProfile<T, V> {
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

impl<T: 'static, V: Inspect> MonitorProfile for FieldProfile<T, V> {
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
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::{Config, Members, Reflect, TypeInfo, UnitStatus, ValueProcessorFactory};

    thread_local! {
        static SCORE: Cell<i32> = const { Cell::new(0) };
    }

    struct Board {
        cells: Vec<u8>,
    }

    impl Reflect for Board {
        fn type_info() -> TypeInfo {
            TypeInfo::reference("Board", "tests::Board")
        }
    }

    fn profile(members: Members<Board>) -> Rc<dyn MonitorProfile> {
        let config = Config::default();
        let factory = ValueProcessorFactory::new();
        members
            .into_entries()
            .remove(0)
            .into_profile(&ProfileCtorArgs::new(&config, &factory))
            .expect("field profile")
    }

    #[test]
    fn static_field_follows_value_after_refresh() {
        let mut members = Members::<Board>::new();
        members.static_field("score", || SCORE.with(Cell::get));
        let unit = profile(members).create_unit(UnitTarget::Static).expect("unit");
        assert_eq!(unit.cached_state(), "Score");

        SCORE.with(|s| s.set(7));
        unit.refresh();
        assert_eq!(unit.cached_state(), "Score: 7");

        SCORE.with(|s| s.set(9));
        assert_eq!(unit.get_state(), "Score: 9");
        assert_eq!(unit.cached_state(), "Score: 7");
    }

    #[test]
    fn instance_field_borrows_target() {
        let mut members = Members::<Board>::new();
        members.field("cells", |b: &Board| &b.cells);
        let board = Rc::new(RefCell::new(Board { cells: vec![1, 2] }));
        let unit = profile(members)
            .create_unit(UnitTarget::instance(&board))
            .expect("unit");

        unit.refresh();
        assert_eq!(unit.cached_state(), "Cells:\n  [0]: 1\n  [1]: 2");

        let guard = board.borrow_mut();
        unit.refresh();
        assert_eq!(unit.status(), UnitStatus::Faulted);
        drop(guard);

        board.borrow_mut().cells.clear();
        unit.refresh();
        assert_eq!(unit.status(), UnitStatus::Active);
        assert_eq!(unit.cached_state(), "Cells: []");
    }
}
