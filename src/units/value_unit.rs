use std::{marker::PhantomData, rc::Rc};

use crate::{
    Fault, MonitorUnit,
    profiles::{ProfileInfo, Reader},
    units::{Binding, UnitCore},
};

/// Unit of a field or property profile.
pub struct ValueUnit<T, V> {
    core: UnitCore,
    binding: Binding<T>,
    read: Reader<T>,
    _value: PhantomData<fn() -> V>,
}

impl<T: 'static, V: 'static> ValueUnit<T, V> {
    pub(crate) fn new(profile: Rc<ProfileInfo>, binding: Binding<T>, read: Reader<T>) -> Self {
        Self {
            core: UnitCore::new(profile),
            binding,
            read,
            _value: PhantomData,
        }
    }

    fn compute(&self) -> Result<String, Fault> {
        self.binding.with(|target| (self.read)(target))
    }
}

impl<T: 'static, V: 'static> MonitorUnit for ValueUnit<T, V> {
    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn refresh(&self) {
        if !self.core.begin_refresh() {
            return;
        }
        let outcome = self.compute();
        self.core.complete_refresh(outcome);
    }

    fn get_state(&self) -> String {
        if self.is_disposed() {
            return self.cached_state();
        }
        self.compute().unwrap_or_else(|_| self.cached_state())
    }

    fn dispose(&self) {
        if self.core.dispose() {
            self.binding.release();
        }
    }
}
