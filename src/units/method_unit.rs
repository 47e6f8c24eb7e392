use std::{cell::RefCell, rc::Rc};

use crate::{
    Fault, MonitorUnit,
    profiles::{Arguments, MethodReader, MethodResult, ProfileInfo},
    units::{Binding, UnitCore},
};

/// Unit of a method profile. Owns the argument array passed to the
/// invoker on every refresh.
pub struct MethodUnit<T, R> {
    core: UnitCore,
    binding: Binding<T>,
    read: MethodReader<T, R>,
    arguments: RefCell<Arguments>,
}

impl<T: 'static, R: 'static> MethodUnit<T, R> {
    pub(crate) fn new(
        profile: Rc<ProfileInfo>,
        binding: Binding<T>,
        read: MethodReader<T, R>,
        arguments: Arguments,
    ) -> Self {
        Self {
            core: UnitCore::new(profile),
            binding,
            read,
            arguments: RefCell::new(arguments),
        }
    }

    /// Invoke the method once and return its raw value with the rendering.
    pub fn invoke(&self) -> Result<MethodResult<R>, Fault> {
        if self.is_disposed() {
            return Err(Fault::TargetDropped);
        }
        self.binding.with(|target| {
            let mut arguments = self
                .arguments
                .try_borrow_mut()
                .map_err(|_| Fault::TargetBusy)?;
            (self.read)(target, &mut arguments)
        })
    }
}

impl<T: 'static, R: 'static> MonitorUnit for MethodUnit<T, R> {
    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn refresh(&self) {
        if !self.core.begin_refresh() {
            return;
        }
        let outcome = self.invoke().map(MethodResult::into_rendered);
        self.core.complete_refresh(outcome);
    }

    fn get_state(&self) -> String {
        self.invoke()
            .map(MethodResult::into_rendered)
            .unwrap_or_else(|_| self.cached_state())
    }

    fn dispose(&self) {
        if self.core.dispose() {
            self.binding.release();
        }
    }
}
