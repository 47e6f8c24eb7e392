use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::{
    EventSource, Fault, HandlerId, MonitorUnit, WeakEventSource,
    processing::ElementWriter,
    profiles::{EventAccess, ProfileInfo},
    units::{Binding, UnitCore},
};

/// Unit of an event profile.
///
/// Push based: the state changes when the event fires, and
/// [`get_state`](MonitorUnit::get_state) returns the cached string.
pub struct EventUnit<T, A> {
    core: UnitCore,
    binding: Binding<T>,
    subscription: RefCell<Option<(WeakEventSource<A>, HandlerId)>>,
    invocations: Cell<u64>,
    last_args: RefCell<String>,
    writer: ElementWriter<A>,
}

impl<T: 'static, A: 'static> EventUnit<T, A> {
    /// Create the unit and subscribe it to the target's event.
    pub(crate) fn subscribe(
        profile: Rc<ProfileInfo>,
        binding: Binding<T>,
        access: &EventAccess<T, A>,
        writer: ElementWriter<A>,
    ) -> Rc<Self> {
        let source: Result<EventSource<A>, Fault> = match access {
            EventAccess::Static(source) => Ok(source()),
            EventAccess::Instance(source) => binding.with(|target| {
                target.map(|t| source(t).clone()).ok_or(Fault::MissingTarget)
            }),
        };

        let unit = Rc::new_cyclic(|weak: &std::rc::Weak<Self>| {
            let subscription = source.as_ref().ok().map(|source| {
                let weak = weak.clone();
                let id = source.subscribe(move |args: &A| {
                    if let Some(unit) = weak.upgrade() {
                        unit.record(args);
                    }
                });
                (source.downgrade(), id)
            });
            Self {
                core: UnitCore::new(profile),
                binding,
                subscription: RefCell::new(subscription),
                invocations: Cell::new(0),
                last_args: RefCell::new(String::new()),
                writer,
            }
        });

        match source {
            Ok(_) => unit.refresh(),
            Err(fault) => {
                if unit.core.begin_refresh() {
                    unit.core.complete_refresh(Err(fault));
                }
            }
        }
        unit
    }

    fn record(&self, args: &A) {
        if self.is_disposed() {
            return;
        }
        self.invocations.set(self.invocations.get() + 1);
        {
            let mut last = self.last_args.borrow_mut();
            last.clear();
            (self.writer)(args, &mut last);
        }
        self.refresh();
    }

    pub fn invocations(&self) -> u64 {
        self.invocations.get()
    }

    fn render(&self) -> String {
        let label = self.core.profile().format().label();
        let count = self.invocations.get();
        if count == 0 {
            return format!("{label}: not invoked");
        }
        let args = self.last_args.borrow();
        if args.is_empty() {
            format!("{label} (invoked {count} times)")
        } else {
            format!("{label}: {args} (invoked {count} times)")
        }
    }
}

impl<T: 'static, A: 'static> MonitorUnit for EventUnit<T, A> {
    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn refresh(&self) {
        if !self.core.begin_refresh() {
            return;
        }
        // Events usually fire while the target is mutably borrowed.
        let outcome = self.binding.check_alive().map(|()| self.render());
        self.core.complete_refresh(outcome);
    }

    fn get_state(&self) -> String {
        self.cached_state()
    }

    fn dispose(&self) {
        if !self.core.dispose() {
            return;
        }
        if let Some((source, id)) = self.subscription.borrow_mut().take() {
            source.unsubscribe(id);
        }
        self.binding.release();
    }
}
