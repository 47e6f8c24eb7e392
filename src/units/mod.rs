//! Units: live bindings of a profile to one target.
//!
//! Every unit shares the [`UnitCore`] state machine:
//!
//! ```text
//! Active ──refresh()──▶ Refreshing ──ok──▶ Active
//!                            └──fault──▶ Faulted ──refresh()──▶ Refreshing ..
//! any ──dispose()──▶ Disposed
//! ```
//!
//! A faulted unit keeps its last good state. Faults never leave the unit.

mod event_unit;
mod method_unit;
mod out_parameter;
mod value_unit;

use std::{
    borrow::Cow,
    cell::{Cell, Ref, RefCell},
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    rc::{Rc, Weak},
};

pub use event_unit::EventUnit;
pub use method_unit::MethodUnit;
pub use out_parameter::OutParameterHandle;
pub use value_unit::ValueUnit;

use crate::{Fault, Label, profiles::ProfileInfo};

/// Unique identifier of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitId(u128);

impl UnitId {
    pub(crate) fn new() -> Self {
        UnitId(uuid::Uuid::new_v4().as_u128())
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnitStatus {
    Active,
    Refreshing,
    Faulted,
    Disposed,
}

impl Label for UnitStatus {
    fn label(&self) -> Cow<'static, str> {
        Cow::Borrowed(match self {
            UnitStatus::Active => "active",
            UnitStatus::Refreshing => "refreshing",
            UnitStatus::Faulted => "faulted",
            UnitStatus::Disposed => "disposed",
        })
    }
}

/// Identifier of a value-changed listener registered on a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&str)>;

/// A live monitored member bound to one target.
pub trait MonitorUnit {
    fn core(&self) -> &UnitCore;

    /// Recompute the state and notify value-changed listeners.
    fn refresh(&self);

    /// The current state. Pull units recompute it without touching the
    /// cache and fall back to the cached state when that fails.
    fn get_state(&self) -> String;

    /// Release the target and all subscriptions. Idempotent.
    fn dispose(&self);

    fn id(&self) -> UnitId {
        self.core().id()
    }

    fn profile(&self) -> &ProfileInfo {
        self.core().profile()
    }

    fn status(&self) -> UnitStatus {
        self.core().status()
    }

    fn fault(&self) -> Option<Fault> {
        self.core().fault()
    }

    fn cached_state(&self) -> String {
        self.core().state().clone()
    }

    fn on_value_changed(&self, listener: Box<dyn Fn(&str)>) -> ListenerId {
        self.core().add_listener(Rc::from(listener))
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.core().remove_listener(id)
    }

    fn is_disposed(&self) -> bool {
        self.status() == UnitStatus::Disposed
    }
}

impl Label for dyn MonitorUnit {
    fn label(&self) -> Cow<'static, str> {
        Cow::Owned(self.profile().format().label().to_owned())
    }
}

impl fmt::Debug for dyn MonitorUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorUnit")
            .field("id", &self.id())
            .field("member", &self.profile().member().name())
            .field("status", &self.status())
            .finish()
    }
}

/// State shared by every unit kind.
pub struct UnitCore {
    id: UnitId,
    profile: Rc<ProfileInfo>,
    status: Cell<UnitStatus>,
    state: RefCell<String>,
    fault: RefCell<Option<Fault>>,
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
    next_listener: Cell<u64>,
}

impl UnitCore {
    pub(crate) fn new(profile: Rc<ProfileInfo>) -> Self {
        Self {
            id: UnitId::new(),
            state: RefCell::new(profile.format().label().to_owned()),
            profile,
            status: Cell::new(UnitStatus::Active),
            fault: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn profile(&self) -> &ProfileInfo {
        &self.profile
    }

    pub fn status(&self) -> UnitStatus {
        self.status.get()
    }

    pub fn fault(&self) -> Option<Fault> {
        self.fault.borrow().clone()
    }

    pub fn state(&self) -> Ref<'_, String> {
        self.state.borrow()
    }

    fn add_listener(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        if self.status() != UnitStatus::Disposed {
            self.listeners.borrow_mut().push((id, listener));
        }
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(current, _)| *current != id);
        listeners.len() != before
    }

    /// Enter `Refreshing`. Returns `false` on a disposed unit or when a
    /// refresh is already running.
    pub(crate) fn begin_refresh(&self) -> bool {
        match self.status() {
            UnitStatus::Disposed | UnitStatus::Refreshing => false,
            UnitStatus::Active | UnitStatus::Faulted => {
                self.status.set(UnitStatus::Refreshing);
                true
            }
        }
    }

    /// Leave `Refreshing` with the outcome of the recomputation.
    pub(crate) fn complete_refresh(&self, outcome: std::result::Result<String, Fault>) {
        match outcome {
            Ok(state) => {
                *self.state.borrow_mut() = state;
                self.fault.borrow_mut().take();
                self.notify();
                if self.status() == UnitStatus::Refreshing {
                    self.status.set(UnitStatus::Active);
                }
            }
            Err(fault) => {
                let first = self.fault.borrow().is_none();
                if first {
                    tracing::warn!(
                        unit = %self.profile.format().label(),
                        member = %self.profile.member().name(),
                        %fault,
                        "unit faulted, keeping last good state"
                    );
                } else {
                    tracing::trace!(unit = %self.profile.format().label(), %fault, "unit still faulted");
                }
                *self.fault.borrow_mut() = Some(fault);
                if self.status() == UnitStatus::Refreshing {
                    self.status.set(UnitStatus::Faulted);
                }
            }
        }
    }

    /// Deliver the current state to listeners in registration order.
    /// A listener that panics is removed.
    fn notify(&self) {
        let state = self.state.borrow();
        let mut index = 0;
        loop {
            let Some((id, listener)) = self.listeners.borrow().get(index).cloned() else {
                break;
            };
            let delivered = catch_unwind(AssertUnwindSafe(|| listener(state.as_str())));
            if delivered.is_err() {
                tracing::error!(unit = %self.profile.format().label(), "listener panicked, removing");
                self.remove_listener(id);
            } else {
                index += 1;
            }
        }
    }

    /// Enter `Disposed`. Returns `false` if the unit was already disposed.
    pub(crate) fn dispose(&self) -> bool {
        if self.status() == UnitStatus::Disposed {
            return false;
        }
        self.status.set(UnitStatus::Disposed);
        self.listeners.borrow_mut().clear();
        tracing::trace!(unit = %self.profile.format().label(), id = %self.id, "unit disposed");
        true
    }
}

impl fmt::Debug for UnitCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitCore")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("state", &*self.state.borrow())
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

/// Weak link from a unit to its target.
pub(crate) enum Binding<T> {
    Static,
    Instance(RefCell<Option<Weak<RefCell<T>>>>),
}

impl<T: 'static> Binding<T> {
    pub(crate) fn instance(target: Weak<RefCell<T>>) -> Self {
        Binding::Instance(RefCell::new(Some(target)))
    }

    /// Run `f` with a shared borrow of the target, inside `catch_unwind`.
    pub(crate) fn with<R>(
        &self,
        f: impl FnOnce(Option<&T>) -> std::result::Result<R, Fault>,
    ) -> std::result::Result<R, Fault> {
        let target = match self {
            Binding::Static => None,
            Binding::Instance(target) => {
                let upgraded = target.borrow().as_ref().and_then(Weak::upgrade);
                Some(upgraded.ok_or(Fault::TargetDropped)?)
            }
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| match &target {
            None => f(None),
            Some(target) => {
                let borrowed = target.try_borrow().map_err(|_| Fault::TargetBusy)?;
                f(Some(&*borrowed))
            }
        }));
        outcome.unwrap_or_else(|payload| Err(Fault::from_panic(payload.as_ref())))
    }

    /// `Err(TargetDropped)` when an instance target is gone. Never borrows
    /// the target.
    pub(crate) fn check_alive(&self) -> std::result::Result<(), Fault> {
        match self {
            Binding::Static => Ok(()),
            Binding::Instance(target) => target
                .borrow()
                .as_ref()
                .filter(|weak| weak.strong_count() > 0)
                .map(|_| ())
                .ok_or(Fault::TargetDropped),
        }
    }

    pub(crate) fn release(&self) {
        if let Binding::Instance(target) = self {
            target.borrow_mut().take();
        }
    }
}
