mod event;
mod observer;
mod registry;

pub type ObserverId = u32;

pub(crate) use event::LifecycleEvent;
pub use observer::UnitObserver;
pub use registry::ObserverRegistry;
