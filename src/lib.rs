//! Lookout - live value monitoring
//!
//! Host types declare which of their fields, properties, events and methods
//! are monitored. The engine builds one immutable profile per member, with
//! the accessor and the value formatter compiled once, and binds profiles
//! to targets as units exposing a refreshable, human-readable state.
//!
//! See `demos/player.rs`.

mod config;
mod discovery;
mod error;
mod events;
mod format;
mod label;
mod lifecycle;
mod manager;
mod processing;
mod reflect;
mod type_name;

pub mod aot;
pub mod display;
pub mod profiles;
pub mod units;

#[cfg(feature = "driver")]
pub mod driver;

extern crate self as lookout;

pub use config::Config;
#[cfg(feature = "driver")]
pub use driver::RefreshDriver;
pub use discovery::{Assembly, TypeEntry};
pub use display::{DisplayController, MonitoringDisplay};
pub use error::{Error, ErrorLog, Fault};
pub use events::{EventSource, HandlerId, WeakEventSource};
pub use format::{FormatData, UiPosition, humanize};
pub use label::Label;
pub use lifecycle::{ObserverId, ObserverRegistry, UnitObserver};
pub use manager::{MonitoringManager, ProfilingReport};
pub use processing::{
    BoxedProcessor, Inspect, Keyed, Number, NumberFormat, RenderSpec, Sequence, ValueProcessor,
    ValueProcessorFactory,
};
pub use reflect::{
    Annotate, ArgValue, FromArg, MemberEntry, MemberInfo, MemberKind, MemberSlot, Members,
    MethodSlot, MonitorAttribute, Monitored, ParameterInfo, Reflect, TypeForm, TypeInfo, TypeKind,
    Visibility,
};
pub use type_name::{TypeNameCache, TypeSyntax};
pub use units::{ListenerId, MonitorUnit, OutParameterHandle, UnitCore, UnitId, UnitStatus};

#[cfg(feature = "macros")]
pub use lookout_macros::{Monitored, Reflect};

pub type Result<T = ()> = std::result::Result<T, Error>;
