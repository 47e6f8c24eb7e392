use std::{
    any::Any,
    cell::RefCell,
    collections::HashSet,
};

use crate::{MemberKind, TypeInfo};

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error(
        "`{name}` is not accessible ({path}). Private value types cannot be instantiated \
         generically; make `{name}` public or hold it behind a reference type."
    )]
    InaccessibleType { name: String, path: String },

    #[error("{kind} `{member}` declares {declared} arguments but takes {expected} input parameters")]
    ArgumentCount {
        kind: MemberKind,
        member: String,
        declared: usize,
        expected: usize,
    },

    #[error("argument {index} of `{member}` cannot be converted to `{expected}`")]
    ArgumentConversion {
        member: String,
        index: usize,
        expected: String,
    },

    #[error("unit target for `{member}` must be `{expected}`")]
    TargetTypeMismatch { member: String, expected: String },

    #[error("monitoring is disabled")]
    MonitoringDisabled,

    #[error("monitoring has been shut down")]
    ShutDown,

    #[error("{0} AOT type definitions could not be generated")]
    TypeGeneration(usize),

    #[error("IO Error: {0}")]
    Io(String),

    #[cfg(feature = "serde")]
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    pub(crate) fn inaccessible(info: &TypeInfo) -> Self {
        Error::InaccessibleType {
            name: info.syntax_name(),
            path: info.full_name(),
        }
    }
}

/// Why a unit could not compute its state.
///
/// Faults stay inside the unit: the unit keeps its last good state and
/// reports the fault through [`MonitorUnit::fault`](crate::MonitorUnit::fault).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("target has been dropped")]
    TargetDropped,

    #[error("target is mutably borrowed")]
    TargetBusy,

    #[error("instance member invoked without a target")]
    MissingTarget,

    #[error("accessor panicked: {0}")]
    Panicked(String),

    #[error("accessor failed: {0}")]
    Failed(String),
}

impl Fault {
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        if let Some(message) = payload.downcast_ref::<&str>() {
            return Fault::Panicked((*message).to_string());
        }
        if let Some(message) = payload.downcast_ref::<String>() {
            return Fault::Panicked(message.clone());
        }
        Fault::Panicked("unknown panic payload".to_string())
    }
}

/// Ordered, de-duplicated record of discovery and generation errors.
///
/// Every new entry is also emitted at `error` level. Entries with the same
/// message are recorded once.
#[derive(Debug, Default)]
pub struct ErrorLog {
    entries: RefCell<Vec<Error>>,
    seen: RefCell<HashSet<String>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error. Returns `false` if the same message was already logged.
    pub fn record(&self, error: Error) -> bool {
        let message = error.to_string();
        if !self.seen.borrow_mut().insert(message.clone()) {
            return false;
        }
        tracing::error!(error = %message, "monitoring error");
        self.entries.borrow_mut().push(error);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Snapshot of all recorded errors in insertion order.
    pub fn entries(&self) -> Vec<Error> {
        self.entries.borrow().clone()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
        self.seen.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_log_deduplicates_by_message() {
        let log = ErrorLog::new();
        assert!(log.record(Error::MonitoringDisabled));
        assert!(!log.record(Error::MonitoringDisabled));
        assert!(log.record(Error::ShutDown));
        assert_eq!(log.len(), 2);

        log.clear();
        assert!(log.is_empty());
        assert!(log.record(Error::MonitoringDisabled));
    }

    #[test]
    fn fault_from_panic_payload() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(Fault::from_panic(payload.as_ref()), Fault::Panicked("boom".into()));

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(Fault::from_panic(payload.as_ref()), Fault::Panicked("bang".into()));

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert!(matches!(Fault::from_panic(payload.as_ref()), Fault::Panicked(_)));
    }
}
