use std::borrow::Cow;

use crate::MemberKind;

/// Human-readable name of an item, used in log fields and by display
/// front ends to title units and groups.
pub trait Label {
    fn label(&self) -> Cow<'static, str>;
}

impl Label for MemberKind {
    fn label(&self) -> Cow<'static, str> {
        Cow::Borrowed(match self {
            MemberKind::Field => "Field",
            MemberKind::Property => "Property",
            MemberKind::Event => "Event",
            MemberKind::Method => "Method",
        })
    }
}
