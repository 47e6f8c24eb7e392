use std::{any::TypeId, borrow::Cow, fmt};

use crate::{Label, MemberEntry, Monitored, TypeInfo, reflect::collect_members};

/// A registered monitored type.
#[derive(Clone)]
pub struct TypeEntry {
    type_id: TypeId,
    info: TypeInfo,
    disabled: bool,
    describe: fn() -> Vec<MemberEntry>,
}

impl TypeEntry {
    pub fn of<T: Monitored>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            info: T::type_info(),
            disabled: T::monitoring_disabled(),
            describe: collect_members::<T>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn info(&self) -> &TypeInfo {
        &self.info
    }

    pub fn is_monitoring_disabled(&self) -> bool {
        self.disabled
    }

    /// Declared members, with fresh accessors on every call.
    pub fn members(&self) -> Vec<MemberEntry> {
        (self.describe)()
    }
}

impl fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEntry")
            .field("type", &self.info.full_name())
            .field("disabled", &self.disabled)
            .finish()
    }
}

/// A named group of monitored types, the unit of discovery filtering.
///
/// ```rust
/// use lookout::{Assembly, Members, Monitored, Reflect};
///
/// #[derive(Reflect)]
/// pub struct Stats;
///
/// impl Monitored for Stats {
///     fn describe(members: &mut Members<Self>) {
///         members.static_property("uptime", || 42_u64);
///     }
/// }
///
/// let game = Assembly::new("game").register::<Stats>();
/// assert_eq!(game.types().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Assembly {
    name: Cow<'static, str>,
    types: Vec<TypeEntry>,
    disable_monitoring: bool,
    editor_only: bool,
}

impl Assembly {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
            disable_monitoring: false,
            editor_only: false,
        }
    }

    pub fn register<T: Monitored>(mut self) -> Self {
        let entry = TypeEntry::of::<T>();
        if !self.types.iter().any(|t| t.type_id == entry.type_id) {
            self.types.push(entry);
        }
        self
    }

    /// Exclude every type of this assembly from discovery.
    pub fn disable_monitoring(mut self, disable: bool) -> Self {
        self.disable_monitoring = disable;
        self
    }

    /// Tooling-only assemblies are profiled but skipped by AOT generation.
    pub fn editor_only(mut self, editor_only: bool) -> Self {
        self.editor_only = editor_only;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn types(&self) -> &[TypeEntry] {
        &self.types
    }

    pub fn is_monitoring_disabled(&self) -> bool {
        self.disable_monitoring
    }

    pub fn is_editor_only(&self) -> bool {
        self.editor_only
    }
}

impl Label for Assembly {
    fn label(&self) -> Cow<'static, str> {
        Cow::Owned(self.name.to_string())
    }
}
