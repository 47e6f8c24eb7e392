//! Profiles: immutable per-member metadata with the compiled accessor.
//!
//! A profile is built once per monitored member. Its accessor closure and
//! value processor are compiled at construction, so creating a unit and
//! refreshing it never inspect types again.

mod event;
mod field;
mod method;
mod property;

use std::{
    any::{Any, TypeId},
    borrow::Cow,
    cell::RefCell,
    fmt,
    rc::Rc,
};

pub use event::{EventAccess, EventProfile};
pub use field::FieldProfile;
pub use method::{Arguments, Invoker, MethodProfile, MethodResult};
pub(crate) use method::MethodReader;
pub use property::PropertyProfile;

use crate::{
    Config, Error, Fault, FormatData, Inspect, Label, MemberInfo, MemberKind, MonitorAttribute,
    MonitorUnit, Result, TypeInfo, ValueProcessor, ValueProcessorFactory, units::Binding,
};

/// Compiled accessor of a field or property, already wrapped with the
/// value processor.
pub(crate) type Reader<T> = Rc<dyn Fn(Option<&T>) -> std::result::Result<String, Fault>>;

/// Getter of a field or property value.
pub enum Getter<T, V> {
    /// Borrow the value from the target.
    Ref(Box<dyn for<'a> Fn(&'a T) -> &'a V>),
    /// Compute the value from the target; an `Err` faults the unit.
    Instance(Box<dyn Fn(&T) -> std::result::Result<V, String>>),
    /// Compute the value without a target.
    Static(Box<dyn Fn() -> std::result::Result<V, String>>),
}

impl<T: 'static, V: Inspect> Getter<T, V> {
    pub(crate) fn compile(self, processor: ValueProcessor<V>) -> Reader<T> {
        match self {
            Getter::Ref(get) => Rc::new(move |target: Option<&T>| {
                let target = target.ok_or(Fault::MissingTarget)?;
                Ok(processor(get(target)))
            }),
            Getter::Instance(get) => Rc::new(move |target: Option<&T>| {
                let target = target.ok_or(Fault::MissingTarget)?;
                get(target).map(|value| processor(&value)).map_err(Fault::Failed)
            }),
            Getter::Static(get) => Rc::new(move |_: Option<&T>| {
                get().map(|value| processor(&value)).map_err(Fault::Failed)
            }),
        }
    }
}

/// Construction context handed to every profile constructor.
#[derive(Debug, Clone, Copy)]
pub struct ProfileCtorArgs<'a> {
    pub config: &'a Config,
    pub factory: &'a ValueProcessorFactory,
}

impl<'a> ProfileCtorArgs<'a> {
    pub fn new(config: &'a Config, factory: &'a ValueProcessorFactory) -> Self {
        Self { config, factory }
    }
}

/// Metadata shared by a profile and all of its units.
pub struct ProfileInfo {
    member: MemberInfo,
    format: FormatData,
    target_type: TypeId,
    profile_type: TypeInfo,
    unit_type: TypeInfo,
}

impl ProfileInfo {
    pub(crate) fn new<T: 'static>(
        member: &MemberInfo,
        attribute: &MonitorAttribute,
        config: &Config,
    ) -> Self {
        let format = FormatData::resolve(member.name(), member.declaring_type(), attribute, config);
        let [profile_type, unit_type] = generic_descriptors(
            member.kind(),
            member.declaring_type().clone(),
            member.value_type().clone(),
        );
        Self {
            member: member.clone(),
            format,
            target_type: TypeId::of::<T>(),
            profile_type,
            unit_type,
        }
    }

    pub fn member(&self) -> &MemberInfo {
        &self.member
    }

    pub fn kind(&self) -> MemberKind {
        self.member.kind()
    }

    pub fn declaring_type(&self) -> &TypeInfo {
        self.member.declaring_type()
    }

    pub fn value_type(&self) -> &TypeInfo {
        self.member.value_type()
    }

    pub fn is_static(&self) -> bool {
        self.member.is_static()
    }

    pub fn format(&self) -> &FormatData {
        &self.format
    }

    pub fn target_type_id(&self) -> TypeId {
        self.target_type
    }

    /// Concrete generic profile type, e.g. `FieldProfile<game::Player, i32>`.
    pub fn profile_type(&self) -> &TypeInfo {
        &self.profile_type
    }

    /// Concrete generic unit type, e.g. `ValueUnit<game::Player, i32>`.
    pub fn unit_type(&self) -> &TypeInfo {
        &self.unit_type
    }
}

impl fmt::Debug for ProfileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileInfo")
            .field("member", &self.member.name())
            .field("kind", &self.member.kind())
            .field("profile_type", &self.profile_type.syntax_name())
            .field("format", &self.format)
            .finish()
    }
}

/// Profile and unit type descriptors of a member kind, generic over the
/// target and value type.
pub(crate) fn generic_descriptors(kind: MemberKind, target: TypeInfo, value: TypeInfo) -> [TypeInfo; 2] {
    let (profile, unit) = match kind {
        MemberKind::Field => ("FieldProfile", "ValueUnit"),
        MemberKind::Property => ("PropertyProfile", "ValueUnit"),
        MemberKind::Event => ("EventProfile", "EventUnit"),
        MemberKind::Method => ("MethodProfile", "MethodUnit"),
    };
    let generics = vec![target, value];
    [
        TypeInfo::reference(profile, format!("lookout::profiles::{profile}"))
            .with_generics(generics.clone()),
        TypeInfo::reference(unit, format!("lookout::units::{unit}")).with_generics(generics),
    ]
}

/// Target handed to [`MonitorProfile::create_unit`].
#[derive(Clone, Copy)]
pub enum UnitTarget<'a> {
    Static,
    /// An `Rc<RefCell<T>>` of the profile's declaring type.
    Instance(&'a dyn Any),
}

impl<'a> UnitTarget<'a> {
    pub fn instance<T: 'static>(target: &'a Rc<RefCell<T>>) -> Self {
        UnitTarget::Instance(target)
    }
}

/// Resolve the binding of a new unit. Static profiles ignore the target.
pub(crate) fn bind_target<T: 'static>(info: &ProfileInfo, target: UnitTarget<'_>) -> Result<Binding<T>> {
    if info.is_static() {
        return Ok(Binding::Static);
    }
    let instance = match target {
        UnitTarget::Instance(any) => any.downcast_ref::<Rc<RefCell<T>>>(),
        UnitTarget::Static => None,
    };
    instance
        .map(|rc| Binding::instance(Rc::downgrade(rc)))
        .ok_or_else(|| Error::TargetTypeMismatch {
            member: info.member().name().to_owned(),
            expected: format!("Rc<RefCell<{}>>", info.declaring_type().syntax_name()),
        })
}

/// A monitored member's immutable profile.
pub trait MonitorProfile {
    fn info(&self) -> &Rc<ProfileInfo>;

    /// Create a unit bound to `target`. Static profiles accept
    /// [`UnitTarget::Static`]; instance profiles need the `Rc<RefCell<T>>`.
    fn create_unit(&self, target: UnitTarget<'_>) -> Result<Rc<dyn MonitorUnit>>;
}

impl Label for dyn MonitorProfile {
    fn label(&self) -> Cow<'static, str> {
        Cow::Owned(self.info().format().label().to_owned())
    }
}

impl fmt::Debug for dyn MonitorProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.info().as_ref(), f)
    }
}
