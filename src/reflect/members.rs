use std::{borrow::Cow, fmt::Display, marker::PhantomData, rc::Rc};

use crate::{
    ArgValue, EventSource, FromArg, Inspect, MemberInfo, MemberKind, MonitorAttribute,
    ParameterInfo, Reflect, Result, TypeInfo, UiPosition,
    profiles::{
        Arguments, EventAccess, EventProfile, FieldProfile, Getter, Invoker, MethodProfile,
        MonitorProfile, ProfileCtorArgs, PropertyProfile,
    },
};

/// A type whose members can be monitored.
///
/// Usually derived with `#[derive(Monitored)]`, which registers every field
/// carrying a `#[monitor]` attribute. Properties, events and methods are
/// declared in a `describe` hook:
///
/// ```rust
/// use lookout::{Annotate, Members, Monitored, Reflect};
///
/// #[derive(Reflect)]
/// pub struct Player {
///     health: i32,
/// }
///
/// impl Monitored for Player {
///     fn describe(members: &mut Members<Self>) {
///         members.field("health", |p: &Player| &p.health).label("HP");
///         members.property("alive", |p: &Player| p.health > 0);
///     }
/// }
/// ```
pub trait Monitored: Reflect + Sized {
    fn describe(members: &mut Members<Self>);

    /// Types returning `true` are skipped by discovery.
    fn monitoring_disabled() -> bool {
        Self::type_info().is_monitoring_disabled()
    }
}

type BuildFn = Box<
    dyn FnOnce(&MemberInfo, &MonitorAttribute, &ProfileCtorArgs<'_>) -> Result<Rc<dyn MonitorProfile>>,
>;

/// One declared member: its reflection record, its attribute and the
/// deferred profile constructor.
pub struct MemberEntry {
    info: MemberInfo,
    attribute: MonitorAttribute,
    build: BuildFn,
}

impl MemberEntry {
    pub fn info(&self) -> &MemberInfo {
        &self.info
    }

    pub fn attribute(&self) -> &MonitorAttribute {
        &self.attribute
    }

    pub(crate) fn into_profile(self, args: &ProfileCtorArgs<'_>) -> Result<Rc<dyn MonitorProfile>> {
        (self.build)(&self.info, &self.attribute, args)
    }
}

impl std::fmt::Debug for MemberEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberEntry")
            .field("info", &self.info)
            .field("attribute", &self.attribute)
            .finish_non_exhaustive()
    }
}

fn erase<P: MonitorProfile + 'static>(profile: Result<P>) -> Result<Rc<dyn MonitorProfile>> {
    profile.map(|p| Rc::new(p) as Rc<dyn MonitorProfile>)
}

/// Collector of the monitored members of `T`.
pub struct Members<T> {
    declaring: TypeInfo,
    entries: Vec<MemberEntry>,
    _target: PhantomData<fn(&T)>,
}

impl<T: Reflect> Default for Members<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Reflect> Members<T> {
    pub fn new() -> Self {
        Self {
            declaring: T::type_info(),
            entries: Vec::new(),
            _target: PhantomData,
        }
    }

    pub fn declaring_type(&self) -> &TypeInfo {
        &self.declaring
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<MemberEntry> {
        self.entries
    }

    fn push<B>(&mut self, info: MemberInfo, build: B) -> &mut MemberEntry
    where
        B: FnOnce(&MemberInfo, &MonitorAttribute, &ProfileCtorArgs<'_>) -> Result<Rc<dyn MonitorProfile>>
            + 'static,
    {
        self.entries.push(MemberEntry {
            info,
            attribute: MonitorAttribute::default(),
            build: Box::new(build),
        });
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    fn member<V: Reflect + ?Sized>(
        &self,
        name: impl Into<Cow<'static, str>>,
        kind: MemberKind,
        is_static: bool,
    ) -> MemberInfo {
        MemberInfo::new(name, kind, self.declaring.clone(), V::type_info(), is_static)
    }

    /// An instance field read by reference.
    pub fn field<V, F>(&mut self, name: impl Into<Cow<'static, str>>, getter: F) -> MemberSlot<'_>
    where
        V: Reflect + Inspect,
        F: for<'a> Fn(&'a T) -> &'a V + 'static,
    {
        let info = self.member::<V>(name, MemberKind::Field, false);
        let entry = self.push(info, move |info, attribute, args| {
            erase(FieldProfile::<T, V>::new(info, attribute, Getter::Ref(Box::new(getter)), args))
        });
        MemberSlot::new(&mut entry.attribute)
    }

    /// A field with no receiver, e.g. a `static` or a thread-local.
    pub fn static_field<V, F>(&mut self, name: impl Into<Cow<'static, str>>, getter: F) -> MemberSlot<'_>
    where
        V: Reflect + Inspect,
        F: Fn() -> V + 'static,
    {
        let info = self.member::<V>(name, MemberKind::Field, true);
        let entry = self.push(info, move |info, attribute, args| {
            let getter = Getter::Static(Box::new(move || Ok(getter())));
            erase(FieldProfile::<T, V>::new(info, attribute, getter, args))
        });
        MemberSlot::new(&mut entry.attribute)
    }

    /// A computed value.
    pub fn property<V, F>(&mut self, name: impl Into<Cow<'static, str>>, getter: F) -> MemberSlot<'_>
    where
        V: Reflect + Inspect,
        F: Fn(&T) -> V + 'static,
    {
        self.try_property(name, move |target: &T| Ok::<V, std::convert::Infallible>(getter(target)))
    }

    /// A computed value whose getter can fail. An `Err` faults the unit.
    pub fn try_property<V, E, F>(&mut self, name: impl Into<Cow<'static, str>>, getter: F) -> MemberSlot<'_>
    where
        V: Reflect + Inspect,
        E: Display,
        F: Fn(&T) -> std::result::Result<V, E> + 'static,
    {
        let info = self.member::<V>(name, MemberKind::Property, false);
        let entry = self.push(info, move |info, attribute, args| {
            let getter = Getter::Instance(Box::new(move |target: &T| {
                getter(target).map_err(|e| e.to_string())
            }));
            erase(PropertyProfile::<T, V>::new(info, attribute, getter, args))
        });
        MemberSlot::new(&mut entry.attribute)
    }

    pub fn static_property<V, F>(&mut self, name: impl Into<Cow<'static, str>>, getter: F) -> MemberSlot<'_>
    where
        V: Reflect + Inspect,
        F: Fn() -> V + 'static,
    {
        let info = self.member::<V>(name, MemberKind::Property, true);
        let entry = self.push(info, move |info, attribute, args| {
            let getter = Getter::Static(Box::new(move || Ok(getter())));
            erase(PropertyProfile::<T, V>::new(info, attribute, getter, args))
        });
        MemberSlot::new(&mut entry.attribute)
    }

    /// An event owned by the target. The unit subscribes when it is created.
    pub fn event<A, F>(&mut self, name: impl Into<Cow<'static, str>>, source: F) -> MemberSlot<'_>
    where
        A: Reflect + Inspect,
        F: for<'a> Fn(&'a T) -> &'a EventSource<A> + 'static,
    {
        let info = self.member::<A>(name, MemberKind::Event, false);
        let entry = self.push(info, move |info, attribute, args| {
            erase(EventProfile::<T, A>::new(info, attribute, EventAccess::Instance(Rc::new(source)), args))
        });
        MemberSlot::new(&mut entry.attribute)
    }

    pub fn static_event<A, F>(&mut self, name: impl Into<Cow<'static, str>>, source: F) -> MemberSlot<'_>
    where
        A: Reflect + Inspect,
        F: Fn() -> EventSource<A> + 'static,
    {
        let info = self.member::<A>(name, MemberKind::Event, true);
        let entry = self.push(info, move |info, attribute, args| {
            erase(EventProfile::<T, A>::new(info, attribute, EventAccess::Static(Rc::new(source)), args))
        });
        MemberSlot::new(&mut entry.attribute)
    }

    /// A method invoked on every refresh. Parameters are declared on the
    /// returned slot in positional order.
    pub fn method<R, F>(&mut self, name: impl Into<Cow<'static, str>>, invoker: F) -> MethodSlot<'_>
    where
        R: Reflect + Inspect,
        F: Fn(&T, &mut Arguments) -> R + 'static,
    {
        let info = self.member::<R>(name, MemberKind::Method, false);
        let entry = self.push(info, move |info, attribute, args| {
            erase(MethodProfile::<T, R>::new(info, attribute, Invoker::Instance(Rc::new(invoker)), args))
        });
        MethodSlot { entry }
    }

    pub fn static_method<R, F>(&mut self, name: impl Into<Cow<'static, str>>, invoker: F) -> MethodSlot<'_>
    where
        R: Reflect + Inspect,
        F: Fn(&mut Arguments) -> R + 'static,
    {
        let info = self.member::<R>(name, MemberKind::Method, true);
        let entry = self.push(info, move |info, attribute, args| {
            erase(MethodProfile::<T, R>::new(info, attribute, Invoker::Static(Rc::new(invoker)), args))
        });
        MethodSlot { entry }
    }
}

/// Run `T::describe` and return the declared members.
pub(crate) fn collect_members<T: Monitored>() -> Vec<MemberEntry> {
    let mut members = Members::<T>::new();
    T::describe(&mut members);
    members.into_entries()
}

/// Attribute setters shared by member slots.
pub trait Annotate: Sized {
    fn attribute_mut(&mut self) -> &mut MonitorAttribute;

    fn label(mut self, label: impl Into<String>) -> Self {
        self.attribute_mut().label = Some(label.into());
        self
    }

    /// Number format such as `F2`, `N0`, `X8` or `#,##0.0`.
    fn format(mut self, format: impl Into<String>) -> Self {
        self.attribute_mut().format = Some(format.into());
        self
    }

    fn show_indexer(mut self, show: bool) -> Self {
        self.attribute_mut().show_indexer = Some(show);
        self
    }

    fn font_size(mut self, size: i32) -> Self {
        self.attribute_mut().font_size = Some(size);
        self
    }

    fn position(mut self, position: UiPosition) -> Self {
        self.attribute_mut().position = Some(position);
        self
    }

    fn allow_grouping(mut self, allow: bool) -> Self {
        self.attribute_mut().allow_grouping = Some(allow);
        self
    }

    fn group(mut self, group: impl Into<String>) -> Self {
        self.attribute_mut().group = Some(group.into());
        self
    }

    fn element_indent(mut self, indent: usize) -> Self {
        self.attribute_mut().element_indent = Some(indent);
        self
    }

    /// Replace the whole attribute, including declared arguments.
    fn set_attribute(mut self, attribute: MonitorAttribute) -> Self {
        *self.attribute_mut() = attribute;
        self
    }
}

pub struct MemberSlot<'a> {
    attribute: &'a mut MonitorAttribute,
}

impl<'a> MemberSlot<'a> {
    fn new(attribute: &'a mut MonitorAttribute) -> Self {
        Self { attribute }
    }
}

impl Annotate for MemberSlot<'_> {
    fn attribute_mut(&mut self) -> &mut MonitorAttribute {
        self.attribute
    }
}

/// Slot returned by [`Members::method`]: declares parameters and arguments.
pub struct MethodSlot<'a> {
    entry: &'a mut MemberEntry,
}

impl MethodSlot<'_> {
    fn next_position(&self) -> usize {
        self.entry.info.parameters().len()
    }

    /// An input parameter resolved from the declared argument or
    /// `P::default()`.
    pub fn param<P>(self, name: impl Into<Cow<'static, str>>) -> Self
    where
        P: Reflect + Default + FromArg,
    {
        let position = self.next_position();
        self.entry
            .info
            .push_parameter(ParameterInfo::input::<P>(name, position));
        self
    }

    /// An input parameter with its own default value.
    pub fn param_default<P>(self, name: impl Into<Cow<'static, str>>, default: P) -> Self
    where
        P: Reflect + Default + FromArg + Clone,
    {
        let position = self.next_position();
        self.entry
            .info
            .push_parameter(ParameterInfo::input::<P>(name, position).with_default(default));
        self
    }

    /// An output parameter. Its value after the call is appended to the
    /// state as an `out <name>` line.
    pub fn out<P>(self, name: impl Into<Cow<'static, str>>) -> Self
    where
        P: Reflect + Inspect + Default,
    {
        let position = self.next_position();
        self.entry
            .info
            .push_parameter(ParameterInfo::output::<P>(name, position));
        self
    }

    /// Declare the argument at the next parameter position. Entries at
    /// out positions are ignored.
    pub fn arg(mut self, value: impl Into<ArgValue>) -> Self {
        self.attribute_mut().args.push(Some(value.into()));
        self
    }

    /// Leave the next parameter position undeclared so it falls through to the
    /// parameter default.
    pub fn skip_arg(mut self) -> Self {
        self.attribute_mut().args.push(None);
        self
    }

    pub fn args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = Option<ArgValue>>,
    {
        self.attribute_mut().args.extend(args);
        self
    }
}

impl Annotate for MethodSlot<'_> {
    fn attribute_mut(&mut self) -> &mut MonitorAttribute {
        &mut self.entry.attribute
    }
}
