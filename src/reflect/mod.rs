//! Type metadata standing in for runtime reflection.
//!
//! Every monitored value type and every monitored target implements
//! [`Reflect`], usually through `#[derive(Reflect)]` or
//! `#[derive(Monitored)]`. The resulting [`TypeInfo`] carries what discovery
//! and AOT generation need to know: the rendered name, visibility, storage
//! kind, generic arguments and the disable marker.

mod member;
mod members;

use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
    rc::Rc,
};

pub use member::{ArgValue, FromArg, MemberInfo, MemberKind, MonitorAttribute, ParameterInfo};
pub(crate) use member::ValueFactory;
pub(crate) use members::collect_members;
pub use members::{Annotate, MemberEntry, MemberSlot, Members, MethodSlot, Monitored};

/// Access level of a type, as declared in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Visibility {
    #[default]
    Public,
    /// `pub(crate)`, `pub(super)` or `pub(in ..)`.
    Restricted,
    Private,
}

/// Storage kind of a type.
///
/// Reference kinds live behind a pointer and can be substituted by
/// [`Object`](crate::aot::Object) when they are not accessible. Value kinds
/// cannot be substituted. Fieldless enums carry their storage size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeKind {
    Primitive,
    Reference,
    Value,
    Enum { size: u8 },
}

/// Syntactic form used when rendering a type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeForm {
    /// `path<args..>`
    Named,
    /// `[T; N]`
    Array(usize),
    /// `[T]`
    Slice,
    /// `()`
    Unit,
}

/// Metadata describing one concrete type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeInfo {
    name: Cow<'static, str>,
    path: Cow<'static, str>,
    kind: TypeKind,
    form: TypeForm,
    visibility: Visibility,
    generics: Vec<TypeInfo>,
    monitoring_disabled: bool,
    is_static: bool,
}

impl TypeInfo {
    fn with_kind(
        name: impl Into<Cow<'static, str>>,
        path: impl Into<Cow<'static, str>>,
        kind: TypeKind,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind,
            form: TypeForm::Named,
            visibility: Visibility::Public,
            generics: Vec::new(),
            monitoring_disabled: false,
            is_static: false,
        }
    }

    /// A built-in scalar such as `i32` or `bool`; name and path coincide.
    pub fn primitive(name: &'static str) -> Self {
        Self::with_kind(name, name, TypeKind::Primitive)
    }

    pub fn reference(
        name: impl Into<Cow<'static, str>>,
        path: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::with_kind(name, path, TypeKind::Reference)
    }

    pub fn value(name: impl Into<Cow<'static, str>>, path: impl Into<Cow<'static, str>>) -> Self {
        Self::with_kind(name, path, TypeKind::Value)
    }

    /// A fieldless enum stored in `size` bytes.
    pub fn enumeration(
        name: impl Into<Cow<'static, str>>,
        path: impl Into<Cow<'static, str>>,
        size: usize,
    ) -> Self {
        let size = u8::try_from(size.max(1)).unwrap_or(u8::MAX);
        Self::with_kind(name, path, TypeKind::Enum { size })
    }

    /// The `()` return type of methods without a value.
    pub fn void() -> Self {
        Self {
            form: TypeForm::Unit,
            ..Self::with_kind("()", "()", TypeKind::Primitive)
        }
    }

    pub fn array(element: TypeInfo, len: usize) -> Self {
        let kind = match element.kind {
            TypeKind::Reference => TypeKind::Reference,
            _ => TypeKind::Value,
        };
        Self {
            form: TypeForm::Array(len),
            generics: vec![element],
            ..Self::with_kind("array", "array", kind)
        }
    }

    pub fn slice(element: TypeInfo) -> Self {
        Self {
            form: TypeForm::Slice,
            generics: vec![element],
            ..Self::with_kind("slice", "slice", TypeKind::Reference)
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_generics(mut self, generics: Vec<TypeInfo>) -> Self {
        self.generics = generics;
        self
    }

    pub fn with_kind_of(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark the type as excluded from monitoring discovery.
    pub fn with_monitoring_disabled(mut self, disabled: bool) -> Self {
        self.monitoring_disabled = disabled;
        self
    }

    /// Mark the type as a static-only holder that is never instantiated.
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn form(&self) -> TypeForm {
        self.form
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn generics(&self) -> &[TypeInfo] {
        &self.generics
    }

    pub fn is_monitoring_disabled(&self) -> bool {
        self.monitoring_disabled
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Whether the type can be named generically from outside its module:
    /// the type is public and so is every generic argument.
    pub fn is_accessible(&self) -> bool {
        let own = match self.form {
            TypeForm::Named => self.visibility == Visibility::Public,
            _ => true,
        };
        own && self.generics.iter().all(TypeInfo::is_accessible)
    }

    /// Short name with generic arguments, e.g. `Vec<Player>`.
    pub fn syntax_name(&self) -> String {
        let mut out = String::new();
        self.render(&mut out, false);
        out
    }

    /// Fully qualified name with generic arguments, e.g.
    /// `std::vec::Vec<game::Player>`.
    pub fn full_name(&self) -> String {
        let mut out = String::new();
        self.render(&mut out, true);
        out
    }

    fn render(&self, out: &mut String, qualified: bool) {
        match self.form {
            TypeForm::Unit => out.push_str("()"),
            TypeForm::Array(len) => {
                out.push('[');
                if let Some(element) = self.generics.first() {
                    element.render(out, qualified);
                }
                out.push_str("; ");
                out.push_str(&len.to_string());
                out.push(']');
            }
            TypeForm::Slice => {
                out.push('[');
                if let Some(element) = self.generics.first() {
                    element.render(out, qualified);
                }
                out.push(']');
            }
            TypeForm::Named => {
                out.push_str(if qualified { &self.path } else { &self.name });
                if !self.generics.is_empty() {
                    out.push('<');
                    for (i, arg) in self.generics.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        arg.render(out, qualified);
                    }
                    out.push('>');
                }
            }
        }
    }
}

impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.syntax_name())
    }
}

/// Compile-time type metadata.
pub trait Reflect: 'static {
    fn type_info() -> TypeInfo;
}

macro_rules! reflect_primitive {
    ($($t:ty),* $(,)?) => {
        $(
            impl Reflect for $t {
                fn type_info() -> TypeInfo {
                    TypeInfo::primitive(stringify!($t))
                }
            }
        )*
    };
}

reflect_primitive!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char
);

impl Reflect for () {
    fn type_info() -> TypeInfo {
        TypeInfo::void()
    }
}

impl Reflect for String {
    fn type_info() -> TypeInfo {
        TypeInfo::reference("String", "std::string::String")
    }
}

impl Reflect for &'static str {
    fn type_info() -> TypeInfo {
        TypeInfo::reference("&str", "&'static str")
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::reference("Vec", "std::vec::Vec").with_generics(vec![T::type_info()])
    }
}

impl<T: Reflect> Reflect for VecDeque<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::reference("VecDeque", "std::collections::VecDeque")
            .with_generics(vec![T::type_info()])
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn type_info() -> TypeInfo {
        TypeInfo::array(T::type_info(), N)
    }
}

impl<T: Reflect> Reflect for [T] {
    fn type_info() -> TypeInfo {
        TypeInfo::slice(T::type_info())
    }
}

impl<T: Reflect + ?Sized> Reflect for Box<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::reference("Box", "std::boxed::Box").with_generics(vec![T::type_info()])
    }
}

impl<T: Reflect + ?Sized> Reflect for Rc<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::reference("Rc", "std::rc::Rc").with_generics(vec![T::type_info()])
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn type_info() -> TypeInfo {
        let inner = T::type_info();
        let kind = match inner.kind() {
            TypeKind::Primitive => TypeKind::Value,
            other => other,
        };
        TypeInfo::value("Option", "std::option::Option")
            .with_kind_of(kind)
            .with_generics(vec![inner])
    }
}

impl<K: Reflect, V: Reflect, S: 'static> Reflect for HashMap<K, V, S> {
    fn type_info() -> TypeInfo {
        TypeInfo::reference("HashMap", "std::collections::HashMap")
            .with_generics(vec![K::type_info(), V::type_info()])
    }
}

impl<K: Reflect, V: Reflect> Reflect for BTreeMap<K, V> {
    fn type_info() -> TypeInfo {
        TypeInfo::reference("BTreeMap", "std::collections::BTreeMap")
            .with_generics(vec![K::type_info(), V::type_info()])
    }
}

impl<T: Reflect, S: 'static> Reflect for HashSet<T, S> {
    fn type_info() -> TypeInfo {
        TypeInfo::reference("HashSet", "std::collections::HashSet")
            .with_generics(vec![T::type_info()])
    }
}

impl<T: Reflect> Reflect for BTreeSet<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::reference("BTreeSet", "std::collections::BTreeSet")
            .with_generics(vec![T::type_info()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_generic_names() {
        let info = <HashMap<String, Vec<i32>>>::type_info();
        assert_eq!(info.syntax_name(), "HashMap<String, Vec<i32>>");
        assert_eq!(
            info.full_name(),
            "std::collections::HashMap<std::string::String, std::vec::Vec<i32>>"
        );
        assert_eq!(<[u8; 4]>::type_info().full_name(), "[u8; 4]");
        assert_eq!(<Box<[f32]>>::type_info().syntax_name(), "Box<[f32]>");
        assert_eq!(<()>::type_info().full_name(), "()");
    }

    #[test]
    fn accessibility_follows_generic_arguments() {
        let hidden = TypeInfo::value("Secret", "game::Secret").with_visibility(Visibility::Private);
        assert!(!hidden.is_accessible());

        let list = TypeInfo::reference("Vec", "std::vec::Vec").with_generics(vec![hidden.clone()]);
        assert!(!list.is_accessible());

        let array = TypeInfo::array(hidden, 3);
        assert!(!array.is_accessible());
        assert_eq!(array.kind(), TypeKind::Value);

        assert!(<Vec<Option<u8>>>::type_info().is_accessible());
    }

    #[test]
    fn enumeration_size_is_at_least_one_byte() {
        assert_eq!(
            TypeInfo::enumeration("Empty", "game::Empty", 0).kind(),
            TypeKind::Enum { size: 1 }
        );
    }
}
