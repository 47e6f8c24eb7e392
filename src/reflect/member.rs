use std::{any::Any, borrow::Cow, fmt, rc::Rc};

use crate::{
    FormatData, Inspect, OutParameterHandle, Reflect, TypeInfo, UiPosition, ValueProcessorFactory,
};

/// Closed set of member kinds that can be monitored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MemberKind {
    Field,
    Property,
    Event,
    Method,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Field => write!(f, "field"),
            MemberKind::Property => write!(f, "property"),
            MemberKind::Event => write!(f, "event"),
            MemberKind::Method => write!(f, "method"),
        }
    }
}

/// Argument value declared on a monitored method.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Str(Cow<'static, str>),
}

macro_rules! arg_value_from {
    ($variant:ident: $($t:ty),*) => {
        $(
            impl From<$t> for ArgValue {
                fn from(value: $t) -> Self {
                    ArgValue::$variant(value.into())
                }
            }
        )*
    };
}

arg_value_from!(Int: i8, i16, i32, i64);
arg_value_from!(UInt: u8, u16, u32, u64);
arg_value_from!(Float: f32, f64);
arg_value_from!(Bool: bool);
arg_value_from!(Char: char);
arg_value_from!(Str: &'static str, String);

/// Conversion from a declared [`ArgValue`] into a parameter type.
///
/// Custom parameter types can implement this with an empty body; they then
/// only accept their parameter default or `Default::default()`.
pub trait FromArg: Sized {
    fn from_arg(_value: &ArgValue) -> Option<Self> {
        None
    }
}

macro_rules! from_arg_integer {
    ($($t:ty),*) => {
        $(
            impl FromArg for $t {
                fn from_arg(value: &ArgValue) -> Option<Self> {
                    match value {
                        ArgValue::Int(v) => <$t>::try_from(*v).ok(),
                        ArgValue::UInt(v) => <$t>::try_from(*v).ok(),
                        ArgValue::Bool(v) => Some(<$t>::from(*v)),
                        _ => None,
                    }
                }
            }
        )*
    };
}

from_arg_integer!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

macro_rules! from_arg_float {
    ($($t:ty),*) => {
        $(
            impl FromArg for $t {
                fn from_arg(value: &ArgValue) -> Option<Self> {
                    match value {
                        ArgValue::Float(v) => Some(*v as $t),
                        ArgValue::Int(v) => Some(*v as $t),
                        ArgValue::UInt(v) => Some(*v as $t),
                        _ => None,
                    }
                }
            }
        )*
    };
}

from_arg_float!(f32, f64);

impl FromArg for bool {
    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Bool(v) => Some(*v),
            ArgValue::Int(v) => Some(*v != 0),
            ArgValue::UInt(v) => Some(*v != 0),
            _ => None,
        }
    }
}

impl FromArg for char {
    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Char(v) => Some(*v),
            ArgValue::Str(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl FromArg for String {
    fn from_arg(value: &ArgValue) -> Option<Self> {
        Some(match value {
            ArgValue::Str(s) => s.to_string(),
            ArgValue::Bool(v) => v.to_string(),
            ArgValue::Int(v) => v.to_string(),
            ArgValue::UInt(v) => v.to_string(),
            ArgValue::Float(v) => v.to_string(),
            ArgValue::Char(v) => v.to_string(),
        })
    }
}

/// Display overrides and declared arguments attached to a monitored member.
///
/// Every field is optional; unset fields fall back to the [`Config`](crate::Config)
/// defaults when the profile resolves its [`FormatData`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorAttribute {
    pub label: Option<String>,
    pub format: Option<String>,
    pub show_indexer: Option<bool>,
    pub font_size: Option<i32>,
    pub position: Option<UiPosition>,
    pub allow_grouping: Option<bool>,
    pub group: Option<String>,
    pub element_indent: Option<usize>,
    /// Arguments for method parameters, aligned by parameter position.
    /// `None` entries fall through to the parameter default.
    pub args: Vec<Option<ArgValue>>,
}

pub(crate) type ValueFactory = Rc<dyn Fn() -> Box<dyn Any>>;

type ConvertFn = fn(&ArgValue) -> Option<Box<dyn Any>>;
type OutHandleFn = fn(usize, &str, &FormatData, &ValueProcessorFactory) -> OutParameterHandle;

/// One declared parameter of a monitored method.
#[derive(Clone)]
pub struct ParameterInfo {
    name: Cow<'static, str>,
    position: usize,
    type_info: TypeInfo,
    is_out: bool,
    default: Option<ValueFactory>,
    zero: fn() -> Box<dyn Any>,
    convert: Option<ConvertFn>,
    out_handle: Option<OutHandleFn>,
}

fn zero_of<P: Default + 'static>() -> Box<dyn Any> {
    Box::new(P::default())
}

fn convert_to<P: FromArg + 'static>(value: &ArgValue) -> Option<Box<dyn Any>> {
    P::from_arg(value).map(|p| Box::new(p) as Box<dyn Any>)
}

fn out_handle_for<P: Inspect + Reflect>(
    position: usize,
    name: &str,
    format: &FormatData,
    factory: &ValueProcessorFactory,
) -> OutParameterHandle {
    OutParameterHandle::for_type::<P>(position, name, format, factory)
}

impl ParameterInfo {
    pub(crate) fn input<P>(name: impl Into<Cow<'static, str>>, position: usize) -> Self
    where
        P: Reflect + Default + FromArg,
    {
        Self {
            name: name.into(),
            position,
            type_info: P::type_info(),
            is_out: false,
            default: None,
            zero: zero_of::<P>,
            convert: Some(convert_to::<P>),
            out_handle: None,
        }
    }

    pub(crate) fn output<P>(name: impl Into<Cow<'static, str>>, position: usize) -> Self
    where
        P: Reflect + Inspect + Default,
    {
        Self {
            name: name.into(),
            position,
            type_info: P::type_info(),
            is_out: true,
            default: None,
            zero: zero_of::<P>,
            convert: None,
            out_handle: Some(out_handle_for::<P>),
        }
    }

    pub(crate) fn with_default<P: Clone + 'static>(mut self, value: P) -> Self {
        self.default = Some(Rc::new(move || Box::new(value.clone()) as Box<dyn Any>));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    pub fn is_out(&self) -> bool {
        self.is_out
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub(crate) fn default_factory(&self) -> Option<ValueFactory> {
        self.default.clone()
    }

    pub(crate) fn zero_factory(&self) -> fn() -> Box<dyn Any> {
        self.zero
    }

    /// Convert a declared argument; `None` when the parameter does not
    /// accept declared arguments or the conversion fails.
    pub(crate) fn convert(&self, value: &ArgValue) -> Option<Box<dyn Any>> {
        self.convert.and_then(|convert| convert(value))
    }

    pub(crate) fn out_handle(
        &self,
        format: &FormatData,
        factory: &ValueProcessorFactory,
    ) -> Option<OutParameterHandle> {
        self.out_handle
            .map(|create| create(self.position, &self.name, format, factory))
    }
}

impl fmt::Debug for ParameterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterInfo")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("type_info", &self.type_info.syntax_name())
            .field("is_out", &self.is_out)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

/// Reflection record of one monitored member.
#[derive(Debug, Clone)]
pub struct MemberInfo {
    name: Cow<'static, str>,
    kind: MemberKind,
    declaring: TypeInfo,
    value_type: TypeInfo,
    is_static: bool,
    parameters: Vec<ParameterInfo>,
}

impl MemberInfo {
    pub(crate) fn new(
        name: impl Into<Cow<'static, str>>,
        kind: MemberKind,
        declaring: TypeInfo,
        value_type: TypeInfo,
        is_static: bool,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            declaring,
            value_type,
            is_static,
            parameters: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn declaring_type(&self) -> &TypeInfo {
        &self.declaring
    }

    pub fn value_type(&self) -> &TypeInfo {
        &self.value_type
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    pub(crate) fn push_parameter(&mut self, parameter: ParameterInfo) {
        self.parameters.push(parameter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_conversion_checks_range() {
        assert_eq!(u8::from_arg(&ArgValue::Int(200)), Some(200));
        assert_eq!(u8::from_arg(&ArgValue::Int(-1)), None);
        assert_eq!(i32::from_arg(&ArgValue::Float(1.5)), None);
        assert_eq!(f32::from_arg(&ArgValue::Int(3)), Some(3.0));
    }

    #[test]
    fn char_and_string_conversion() {
        assert_eq!(char::from_arg(&"x".into()), Some('x'));
        assert_eq!(char::from_arg(&"xy".into()), None);
        assert_eq!(String::from_arg(&ArgValue::Int(7)), Some("7".to_string()));
    }

    #[test]
    fn parameter_defaults_and_zero() {
        let param = ParameterInfo::input::<i32>("count", 0).with_default(5_i32);
        assert!(param.has_default());
        let default = param.default_factory().map(|f| f());
        assert_eq!(default.and_then(|b| b.downcast::<i32>().ok()).map(|b| *b), Some(5));
        let zero = (param.zero_factory())();
        assert_eq!(zero.downcast_ref::<i32>(), Some(&0));
        assert!(param.convert(&ArgValue::Str("nope".into())).is_none());
    }
}
