use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
    fmt::Write,
    rc::Rc,
};

use crate::{
    FormatData, ValueProcessor, ValueProcessorFactory,
    processing::{Number, RenderSpec},
};

/// Rendering of a monitored value.
///
/// `inspect` writes the inline form used for collection elements and
/// nested values. `processor` builds the labeled top-level processor and
/// defaults to `"<label>: <inline>"`. Collections override it to render a
/// header line followed by one line per element.
///
/// `#[derive(Reflect)]` implements this trait through `Display` or `Debug`
/// when the type carries `#[reflect(display)]` or `#[reflect(debug)]`.
pub trait Inspect: 'static {
    /// Whether the type renders as a multi-line collection listing.
    const COLLECTION: bool = false;

    fn inspect(&self, spec: &RenderSpec, out: &mut String);

    fn processor(factory: &ValueProcessorFactory, format: &FormatData) -> ValueProcessor<Self>
    where
        Self: Sized,
    {
        factory.scalar_processor(format)
    }
}

/// A collection rendered as an indexed listing.
pub trait Sequence: 'static {
    type Item: Inspect;

    /// `false` for collections without a stable order; their items are
    /// collected once per render so indices stay consistent within it.
    const INDEXABLE: bool = true;

    fn items(&self) -> impl Iterator<Item = &Self::Item>;
}

/// A collection rendered as `[key]: value` lines.
pub trait Keyed: 'static {
    type Key: Inspect;
    type Value: Inspect;

    fn entries(&self) -> impl Iterator<Item = (&Self::Key, &Self::Value)>;
}

macro_rules! inspect_number {
    ($variant:ident as $wide:ty: $($t:ty),*) => {
        $(
            impl Inspect for $t {
                fn inspect(&self, spec: &RenderSpec, out: &mut String) {
                    spec.write_number(Number::$variant(*self as $wide), out);
                }
            }
        )*
    };
}

macro_rules! inspect_signed {
    ($($t:ty),*) => {
        $(
            impl Inspect for $t {
                fn inspect(&self, spec: &RenderSpec, out: &mut String) {
                    spec.write_number(Number::signed(*self as i128, <$t>::BITS), out);
                }
            }
        )*
    };
}

inspect_signed!(i8, i16, i32, i64, i128, isize);
inspect_number!(UInt as u128: u8, u16, u32, u64, u128, usize);
inspect_number!(Float as f64: f32, f64);

macro_rules! inspect_display {
    ($($t:ty),*) => {
        $(
            impl Inspect for $t {
                fn inspect(&self, _spec: &RenderSpec, out: &mut String) {
                    let _ = write!(out, "{self}");
                }
            }
        )*
    };
}

inspect_display!(bool, char, String, &'static str);

/// The void sentinel: renders the label alone.
impl Inspect for () {
    fn inspect(&self, _spec: &RenderSpec, _out: &mut String) {}

    fn processor(factory: &ValueProcessorFactory, format: &FormatData) -> ValueProcessor<Self> {
        factory.label_processor(format)
    }
}

impl<T: Inspect> Inspect for Option<T> {
    const COLLECTION: bool = T::COLLECTION;

    fn inspect(&self, spec: &RenderSpec, out: &mut String) {
        match self {
            Some(value) => value.inspect(spec, out),
            None => out.push_str("null"),
        }
    }

    fn processor(factory: &ValueProcessorFactory, format: &FormatData) -> ValueProcessor<Self> {
        let inner = T::processor(factory, format);
        let none = if T::COLLECTION {
            format!("{}: []", format.label())
        } else {
            format!("{}: null", format.label())
        };
        Rc::new(move |value: &Option<T>| match value {
            Some(value) => inner(value),
            None => none.clone(),
        })
    }
}

impl<T: Inspect> Inspect for Box<T> {
    const COLLECTION: bool = T::COLLECTION;

    fn inspect(&self, spec: &RenderSpec, out: &mut String) {
        (**self).inspect(spec, out)
    }

    fn processor(factory: &ValueProcessorFactory, format: &FormatData) -> ValueProcessor<Self> {
        let inner = T::processor(factory, format);
        Rc::new(move |value: &Box<T>| inner(value))
    }
}

impl<T: Inspect> Inspect for Rc<T> {
    const COLLECTION: bool = T::COLLECTION;

    fn inspect(&self, spec: &RenderSpec, out: &mut String) {
        (**self).inspect(spec, out)
    }

    fn processor(factory: &ValueProcessorFactory, format: &FormatData) -> ValueProcessor<Self> {
        let inner = T::processor(factory, format);
        Rc::new(move |value: &Rc<T>| inner(value))
    }
}

fn inline_sequence<'a, T: Inspect>(
    items: impl Iterator<Item = &'a T>,
    spec: &RenderSpec,
    out: &mut String,
) {
    out.push('[');
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item.inspect(spec, out);
    }
    out.push(']');
}

fn inline_map<'a, K: Inspect, V: Inspect>(
    entries: impl Iterator<Item = (&'a K, &'a V)>,
    spec: &RenderSpec,
    out: &mut String,
) {
    out.push('{');
    for (i, (key, value)) in entries.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        key.inspect(spec, out);
        out.push_str(": ");
        value.inspect(spec, out);
    }
    out.push('}');
}

macro_rules! sequence {
    ([$($generics:tt)*] $collection:ty, $item:ty, indexable = $indexable:expr) => {
        impl<$($generics)*> Sequence for $collection {
            type Item = $item;
            const INDEXABLE: bool = $indexable;

            fn items(&self) -> impl Iterator<Item = &Self::Item> {
                self.iter()
            }
        }

        impl<$($generics)*> Inspect for $collection {
            const COLLECTION: bool = true;

            fn inspect(&self, spec: &RenderSpec, out: &mut String) {
                inline_sequence(self.iter(), spec, out)
            }

            fn processor(
                factory: &ValueProcessorFactory,
                format: &FormatData,
            ) -> ValueProcessor<Self> {
                factory.sequence_processor::<Self>(format)
            }
        }
    };
}

sequence!([T: Inspect] Vec<T>, T, indexable = true);
sequence!([T: Inspect] VecDeque<T>, T, indexable = true);
sequence!([T: Inspect, const N: usize] [T; N], T, indexable = true);
sequence!([T: Inspect] Box<[T]>, T, indexable = true);
sequence!([T: Inspect, S: 'static] HashSet<T, S>, T, indexable = false);
sequence!([T: Inspect] BTreeSet<T>, T, indexable = false);

macro_rules! keyed {
    ([$($generics:tt)*] $map:ty) => {
        impl<$($generics)*> Keyed for $map {
            type Key = K;
            type Value = V;

            fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
                self.iter()
            }
        }

        impl<$($generics)*> Inspect for $map {
            const COLLECTION: bool = true;

            fn inspect(&self, spec: &RenderSpec, out: &mut String) {
                inline_map(self.iter(), spec, out)
            }

            fn processor(
                factory: &ValueProcessorFactory,
                format: &FormatData,
            ) -> ValueProcessor<Self> {
                factory.keyed_processor::<Self>(format)
            }
        }
    };
}

keyed!([K: Inspect, V: Inspect, S: 'static] HashMap<K, V, S>);
keyed!([K: Inspect, V: Inspect] BTreeMap<K, V>);
