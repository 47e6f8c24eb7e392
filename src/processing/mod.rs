//! Value processors: pure functions turning a typed value into its display
//! string.
//!
//! Processors are built once per profile by [`ValueProcessorFactory`] and
//! reused on every refresh. Everything derivable from the [`FormatData`]
//! (parsed number format, header line, indentation) is computed when the
//! processor is built.

mod inspect;
mod number;

use std::{
    any::{Any, TypeId},
    cell::RefCell,
    collections::{HashMap, VecDeque},
    fmt::Write,
    rc::Rc,
};

pub use inspect::{Inspect, Keyed, Sequence};
pub use number::{Number, NumberFormat};

use crate::{FormatData, Reflect, TypeInfo};

/// Labeled top-level processor of a `T` value.
pub type ValueProcessor<T> = Rc<dyn Fn(&T) -> String>;

/// Processor of a value stored behind `dyn Any`.
pub type BoxedProcessor = Rc<dyn Fn(&dyn Any) -> String>;

/// Inline writer of a collection element.
pub type ElementWriter<T> = Rc<dyn Fn(&T, &mut String)>;

/// Formatting parameters available while rendering a value.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSpec {
    number: Option<NumberFormat>,
    show_indexer: bool,
    element_indent: usize,
}

impl RenderSpec {
    pub fn number_format(&self) -> Option<NumberFormat> {
        self.number
    }

    pub fn show_indexer(&self) -> bool {
        self.show_indexer
    }

    pub fn element_indent(&self) -> usize {
        self.element_indent
    }

    /// Write a number with the configured format, or its plain decimal form.
    pub fn write_number(&self, value: Number, out: &mut String) {
        self.number
            .unwrap_or(NumberFormat::General)
            .write(value, out);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoKey {
    type_id: TypeId,
    format: Option<String>,
    show_indexer: bool,
    element_indent: usize,
}

impl MemoKey {
    fn of<T: 'static>(format: &FormatData) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            format: format.format().map(str::to_owned),
            show_indexer: format.show_indexer(),
            element_indent: format.element_indent(),
        }
    }
}

/// Precomputed lines of a collection listing.
struct ListLayout {
    header: String,
    empty: String,
    indent: String,
}

impl ListLayout {
    fn new(format: &FormatData) -> Self {
        Self {
            header: format!("{}:", format.label()),
            empty: format!("{}: []", format.label()),
            indent: " ".repeat(format.element_indent()),
        }
    }

    fn render<I>(
        &self,
        items: impl Iterator<Item = I>,
        indexed: bool,
        mut write: impl FnMut(I, &mut String),
    ) -> String {
        let mut items = items.peekable();
        if items.peek().is_none() {
            return self.empty.clone();
        }
        let mut out = String::with_capacity(self.header.len() + 64);
        out.push_str(&self.header);
        for (i, item) in items.enumerate() {
            out.push('\n');
            out.push_str(&self.indent);
            if indexed {
                let _ = write!(out, "[{i}]: ");
            }
            write(item, &mut out);
        }
        out
    }
}

/// Builds and memoizes value processors.
#[derive(Default)]
pub struct ValueProcessorFactory {
    elements: RefCell<HashMap<MemoKey, Rc<dyn Any>>>,
    preregistered: RefCell<Vec<TypeInfo>>,
}

impl ValueProcessorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_processor_for_type<T: Inspect>(&self, format: &FormatData) -> ValueProcessor<T> {
        T::processor(self, format)
    }

    /// Resolve the render parameters of a format. An unparseable number
    /// format is logged and replaced by general formatting.
    pub fn render_spec(&self, format: &FormatData) -> RenderSpec {
        let number = format.format().and_then(|pattern| {
            NumberFormat::parse(pattern)
                .inspect_err(|reason| {
                    tracing::warn!(
                        label = %format.label(),
                        format = %pattern,
                        %reason,
                        "unsupported number format, using general formatting"
                    );
                })
                .ok()
        });
        RenderSpec {
            number,
            show_indexer: format.show_indexer(),
            element_indent: format.element_indent(),
        }
    }

    /// `"<label>: <inline value>"`
    pub fn scalar_processor<T: Inspect>(&self, format: &FormatData) -> ValueProcessor<T> {
        let spec = self.render_spec(format);
        let prefix = format!("{}: ", format.label());
        Rc::new(move |value: &T| {
            let mut out = String::with_capacity(prefix.len() + 16);
            out.push_str(&prefix);
            value.inspect(&spec, &mut out);
            out
        })
    }

    /// A processor ignoring its value and rendering the label alone.
    pub fn label_processor<T: 'static>(&self, format: &FormatData) -> ValueProcessor<T> {
        let label = format.label().to_owned();
        Rc::new(move |_: &T| label.clone())
    }

    /// Inline element writer, memoized per element type and format.
    pub fn element_processor<T: Inspect>(&self, format: &FormatData) -> ElementWriter<T> {
        let key = MemoKey::of::<T>(format);
        if let Some(writer) = self
            .elements
            .borrow()
            .get(&key)
            .and_then(|cached| cached.downcast_ref::<ElementWriter<T>>())
        {
            return writer.clone();
        }

        let spec = self.render_spec(format);
        let writer: ElementWriter<T> = Rc::new(move |value: &T, out: &mut String| {
            value.inspect(&spec, out);
        });
        self.elements
            .borrow_mut()
            .insert(key, Rc::new(writer.clone()));
        writer
    }

    pub fn sequence_processor<C: Sequence>(&self, format: &FormatData) -> ValueProcessor<C> {
        let layout = ListLayout::new(format);
        let indexed = format.show_indexer();
        let element = self.element_processor::<C::Item>(format);
        Rc::new(move |collection: &C| {
            if C::INDEXABLE {
                layout.render(collection.items(), indexed, |item, out| element(item, out))
            } else {
                let items: Vec<&C::Item> = collection.items().collect();
                layout.render(items.into_iter(), indexed, |item, out| element(item, out))
            }
        })
    }

    pub fn keyed_processor<M: Keyed>(&self, format: &FormatData) -> ValueProcessor<M> {
        let layout = ListLayout::new(format);
        let key = self.element_processor::<M::Key>(format);
        let value = self.element_processor::<M::Value>(format);
        Rc::new(move |map: &M| {
            layout.render(map.entries(), false, |(k, v), out| {
                out.push('[');
                key(k, out);
                out.push_str("]: ");
                value(v, out);
            })
        })
    }

    /// Processor for a value behind `dyn Any`. A payload of another type
    /// renders as `<label>: <T?>`.
    pub fn create_boxed_processor<T: Inspect + Reflect>(&self, format: &FormatData) -> BoxedProcessor {
        let typed = self.create_processor_for_type::<T>(format);
        let mismatch = format!("{}: <{}?>", format.label(), T::type_info().syntax_name());
        Rc::new(move |raw: &dyn Any| match raw.downcast_ref::<T>() {
            Some(value) => typed(value),
            None => mismatch.clone(),
        })
    }

    pub fn preregister_value_type_array<T: Inspect + Reflect>(&self) {
        self.preregister::<Box<[T]>>();
    }

    pub fn preregister_reference_type_array<T: Inspect + Reflect>(&self) {
        self.preregister::<Vec<T>>();
    }

    pub fn preregister_dictionary<K: Inspect + Reflect, V: Inspect + Reflect>(&self) {
        self.preregister::<HashMap<K, V>>();
    }

    pub fn preregister_enumerable<T: Inspect + Reflect>(&self) {
        self.preregister::<VecDeque<T>>();
    }

    fn preregister<C: Inspect + Reflect>(&self) {
        let _ = self.create_processor_for_type::<C>(&FormatData::default());
        let info = C::type_info();
        let mut registered = self.preregistered.borrow_mut();
        if !registered.contains(&info) {
            tracing::debug!(type_name = %info.full_name(), "processor pre-registered");
            registered.push(info);
        }
    }

    /// Instantiations recorded by the `preregister_*` entry points.
    pub fn preregistered(&self) -> Vec<TypeInfo> {
        self.preregistered.borrow().clone()
    }

    pub fn memoized_count(&self) -> usize {
        self.elements.borrow().len()
    }

    pub fn clear(&self) {
        self.elements.borrow_mut().clear();
        self.preregistered.borrow_mut().clear();
    }
}

impl std::fmt::Debug for ValueProcessorFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueProcessorFactory")
            .field("memoized", &self.memoized_count())
            .field("preregistered", &self.preregistered.borrow().len())
            .finish()
    }
}
