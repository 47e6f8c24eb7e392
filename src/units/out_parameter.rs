use std::any::Any;

use crate::{BoxedProcessor, FormatData, Inspect, Reflect, ValueProcessorFactory};

/// Formatter of one `out` parameter of a monitored method.
///
/// Built once per method profile from the parameter's declared type. The
/// rendered line is `"<indent>out <name>: <value>"` where the indent is
/// twice the element indent of the method, and at least four spaces.
#[derive(Clone)]
pub struct OutParameterHandle {
    position: usize,
    name: String,
    indent: String,
    render: BoxedProcessor,
}

impl OutParameterHandle {
    pub(crate) fn for_type<P: Inspect + Reflect>(
        position: usize,
        name: &str,
        format: &FormatData,
        factory: &ValueProcessorFactory,
    ) -> Self {
        let indent = (format.element_indent() * 2).max(4);
        let derived = format
            .with_label(format!("out {name}"))
            .with_element_indent(indent);
        Self {
            position,
            name: name.to_owned(),
            indent: " ".repeat(indent),
            render: factory.create_boxed_processor::<P>(&derived),
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_value_as_string(&self, raw: &dyn Any) -> String {
        let mut out = String::new();
        self.append_to(raw, &mut out);
        out
    }

    pub(crate) fn append_to(&self, raw: &dyn Any, out: &mut String) {
        out.push_str(&self.indent);
        out.push_str(&(self.render)(raw));
    }
}

impl std::fmt::Debug for OutParameterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutParameterHandle")
            .field("position", &self.position)
            .field("name", &self.name)
            .field("indent", &self.indent.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_marked_and_indented_line() {
        let factory = ValueProcessorFactory::new();
        let format = FormatData::new("Do Work");
        let handle = OutParameterHandle::for_type::<i32>(0, "code", &format, &factory);
        assert_eq!(handle.get_value_as_string(&42_i32), "    out code: 42");
    }

    #[test]
    fn indent_doubles_the_element_indent() {
        let factory = ValueProcessorFactory::new();
        let format = FormatData::new("Scan").with_element_indent(3);
        let handle = OutParameterHandle::for_type::<bool>(1, "found", &format, &factory);
        assert_eq!(handle.get_value_as_string(&true), "      out found: true");
        assert_eq!(handle.get_value_as_string(&1_u8), "      out found: <bool?>");
    }
}
