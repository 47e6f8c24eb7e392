use std::path::PathBuf;

use crate::UiPosition;

/// Runtime configuration for discovery, formatting defaults and AOT generation.
///
/// Use the builder pattern to customize, or use [`Default`] for sensible defaults.
///
/// # Examples
///
/// ```rust
/// use lookout::{Config, UiPosition};
///
/// let config = Config::default()
///     .with_default_position(UiPosition::LowerRight)
///     .with_strict_type_generation(true);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Master switch. When `false`, profiling and instance registration are no-ops.
    /// Default: true
    pub enable_monitoring: bool,

    /// Whether an attached display controller starts visible.
    /// Default: true
    pub open_display_on_load: bool,

    /// Apply the generic-type accessibility predicate during discovery.
    /// Members whose value type is an inaccessible value type are skipped
    /// and logged, mirroring what AOT generation can express.
    /// Default: true
    pub restrict_generic_types: bool,

    /// Fail AOT generation when any type definition could not be produced.
    /// Default: false
    pub strict_type_generation: bool,

    /// Output file for the AOT type manifest. Must end in `.rs`, otherwise
    /// `lookout_aot.rs` is used.
    /// Default: `lookout_aot.rs`
    pub aot_output_path: PathBuf,

    /// Default: 14
    pub default_font_size: i32,

    /// Default: [`UiPosition::UpperLeft`]
    pub default_position: UiPosition,

    /// Indentation (in spaces) of collection elements.
    /// Default: 2
    pub default_element_indent: usize,

    /// Assemblies whose name starts with any of these prefixes are not scanned.
    /// Default: `std`, `core`, `alloc`
    pub excluded_assembly_prefixes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            enable_monitoring: true,
            open_display_on_load: true,
            restrict_generic_types: true,
            strict_type_generation: false,
            aot_output_path: PathBuf::from(DEFAULT_AOT_FILE),
            default_font_size: 14,
            default_position: UiPosition::UpperLeft,
            default_element_indent: 2,
            excluded_assembly_prefixes: vec!["std".into(), "core".into(), "alloc".into()],
        }
    }
}

pub(crate) const DEFAULT_AOT_FILE: &str = "lookout_aot.rs";

impl Config {
    pub fn with_monitoring_enabled(mut self, enabled: bool) -> Self {
        self.enable_monitoring = enabled;
        self
    }

    pub fn with_open_display_on_load(mut self, open: bool) -> Self {
        self.open_display_on_load = open;
        self
    }

    /// Toggle the accessibility predicate applied during discovery.
    ///
    /// With restrictions off, every member is profiled regardless of the
    /// visibility of its value type. AOT generation is unaffected.
    pub fn with_type_restrictions(mut self, restrict: bool) -> Self {
        self.restrict_generic_types = restrict;
        self
    }

    /// Make AOT generation fail when some definitions could not be produced.
    pub fn with_strict_type_generation(mut self, strict: bool) -> Self {
        self.strict_type_generation = strict;
        self
    }

    pub fn with_aot_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.aot_output_path = path.into();
        self
    }

    pub fn with_default_font_size(mut self, size: i32) -> Self {
        self.default_font_size = size;
        self
    }

    pub fn with_default_position(mut self, position: UiPosition) -> Self {
        self.default_position = position;
        self
    }

    pub fn with_default_element_indent(mut self, indent: usize) -> Self {
        self.default_element_indent = indent;
        self
    }

    /// Replace the list of excluded assembly name prefixes.
    pub fn with_excluded_assemblies<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_assembly_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn is_assembly_excluded(&self, name: &str) -> bool {
        self.excluded_assembly_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_excludes_standard_assemblies() {
        let config = Config::default();
        assert!(config.is_assembly_excluded("std"));
        assert!(config.is_assembly_excluded("core::fmt"));
        assert!(!config.is_assembly_excluded("game"));
    }

    #[test]
    fn builders_override_fields() {
        let config = Config::default()
            .with_monitoring_enabled(false)
            .with_default_element_indent(4)
            .with_excluded_assemblies(["tests"]);
        assert!(!config.enable_monitoring);
        assert_eq!(config.default_element_indent, 4);
        assert!(config.is_assembly_excluded("tests_support"));
        assert!(!config.is_assembly_excluded("std"));
    }
}
