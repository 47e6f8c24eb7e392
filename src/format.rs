use crate::{Config, MonitorAttribute, TypeInfo};

/// Screen corner a unit is displayed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UiPosition {
    #[default]
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
}

impl std::fmt::Display for UiPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UiPosition::UpperLeft => write!(f, "upper-left"),
            UiPosition::UpperRight => write!(f, "upper-right"),
            UiPosition::LowerLeft => write!(f, "lower-left"),
            UiPosition::LowerRight => write!(f, "lower-right"),
        }
    }
}

/// Immutable display configuration of a monitored member.
///
/// Built once per profile from the member's [`MonitorAttribute`] and the
/// [`Config`] defaults. Derived formats (e.g. for out parameters) are copies
/// produced with the `with_*` methods; the source format is never modified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormatData {
    format: Option<String>,
    show_indexer: bool,
    label: String,
    font_size: i32,
    position: UiPosition,
    allow_grouping: bool,
    group: Option<String>,
    element_indent: usize,
}

impl FormatData {
    /// A format with the given label and library defaults for everything else.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            format: None,
            show_indexer: true,
            label: label.into(),
            font_size: 14,
            position: UiPosition::UpperLeft,
            allow_grouping: true,
            group: None,
            element_indent: 2,
        }
    }

    /// Resolve the format of a member from its attribute, falling back to
    /// the configured defaults, the humanized member name and the declaring
    /// type's name.
    pub fn resolve(
        member_name: &str,
        declaring: &TypeInfo,
        attribute: &MonitorAttribute,
        config: &Config,
    ) -> Self {
        Self {
            format: attribute.format.clone(),
            show_indexer: attribute.show_indexer.unwrap_or(true),
            label: attribute
                .label
                .clone()
                .unwrap_or_else(|| humanize(member_name)),
            font_size: attribute.font_size.unwrap_or(config.default_font_size),
            position: attribute.position.unwrap_or(config.default_position),
            allow_grouping: attribute.allow_grouping.unwrap_or(true),
            group: attribute
                .group
                .clone()
                .or_else(|| Some(declaring.name().to_string())),
            element_indent: attribute
                .element_indent
                .unwrap_or(config.default_element_indent),
        }
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn show_indexer(&self) -> bool {
        self.show_indexer
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn font_size(&self) -> i32 {
        self.font_size
    }

    pub fn position(&self) -> UiPosition {
        self.position
    }

    pub fn allow_grouping(&self) -> bool {
        self.allow_grouping
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn element_indent(&self) -> usize {
        self.element_indent
    }

    pub fn with_format(&self, format: Option<&str>) -> Self {
        Self {
            format: format.map(str::to_owned),
            ..self.clone()
        }
    }

    pub fn with_label(&self, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..self.clone()
        }
    }

    pub fn with_show_indexer(&self, show: bool) -> Self {
        Self {
            show_indexer: show,
            ..self.clone()
        }
    }

    pub fn with_element_indent(&self, indent: usize) -> Self {
        Self {
            element_indent: indent,
            ..self.clone()
        }
    }

    pub fn with_position(&self, position: UiPosition) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }

    pub fn with_group(&self, group: Option<&str>) -> Self {
        Self {
            group: group.map(str::to_owned),
            ..self.clone()
        }
    }
}

impl Default for FormatData {
    fn default() -> Self {
        Self::new("")
    }
}

/// Turn a member identifier into a display label.
///
/// Leading underscores and an `m_` prefix are dropped, snake_case and
/// camelCase words are split and capitalized: `_player_health` becomes
/// `Player Health`, `doWork` becomes `Do Work`.
pub fn humanize(name: &str) -> String {
    let trimmed = name.trim_start_matches('_');
    let trimmed = trimmed.strip_prefix("m_").unwrap_or(trimmed);

    let mut out = String::with_capacity(trimmed.len() + 4);
    let mut capitalize = true;
    let mut prev_lower = false;
    for c in trimmed.chars() {
        if c == '_' || c == ' ' {
            capitalize = true;
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower {
            capitalize = true;
        }
        if capitalize {
            if !out.is_empty() {
                out.push(' ');
            }
            out.extend(c.to_uppercase());
            capitalize = false;
        } else {
            out.push(c);
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humanize_splits_words() {
        assert_eq!(humanize("_player_health"), "Player Health");
        assert_eq!(humanize("doWork"), "Do Work");
        assert_eq!(humanize("m_speed"), "Speed");
        assert_eq!(humanize("HP"), "HP");
        assert_eq!(humanize("frame2Count"), "Frame2 Count");
    }

    #[test]
    fn resolve_applies_defaults_and_overrides() {
        let declaring = TypeInfo::value("Player", "game::Player");
        let config = Config::default().with_default_element_indent(3);

        let plain = FormatData::resolve("max_speed", &declaring, &MonitorAttribute::default(), &config);
        assert_eq!(plain.label(), "Max Speed");
        assert_eq!(plain.group(), Some("Player"));
        assert_eq!(plain.element_indent(), 3);
        assert_eq!(plain.format(), None);

        let attribute = MonitorAttribute {
            label: Some("Top Speed".into()),
            format: Some("F1".into()),
            group: Some("Movement".into()),
            ..Default::default()
        };
        let custom = FormatData::resolve("max_speed", &declaring, &attribute, &config);
        assert_eq!(custom.label(), "Top Speed");
        assert_eq!(custom.format(), Some("F1"));
        assert_eq!(custom.group(), Some("Movement"));
    }

    #[test]
    fn derived_copies_leave_original_untouched() {
        let base = FormatData::new("Score").with_element_indent(2);
        let derived = base.with_label("out code").with_element_indent(4);
        assert_eq!(base.label(), "Score");
        assert_eq!(base.element_indent(), 2);
        assert_eq!(derived.label(), "out code");
        assert_eq!(derived.element_indent(), 4);
    }
}
