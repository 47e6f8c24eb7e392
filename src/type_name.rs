use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{TypeForm, TypeInfo};

/// Shared cache of rendered fully qualified type names.
///
/// The only structure shared between the runtime and AOT generation, so it
/// is `Sync`. A poisoned lock is recovered: the map only ever holds
/// complete entries.
#[derive(Debug, Default)]
pub struct TypeNameCache {
    names: Mutex<HashMap<TypeInfo, Arc<str>>>,
}

impl TypeNameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn full_name(&self, info: &TypeInfo) -> Arc<str> {
        let mut names = self.names.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(name) = names.get(info) {
            return name.clone();
        }
        let name: Arc<str> = Arc::from(info.full_name());
        names.insert(info.clone(), name.clone());
        name
    }

    pub fn len(&self) -> usize {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Parsed shape of a rendered type name.
///
/// ```rust
/// use lookout::TypeSyntax;
///
/// let parsed = TypeSyntax::parse("std::vec::Vec<[u8; 4]>").unwrap();
/// assert_eq!(parsed.to_string(), "std::vec::Vec<[u8; 4]>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSyntax {
    Named { path: String, args: Vec<TypeSyntax> },
    Array { element: Box<TypeSyntax>, len: usize },
    Slice(Box<TypeSyntax>),
    Unit,
}

impl TypeSyntax {
    /// Parse a name as rendered by [`TypeInfo::full_name`] or
    /// [`TypeInfo::syntax_name`]. Returns `None` on malformed input.
    pub fn parse(source: &str) -> Option<Self> {
        let mut parser = Parser { rest: source };
        let parsed = parser.parse_type()?;
        parser.skip_ws();
        parser.rest.is_empty().then_some(parsed)
    }

    /// The fully qualified shape of `info`.
    pub fn of(info: &TypeInfo) -> Self {
        let element = || {
            Box::new(
                info.generics()
                    .first()
                    .map(TypeSyntax::of)
                    .unwrap_or(TypeSyntax::Unit),
            )
        };
        match info.form() {
            TypeForm::Unit => TypeSyntax::Unit,
            TypeForm::Array(len) => TypeSyntax::Array {
                element: element(),
                len,
            },
            TypeForm::Slice => TypeSyntax::Slice(element()),
            TypeForm::Named => TypeSyntax::Named {
                path: info.path().to_owned(),
                args: info.generics().iter().map(TypeSyntax::of).collect(),
            },
        }
    }

    /// Last path segment, e.g. `Vec` for `std::vec::Vec<T>`.
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeSyntax::Named { path, .. } => path.rsplit("::").next(),
            _ => None,
        }
    }
}

impl fmt::Display for TypeSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSyntax::Unit => f.write_str("()"),
            TypeSyntax::Array { element, len } => write!(f, "[{element}; {len}]"),
            TypeSyntax::Slice(element) => write!(f, "[{element}]"),
            TypeSyntax::Named { path, args } => {
                f.write_str(path)?;
                if args.is_empty() {
                    return Ok(());
                }
                f.write_str("<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
        }
    }
}

struct Parser<'a> {
    rest: &'a str,
}

impl Parser<'_> {
    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn parse_type(&mut self) -> Option<TypeSyntax> {
        if self.eat('(') {
            return self.eat(')').then_some(TypeSyntax::Unit);
        }
        if self.eat('[') {
            let element = Box::new(self.parse_type()?);
            if self.eat(']') {
                return Some(TypeSyntax::Slice(element));
            }
            if !self.eat(';') {
                return None;
            }
            self.skip_ws();
            let digits = self
                .rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(self.rest.len());
            let len = self.rest[..digits].parse().ok()?;
            self.rest = &self.rest[digits..];
            return self.eat(']').then_some(TypeSyntax::Array { element, len });
        }

        self.skip_ws();
        let end = self
            .rest
            .find(['<', '>', ',', ';', '[', ']', '(', ')'])
            .unwrap_or(self.rest.len());
        let path = self.rest[..end].trim_end();
        if path.is_empty() {
            return None;
        }
        self.rest = &self.rest[end..];

        let mut args = Vec::new();
        if self.eat('<') {
            loop {
                args.push(self.parse_type()?);
                if self.eat('>') {
                    break;
                }
                if !self.eat(',') {
                    return None;
                }
            }
        }
        Some(TypeSyntax::Named {
            path: path.to_owned(),
            args,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::Reflect;

    #[test]
    fn parses_nested_generics() {
        let parsed = TypeSyntax::parse("HashMap<String, Vec<[f32; 3]>>").unwrap();
        let TypeSyntax::Named { path, args } = &parsed else {
            panic!("expected a named type, got {parsed:?}");
        };
        assert_eq!(path, "HashMap");
        assert_eq!(args.len(), 2);
        assert_eq!(args[1].name(), Some("Vec"));
    }

    #[test]
    fn rejects_malformed_names() {
        assert_eq!(TypeSyntax::parse(""), None);
        assert_eq!(TypeSyntax::parse("Vec<i32"), None);
        assert_eq!(TypeSyntax::parse("[u8; x]"), None);
        assert_eq!(TypeSyntax::parse("Vec<i32>>"), None);
    }

    #[test]
    fn rendered_names_round_trip() {
        let info = <HashMap<String, Vec<Option<[u8; 2]>>>>::type_info();
        let parsed = TypeSyntax::parse(&info.full_name()).unwrap();
        assert_eq!(parsed, TypeSyntax::of(&info));
        assert_eq!(parsed.to_string(), info.full_name());

        let unit = TypeSyntax::parse("()").unwrap();
        assert_eq!(unit, TypeSyntax::of(&<()>::type_info()));
    }

    #[test]
    fn cache_returns_shared_names() {
        let cache = TypeNameCache::new();
        let info = <Vec<i64>>::type_info();
        let first = cache.full_name(&info);
        let second = cache.full_name(&info);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(&*first, "std::vec::Vec<i64>");
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
