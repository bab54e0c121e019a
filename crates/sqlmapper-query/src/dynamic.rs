//! Dynamic finder names.
//!
//! `find_by_<attr>` and `find_all_by_<attr>` (and `_and_`-joined
//! combinations) are resolved against an entity's properties at call time.
//! Names that are not finders, or that mention an unknown attribute, are
//! no-method errors.

use crate::query::{Condition, Query, Selection};
use regex::Regex;
use sqlmapper_core::{EntityType, Error, Result, Value};
use std::sync::{Arc, OnceLock};

/// A parsed dynamic finder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicFinder {
    method: String,
    attributes: Vec<String>,
    selection: Selection,
}

fn finder_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^find_(all_)?by_([A-Za-z0-9_]+)$"))
        .as_ref()
        .map_err(|e| Error::Custom(format!("invalid dynamic finder pattern: {e}")))
}

impl DynamicFinder {
    /// Parse `method` against the properties of `entity`.
    pub fn parse(entity: &EntityType, method: &str) -> Result<Self> {
        let no_method = || Error::no_method(entity.name(), method);

        let captures = finder_pattern()?.captures(method).ok_or_else(no_method)?;
        let selection = if captures.get(1).is_some() {
            Selection::All
        } else {
            Selection::First
        };
        let tail = captures.get(2).map_or("", |m| m.as_str());

        let mut names: Vec<&str> = entity.properties().names().collect();
        names.sort_by_key(|n| std::cmp::Reverse(n.len()));

        let attributes = split_attributes(tail, &names).ok_or_else(|| {
            tracing::debug!(entity = %entity.name(), method, "Unresolvable dynamic finder");
            no_method()
        })?;

        Ok(Self {
            method: method.to_string(),
            attributes,
            selection,
        })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Logical attribute names, in call order.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// `First` for `find_by_*`, `All` for `find_all_by_*`.
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Pair attribute names with call values into an attribute-match query.
    pub fn to_query(&self, entity: Arc<EntityType>, values: Vec<Value>) -> Result<Query> {
        if values.len() != self.attributes.len() {
            return Err(Error::argument(format!(
                "{}.{} expects {} value(s), {} given",
                entity.name(),
                self.method,
                self.attributes.len(),
                values.len()
            )));
        }
        let conditions = self
            .attributes
            .iter()
            .zip(values)
            .map(|(name, value)| Condition::new(name.clone(), value))
            .collect();
        Query::attribute_match(entity, conditions, self.selection)
    }
}

/// Split `tail` into property names joined by `_and_`, trying longer names
/// first and backtracking.
fn split_attributes(tail: &str, names: &[&str]) -> Option<Vec<String>> {
    for name in names {
        if tail == *name {
            return Some(vec![(*name).to_string()]);
        }
        if let Some(rest) = tail
            .strip_prefix(*name)
            .and_then(|rest| rest.strip_prefix("_and_"))
        {
            if let Some(mut more) = split_attributes(rest, names) {
                more.insert(0, (*name).to_string());
                return Some(more);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryKind;
    use sqlmapper_core::Property;

    fn milkshake() -> Arc<EntityType> {
        EntityType::builder("Milkshake")
            .serial("id")
            .property(Property::string("name").field("ml_name"))
            .property(Property::boolean("contains_lactose").field("bl_lactose"))
            .property(Property::string("salt_and_pepper"))
            .property(Property::string("salt"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_find_by_single_attribute() {
        let finder = DynamicFinder::parse(&milkshake(), "find_by_name").unwrap();
        assert_eq!(finder.attributes(), &["name".to_string()]);
        assert_eq!(finder.selection(), Selection::First);
    }

    #[test]
    fn test_find_all_by() {
        let finder = DynamicFinder::parse(&milkshake(), "find_all_by_contains_lactose").unwrap();
        assert_eq!(finder.attributes(), &["contains_lactose".to_string()]);
        assert_eq!(finder.selection(), Selection::All);
    }

    #[test]
    fn test_multiple_attributes() {
        let finder =
            DynamicFinder::parse(&milkshake(), "find_by_name_and_contains_lactose").unwrap();
        assert_eq!(
            finder.attributes(),
            &["name".to_string(), "contains_lactose".to_string()]
        );
    }

    #[test]
    fn test_attribute_containing_and() {
        let finder = DynamicFinder::parse(&milkshake(), "find_by_salt_and_pepper").unwrap();
        assert_eq!(finder.attributes(), &["salt_and_pepper".to_string()]);

        let finder = DynamicFinder::parse(&milkshake(), "find_by_salt_and_name").unwrap();
        assert_eq!(
            finder.attributes(),
            &["salt".to_string(), "name".to_string()]
        );
    }

    #[test]
    fn test_unknown_attribute_is_no_method() {
        let err = DynamicFinder::parse(&milkshake(), "find_by_flavour").unwrap_err();
        assert!(err.is_no_method());

        let err = DynamicFinder::parse(&milkshake(), "find_by_ml_name").unwrap_err();
        assert!(err.is_no_method());

        let err = DynamicFinder::parse(&milkshake(), "explode").unwrap_err();
        assert!(err.is_no_method());

        let err = DynamicFinder::parse(&milkshake(), "find_by_name_and_").unwrap_err();
        assert!(err.is_no_method());
    }

    #[test]
    fn test_to_query_checks_arity() {
        let entity = milkshake();
        let finder = DynamicFinder::parse(&entity, "find_by_name").unwrap();

        let query = finder
            .to_query(Arc::clone(&entity), vec![Value::from("strawberry")])
            .unwrap();
        match query.kind() {
            QueryKind::AttributeMatch {
                conditions,
                selection,
            } => {
                assert_eq!(conditions, &vec![Condition::new("name", "strawberry")]);
                assert_eq!(*selection, Selection::First);
            }
            other => panic!("unexpected kind {other:?}"),
        }

        let err = finder.to_query(entity, Vec::new()).unwrap_err();
        assert!(err.is_argument_error());
    }
}
