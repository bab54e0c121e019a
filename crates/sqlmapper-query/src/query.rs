//! Query descriptors.
//!
//! A [`Query`] is the normalized form of every fetch request: symbolic
//! shortcuts, key lookups, attribute matches and raw SQL all end up here
//! before anything touches a store.

use sqlmapper_core::{EntityType, Error, Result, Value};
use std::fmt;
use std::sync::Arc;

/// Name of the repository used when none is given.
pub const DEFAULT_REPOSITORY: &str = "default";

/// Which part of a matching result set to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Every match, ordered by key
    All,
    /// The match with the lowest key
    First,
    /// The match with the highest key
    Last,
}

impl Selection {
    /// Does this selection return at most one resource?
    pub const fn is_single(self) -> bool {
        matches!(self, Selection::First | Selection::Last)
    }
}

/// What `find` was asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    All,
    First,
    Last,
    /// Key value lookup
    Key(Value),
}

impl From<Selection> for Selector {
    fn from(selection: Selection) -> Self {
        match selection {
            Selection::All => Selector::All,
            Selection::First => Selector::First,
            Selection::Last => Selector::Last,
        }
    }
}

impl From<i64> for Selector {
    fn from(key: i64) -> Self {
        Selector::Key(Value::BigInt(key))
    }
}

impl From<i32> for Selector {
    fn from(key: i32) -> Self {
        Selector::Key(Value::BigInt(i64::from(key)))
    }
}

impl From<Value> for Selector {
    fn from(key: Value) -> Self {
        Selector::Key(key)
    }
}

/// Equality on one property, by logical name.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub property: String,
    pub value: Value,
}

impl Condition {
    pub fn new(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// The shape of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    /// `:all`, `:first` or `:last` over the whole entity
    Symbolic(Selection),
    /// Lookup by key value
    PrimaryKey(Value),
    /// Equality on one or more properties
    AttributeMatch {
        conditions: Vec<Condition>,
        selection: Selection,
    },
    /// Literal SQL with positional `?` placeholders
    Raw { sql: String, binds: Vec<Value> },
}

/// A normalized fetch request against one entity type.
#[derive(Debug, Clone)]
pub struct Query {
    entity: Arc<EntityType>,
    kind: QueryKind,
    repository: String,
    reload: bool,
    fields: Vec<usize>,
}

impl Query {
    /// Create a query over all properties in the default repository.
    pub fn new(entity: Arc<EntityType>, kind: QueryKind) -> Self {
        let fields = (0..entity.properties().len()).collect();
        Self {
            entity,
            kind,
            repository: DEFAULT_REPOSITORY.to_string(),
            reload: false,
            fields,
        }
    }

    /// Resolve a `find` selector.
    ///
    /// A missing selector is an argument error.
    pub fn from_selector(entity: Arc<EntityType>, selector: Option<Selector>) -> Result<Self> {
        let selector = selector.ok_or_else(|| {
            Error::argument(format!(
                "{}.find requires a selector (:all, :first, :last or a key)",
                entity.name()
            ))
        })?;
        let kind = match selector {
            Selector::All => QueryKind::Symbolic(Selection::All),
            Selector::First => QueryKind::Symbolic(Selection::First),
            Selector::Last => QueryKind::Symbolic(Selection::Last),
            Selector::Key(Value::Null) => {
                return Err(Error::argument(format!(
                    "{}.find requires a non-null key",
                    entity.name()
                )));
            }
            Selector::Key(key) => QueryKind::PrimaryKey(key),
        };
        Ok(Self::new(entity, kind))
    }

    /// Build an attribute match, checking every condition names a property.
    pub fn attribute_match(
        entity: Arc<EntityType>,
        conditions: Vec<Condition>,
        selection: Selection,
    ) -> Result<Self> {
        for condition in &conditions {
            if !entity.properties().contains(&condition.property) {
                return Err(Error::argument(format!(
                    "unknown property '{}' for entity {}",
                    condition.property,
                    entity.name()
                )));
            }
        }
        Ok(Self::new(
            entity,
            QueryKind::AttributeMatch {
                conditions,
                selection,
            },
        ))
    }

    /// Target a named repository.
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = repository.into();
        self
    }

    /// Overwrite resources already in the identity map.
    pub fn with_reload(mut self, reload: bool) -> Self {
        self.reload = reload;
        self
    }

    /// Restrict loading to the given property positions.
    ///
    /// Positions outside the entity are dropped; order is kept and repeats removed.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = usize>) -> Self {
        let len = self.entity.properties().len();
        let mut selected = Vec::new();
        for index in fields {
            if index < len && !selected.contains(&index) {
                selected.push(index);
            }
        }
        self.fields = selected;
        self
    }

    pub fn entity(&self) -> &Arc<EntityType> {
        &self.entity
    }

    pub fn kind(&self) -> &QueryKind {
        &self.kind
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn is_reload(&self) -> bool {
        self.reload
    }

    /// True when this query targets the default repository.
    pub fn is_default_repository(&self) -> bool {
        self.repository == DEFAULT_REPOSITORY
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.kind, QueryKind::Raw { .. })
    }

    /// Requested property positions, in request order.
    pub fn fields(&self) -> &[usize] {
        &self.fields
    }

    /// Requested property names, in request order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter_map(|i| self.entity.properties().at(*i))
            .map(|p| p.name())
            .collect()
    }

    /// Does this query return at most one resource?
    pub fn is_single(&self) -> bool {
        match &self.kind {
            QueryKind::Symbolic(selection) => selection.is_single(),
            QueryKind::AttributeMatch { selection, .. } => selection.is_single(),
            QueryKind::PrimaryKey(_) => true,
            QueryKind::Raw { .. } => false,
        }
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.entity.name() == other.entity.name()
            && self.kind == other.kind
            && self.repository == other.repository
            && self.reload == other.reload
            && self.fields == other.fields
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            QueryKind::Symbolic(Selection::All) => "all".to_string(),
            QueryKind::Symbolic(Selection::First) => "first".to_string(),
            QueryKind::Symbolic(Selection::Last) => "last".to_string(),
            QueryKind::PrimaryKey(key) => format!("key={key:?}"),
            QueryKind::AttributeMatch { conditions, .. } => conditions
                .iter()
                .map(|c| c.property.as_str())
                .collect::<Vec<_>>()
                .join(","),
            QueryKind::Raw { sql, .. } => sql.trim().to_string(),
        };
        write!(
            f,
            "{}[{}] in {} (reload={})",
            self.entity.name(),
            kind,
            self.repository,
            self.reload
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlmapper_core::Property;

    fn smoothie() -> Arc<EntityType> {
        EntityType::builder("GreenSmoothie")
            .serial("id")
            .property(Property::string("name"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_missing_selector_is_argument_error() {
        let err = Query::from_selector(smoothie(), None).unwrap_err();
        assert!(err.is_argument_error());
    }

    #[test]
    fn test_selector_kinds() {
        let all = Query::from_selector(smoothie(), Some(Selector::All)).unwrap();
        assert_eq!(all.kind(), &QueryKind::Symbolic(Selection::All));
        assert!(!all.is_single());

        let last = Query::from_selector(smoothie(), Some(Selector::Last)).unwrap();
        assert!(last.is_single());

        let key = Query::from_selector(smoothie(), Some(Selector::from(3))).unwrap();
        assert_eq!(key.kind(), &QueryKind::PrimaryKey(Value::BigInt(3)));

        let err = Query::from_selector(smoothie(), Some(Selector::Key(Value::Null))).unwrap_err();
        assert!(err.is_argument_error());
    }

    #[test]
    fn test_defaults() {
        let query = Query::from_selector(smoothie(), Some(Selector::All)).unwrap();
        assert_eq!(query.repository(), DEFAULT_REPOSITORY);
        assert!(!query.is_reload());
        assert_eq!(query.field_names(), vec!["id", "name"]);
    }

    #[test]
    fn test_with_fields_dedups_and_bounds() {
        let query = Query::new(smoothie(), QueryKind::Symbolic(Selection::All))
            .with_fields([1, 1, 7, 0]);
        assert_eq!(query.fields(), &[1, 0]);
        assert_eq!(query.field_names(), vec!["name", "id"]);
    }

    #[test]
    fn test_attribute_match_checks_properties() {
        let ok = Query::attribute_match(
            smoothie(),
            vec![Condition::new("name", "Banana")],
            Selection::First,
        );
        assert!(ok.is_ok());

        let err = Query::attribute_match(
            smoothie(),
            vec![Condition::new("colour", "green")],
            Selection::All,
        )
        .unwrap_err();
        assert!(err.is_argument_error());
    }
}
