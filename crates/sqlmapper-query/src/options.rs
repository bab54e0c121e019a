//! Raw SQL arguments and options.
//!
//! `find_by_sql` accepts a handful of argument and option shapes. They are
//! normalized here into a single [`Query`] of kind [`QueryKind::Raw`] before
//! any store is touched.

use crate::query::{Query, QueryKind};
use sqlmapper_core::{EntityType, Error, Property, PropertySet, Result, Value};
use std::sync::Arc;

/// The query argument given to `find_by_sql`.
#[derive(Debug, Clone)]
pub enum SqlArgument {
    /// SQL text without binds
    Text(String),
    /// SQL text followed by bind values, as one sequence
    Sequence(Vec<Value>),
    /// A query built earlier, e.g. taken from a previous result
    Query(Query),
    /// A bare symbol; never a valid query
    Symbol(String),
}

impl From<&str> for SqlArgument {
    fn from(sql: &str) -> Self {
        SqlArgument::Text(sql.to_string())
    }
}

impl From<String> for SqlArgument {
    fn from(sql: String) -> Self {
        SqlArgument::Text(sql)
    }
}

impl From<Vec<Value>> for SqlArgument {
    fn from(parts: Vec<Value>) -> Self {
        SqlArgument::Sequence(parts)
    }
}

impl From<Query> for SqlArgument {
    fn from(query: Query) -> Self {
        SqlArgument::Query(query)
    }
}

impl From<&Query> for SqlArgument {
    fn from(query: &Query) -> Self {
        SqlArgument::Query(query.clone())
    }
}

impl<S: Into<String>> From<(S, Vec<Value>)> for SqlArgument {
    fn from((sql, binds): (S, Vec<Value>)) -> Self {
        let mut parts = Vec::with_capacity(binds.len() + 1);
        parts.push(Value::Text(sql.into()));
        parts.extend(binds);
        SqlArgument::Sequence(parts)
    }
}

/// The accepted shapes of the `properties` option.
#[derive(Debug, Clone)]
pub enum PropertySelection {
    /// One property by name
    Name(String),
    /// One property descriptor
    Property(Property),
    /// Several properties by name
    Names(Vec<String>),
    /// Several property descriptors
    Properties(Vec<Property>),
    /// A whole property set
    Set(PropertySet),
}

impl PropertySelection {
    /// Resolve to property positions in `entity`, keeping request order.
    pub fn resolve(&self, entity: &EntityType) -> Result<Vec<usize>> {
        let lookup_name = |name: &str| {
            entity.properties().index_of(name).ok_or_else(|| {
                Error::argument(format!(
                    "unknown property '{}' for entity {}",
                    name,
                    entity.name()
                ))
            })
        };
        let lookup_property = |property: &Property| -> Result<usize> {
            let index = lookup_name(property.name())?;
            if entity.properties().at(index) == Some(property) {
                Ok(index)
            } else {
                Err(Error::argument(format!(
                    "property '{}' does not belong to entity {}",
                    property.name(),
                    entity.name()
                )))
            }
        };

        match self {
            PropertySelection::Name(name) => Ok(vec![lookup_name(name.as_str())?]),
            PropertySelection::Property(property) => Ok(vec![lookup_property(property)?]),
            PropertySelection::Names(names) => {
                names.iter().map(|n| lookup_name(n.as_str())).collect()
            }
            PropertySelection::Properties(properties) => {
                properties.iter().map(lookup_property).collect()
            }
            PropertySelection::Set(set) => set.iter().map(lookup_property).collect(),
        }
    }
}

impl From<&str> for PropertySelection {
    fn from(name: &str) -> Self {
        PropertySelection::Name(name.to_string())
    }
}

impl From<String> for PropertySelection {
    fn from(name: String) -> Self {
        PropertySelection::Name(name)
    }
}

impl From<Property> for PropertySelection {
    fn from(property: Property) -> Self {
        PropertySelection::Property(property)
    }
}

impl From<&Property> for PropertySelection {
    fn from(property: &Property) -> Self {
        PropertySelection::Property(property.clone())
    }
}

impl From<Vec<&str>> for PropertySelection {
    fn from(names: Vec<&str>) -> Self {
        PropertySelection::Names(names.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for PropertySelection {
    fn from(names: Vec<String>) -> Self {
        PropertySelection::Names(names)
    }
}

impl From<Vec<Property>> for PropertySelection {
    fn from(properties: Vec<Property>) -> Self {
        PropertySelection::Properties(properties)
    }
}

impl From<PropertySet> for PropertySelection {
    fn from(set: PropertySet) -> Self {
        PropertySelection::Set(set)
    }
}

impl From<&PropertySet> for PropertySelection {
    fn from(set: &PropertySet) -> Self {
        PropertySelection::Set(set.clone())
    }
}

/// Options accepted by `find_by_sql`. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct SqlOptions {
    pub repository: Option<String>,
    pub reload: Option<bool>,
    pub properties: Option<PropertySelection>,
}

impl SqlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repository(mut self, name: impl Into<String>) -> Self {
        self.repository = Some(name.into());
        self
    }

    pub fn reload(mut self, reload: bool) -> Self {
        self.reload = Some(reload);
        self
    }

    pub fn properties(mut self, properties: impl Into<PropertySelection>) -> Self {
        self.properties = Some(properties.into());
        self
    }
}

impl Query {
    /// Normalize a `find_by_sql` argument and options into a raw query.
    ///
    /// Options override whatever a passed-in query already carries; options
    /// left unset keep the query's values (or the defaults).
    pub fn from_sql(
        entity: Arc<EntityType>,
        argument: Option<SqlArgument>,
        options: SqlOptions,
    ) -> Result<Self> {
        let Some(argument) = argument else {
            return Err(Error::argument(format!(
                "{}.find_by_sql requires a query",
                entity.name()
            )));
        };

        let base = match argument {
            SqlArgument::Text(sql) => Query::new(entity, QueryKind::Raw { sql, binds: Vec::new() }),
            SqlArgument::Sequence(parts) => {
                let mut parts = parts.into_iter();
                match parts.next() {
                    Some(Value::Text(sql)) => {
                        let binds = parts.collect();
                        Query::new(entity, QueryKind::Raw { sql, binds })
                    }
                    Some(other) => {
                        return Err(Error::argument(format!(
                            "{}.find_by_sql expects the first element to be SQL text, got {}",
                            entity.name(),
                            other.type_name()
                        )));
                    }
                    None => {
                        return Err(Error::argument(format!(
                            "{}.find_by_sql requires a query",
                            entity.name()
                        )));
                    }
                }
            }
            SqlArgument::Query(query) => {
                if !query.is_raw() {
                    return Err(Error::argument(format!(
                        "{}.find_by_sql accepts only raw SQL queries, got {}",
                        entity.name(),
                        query
                    )));
                }
                if query.entity().name() != entity.name() {
                    return Err(Error::argument(format!(
                        "query for {} passed to {}.find_by_sql",
                        query.entity().name(),
                        entity.name()
                    )));
                }
                query
            }
            SqlArgument::Symbol(symbol) => {
                return Err(Error::argument(format!(
                    "{}.find_by_sql does not accept :{} as a query",
                    entity.name(),
                    symbol
                )));
            }
        };

        let mut query = base;
        if let Some(repository) = options.repository {
            if repository.trim().is_empty() {
                return Err(Error::argument("repository name must not be empty"));
            }
            query = query.with_repository(repository);
        }
        if let Some(reload) = options.reload {
            query = query.with_reload(reload);
        }
        if let Some(selection) = options.properties {
            let fields = selection.resolve(query.entity())?;
            query = query.with_fields(fields);
        }
        Ok(query)
    }
}
