//! SQL statement generation for entity queries and resource persistence.

use crate::placeholder::bind_placeholders;
use crate::query::{Query, QueryKind, Selection};
use sqlmapper_core::{Dialect, EntityType, Error, Resource, Result, Value};

/// Builds the SELECT for a [`Query`].
#[derive(Debug)]
pub struct SelectBuilder<'q> {
    query: &'q Query,
}

impl<'q> SelectBuilder<'q> {
    pub fn new(query: &'q Query) -> Self {
        Self { query }
    }

    /// Property positions fetched: the key, then the requested fields.
    pub fn columns(&self) -> Vec<usize> {
        let key = self.query.entity().key_index();
        let mut columns = vec![key];
        columns.extend(self.query.fields().iter().copied().filter(|i| *i != key));
        columns
    }

    /// Build the SQL and parameters for `dialect`.
    pub fn build_with_dialect(&self, dialect: Dialect) -> Result<(String, Vec<Value>)> {
        let entity = self.query.entity();

        if let QueryKind::Raw { sql, binds } = self.query.kind() {
            let sql = bind_placeholders(sql, dialect, binds.len())?;
            return Ok((sql, binds.clone()));
        }

        let columns: Vec<String> = self
            .columns()
            .into_iter()
            .filter_map(|i| entity.properties().at(i))
            .map(|p| dialect.quote_identifier(p.field_name()))
            .collect();
        let key = dialect.quote_identifier(entity.key().field_name());

        let mut sql = format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            dialect.quote_identifier(entity.storage_name())
        );
        let mut params = Vec::new();

        let selection = match self.query.kind() {
            QueryKind::Symbolic(selection) => *selection,
            QueryKind::PrimaryKey(value) => {
                params.push(value.clone());
                sql.push_str(&format!(" WHERE {} = {}", key, dialect.placeholder(1)));
                Selection::First
            }
            QueryKind::AttributeMatch {
                conditions,
                selection,
            } => {
                let mut clauses = Vec::with_capacity(conditions.len());
                for condition in conditions {
                    let property = entity.property(&condition.property).ok_or_else(|| {
                        Error::argument(format!(
                            "unknown property '{}' for entity {}",
                            condition.property,
                            entity.name()
                        ))
                    })?;
                    let column = dialect.quote_identifier(property.field_name());
                    if condition.value.is_null() {
                        clauses.push(format!("{column} IS NULL"));
                    } else {
                        params.push(condition.value.clone());
                        clauses.push(format!("{column} = {}", dialect.placeholder(params.len())));
                    }
                }
                if !clauses.is_empty() {
                    sql.push_str(" WHERE ");
                    sql.push_str(&clauses.join(" AND "));
                }
                *selection
            }
            QueryKind::Raw { .. } => Selection::All,
        };

        match selection {
            Selection::All => sql.push_str(&format!(" ORDER BY {key} ASC")),
            Selection::First => sql.push_str(&format!(" ORDER BY {key} ASC LIMIT 1")),
            Selection::Last => sql.push_str(&format!(" ORDER BY {key} DESC LIMIT 1")),
        }

        tracing::trace!(sql = %sql, params = params.len(), "Built SELECT");
        Ok((sql, params))
    }
}

/// Builds the INSERT for a new resource.
#[derive(Debug)]
pub struct InsertBuilder<'r> {
    resource: &'r Resource,
}

impl<'r> InsertBuilder<'r> {
    pub fn new(resource: &'r Resource) -> Self {
        Self { resource }
    }

    /// Build the INSERT SQL and parameters with specific dialect.
    ///
    /// Serial keys are left to the store unless explicitly set.
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let entity = self.resource.entity();

        let insert_fields: Vec<_> = entity
            .properties()
            .iter()
            .enumerate()
            .filter_map(|(i, p)| {
                let value = self.resource.value_at(i)?;
                if p.is_serial() && value.is_null() {
                    return None;
                }
                Some((p, value))
            })
            .collect();

        let table = dialect.quote_identifier(entity.storage_name());
        let mut sql = if insert_fields.is_empty() {
            match dialect {
                Dialect::Mysql => format!("INSERT INTO {table} () VALUES ()"),
                Dialect::Postgres | Dialect::Sqlite => format!("INSERT INTO {table} DEFAULT VALUES"),
            }
        } else {
            let columns: Vec<_> = insert_fields
                .iter()
                .map(|(p, _)| dialect.quote_identifier(p.field_name()))
                .collect();
            let placeholders: Vec<_> = (1..=insert_fields.len())
                .map(|i| dialect.placeholder(i))
                .collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        if dialect.supports_returning() {
            sql.push_str(" RETURNING ");
            sql.push_str(&dialect.quote_identifier(entity.key().field_name()));
        }

        let values = insert_fields.into_iter().map(|(_, v)| v.clone()).collect();
        (sql, values)
    }
}

/// Builds the UPDATE of a persisted resource's dirty properties.
#[derive(Debug)]
pub struct UpdateBuilder<'r> {
    resource: &'r Resource,
}

impl<'r> UpdateBuilder<'r> {
    pub fn new(resource: &'r Resource) -> Self {
        Self { resource }
    }

    /// Build the UPDATE SQL and parameters, or `None` when nothing changed.
    pub fn build_with_dialect(&self, dialect: Dialect) -> Result<Option<(String, Vec<Value>)>> {
        let entity = self.resource.entity();
        let key_index = entity.key_index();
        let key = require_key(self.resource)?;

        let mut params = Vec::new();
        let mut set_clauses = Vec::new();
        for (index, value) in self.resource.dirty_values() {
            if index == key_index {
                continue;
            }
            let Some(property) = entity.properties().at(index) else {
                continue;
            };
            params.push(value.clone());
            set_clauses.push(format!(
                "{} = {}",
                dialect.quote_identifier(property.field_name()),
                dialect.placeholder(params.len())
            ));
        }

        if set_clauses.is_empty() {
            return Ok(None);
        }

        params.push(key.clone());
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {}",
            dialect.quote_identifier(entity.storage_name()),
            set_clauses.join(", "),
            dialect.quote_identifier(entity.key().field_name()),
            dialect.placeholder(params.len())
        );
        Ok(Some((sql, params)))
    }
}

/// Builds DELETE statements.
#[derive(Debug)]
pub enum DeleteBuilder<'a> {
    /// One resource by key
    Resource(&'a Resource),
    /// Every row of an entity
    All(&'a EntityType),
}

impl DeleteBuilder<'_> {
    /// Build the DELETE SQL and parameters with specific dialect.
    pub fn build_with_dialect(&self, dialect: Dialect) -> Result<(String, Vec<Value>)> {
        match self {
            DeleteBuilder::Resource(resource) => {
                let entity = resource.entity();
                let key = require_key(resource)?;
                Ok((
                    format!(
                        "DELETE FROM {} WHERE {} = {}",
                        dialect.quote_identifier(entity.storage_name()),
                        dialect.quote_identifier(entity.key().field_name()),
                        dialect.placeholder(1)
                    ),
                    vec![key.clone()],
                ))
            }
            DeleteBuilder::All(entity) => Ok((
                format!(
                    "DELETE FROM {}",
                    dialect.quote_identifier(entity.storage_name())
                ),
                Vec::new(),
            )),
        }
    }
}

fn require_key(resource: &Resource) -> Result<&Value> {
    resource.key().ok_or_else(|| {
        Error::argument(format!(
            "{} resource has no key value",
            resource.entity().name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Condition, Selector};
    use sqlmapper_core::Property;
    use std::sync::Arc;

    fn milkshake() -> Arc<EntityType> {
        EntityType::builder("Milkshake")
            .serial("id")
            .property(Property::string("name").field("ml_name"))
            .property(Property::boolean("contains_lactose").field("bl_lactose"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_select_symbolic() {
        let all = Query::from_selector(milkshake(), Some(Selector::All)).unwrap();
        let (sql, params) = SelectBuilder::new(&all)
            .build_with_dialect(Dialect::Sqlite)
            .unwrap();
        assert_eq!(
            sql,
            "SELECT \"id\", \"ml_name\", \"bl_lactose\" FROM \"milkshakes\" ORDER BY \"id\" ASC"
        );
        assert!(params.is_empty());

        let last = Query::from_selector(milkshake(), Some(Selector::Last)).unwrap();
        let (sql, _) = SelectBuilder::new(&last)
            .build_with_dialect(Dialect::Postgres)
            .unwrap();
        assert!(sql.ends_with("ORDER BY \"id\" DESC LIMIT 1"));
    }

    #[test]
    fn test_select_key_lookup() {
        let query = Query::from_selector(milkshake(), Some(Selector::from(7))).unwrap();
        let (sql, params) = SelectBuilder::new(&query)
            .build_with_dialect(Dialect::Postgres)
            .unwrap();
        assert!(sql.contains("WHERE \"id\" = $1"));
        assert!(sql.ends_with("LIMIT 1"));
        assert_eq!(params, vec![Value::BigInt(7)]);
    }

    #[test]
    fn test_select_attribute_match_uses_fields() {
        let query = Query::attribute_match(
            milkshake(),
            vec![
                Condition::new("name", "strawberry"),
                Condition::new("contains_lactose", Value::Null),
            ],
            Selection::All,
        )
        .unwrap();
        let (sql, params) = SelectBuilder::new(&query)
            .build_with_dialect(Dialect::Sqlite)
            .unwrap();
        assert!(sql.contains("WHERE \"ml_name\" = ?1 AND \"bl_lactose\" IS NULL"));
        assert_eq!(params, vec![Value::from("strawberry")]);
    }

    #[test]
    fn test_select_restricted_fields_keeps_key() {
        let query = Query::from_selector(milkshake(), Some(Selector::All))
            .unwrap()
            .with_fields([1]);
        let builder = SelectBuilder::new(&query);
        assert_eq!(builder.columns(), vec![0, 1]);
        let (sql, _) = builder.build_with_dialect(Dialect::Mysql).unwrap();
        assert!(sql.starts_with("SELECT `id`, `ml_name` FROM `milkshakes`"));
    }

    #[test]
    fn test_select_raw_rewrites_binds() {
        let query = Query::new(
            milkshake(),
            QueryKind::Raw {
                sql: "SELECT * FROM milkshakes WHERE id = ?".into(),
                binds: vec![Value::BigInt(1)],
            },
        );
        let (sql, params) = SelectBuilder::new(&query)
            .build_with_dialect(Dialect::Postgres)
            .unwrap();
        assert_eq!(sql, "SELECT * FROM milkshakes WHERE id = $1");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_insert_skips_unset_serial() {
        let shake = Resource::with_attributes(
            milkshake(),
            [
                ("name", Value::from("strawberry")),
                ("contains_lactose", Value::Bool(true)),
            ],
        )
        .unwrap();
        let (sql, params) = InsertBuilder::new(&shake).build_with_dialect(Dialect::Sqlite);
        assert_eq!(
            sql,
            "INSERT INTO \"milkshakes\" (\"ml_name\", \"bl_lactose\") VALUES (?1, ?2)"
        );
        assert_eq!(params.len(), 2);

        let (sql, _) = InsertBuilder::new(&shake).build_with_dialect(Dialect::Postgres);
        assert!(sql.ends_with("RETURNING \"id\""));
    }

    #[test]
    fn test_insert_default_values() {
        let shake = Resource::new(milkshake());
        let (sql, params) = InsertBuilder::new(&shake).build_with_dialect(Dialect::Sqlite);
        assert_eq!(sql, "INSERT INTO \"milkshakes\" DEFAULT VALUES");
        assert!(params.is_empty());
    }

    #[test]
    fn test_update_dirty_only() {
        let mut shake = Resource::persisted(milkshake(), Value::BigInt(3));
        shake.load_value(1, Value::from("vanilla"));
        assert!(
            UpdateBuilder::new(&shake)
                .build_with_dialect(Dialect::Sqlite)
                .unwrap()
                .is_none()
        );

        shake.set("contains_lactose", false).unwrap();
        let (sql, params) = UpdateBuilder::new(&shake)
            .build_with_dialect(Dialect::Sqlite)
            .unwrap()
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE \"milkshakes\" SET \"bl_lactose\" = ?1 WHERE \"id\" = ?2"
        );
        assert_eq!(params, vec![Value::Bool(false), Value::BigInt(3)]);
    }

    #[test]
    fn test_delete() {
        let shake = Resource::persisted(milkshake(), Value::BigInt(3));
        let (sql, params) = DeleteBuilder::Resource(&shake)
            .build_with_dialect(Dialect::Postgres)
            .unwrap();
        assert_eq!(sql, "DELETE FROM \"milkshakes\" WHERE \"id\" = $1");
        assert_eq!(params, vec![Value::BigInt(3)]);

        let entity = milkshake();
        let (sql, _) = DeleteBuilder::All(&entity)
            .build_with_dialect(Dialect::Sqlite)
            .unwrap();
        assert_eq!(sql, "DELETE FROM \"milkshakes\"");

        let unsaved = Resource::new(milkshake());
        assert!(
            DeleteBuilder::Resource(&unsaved)
                .build_with_dialect(Dialect::Sqlite)
                .is_err()
        );
    }
}
