//! CREATE TABLE / DROP TABLE statement builders.

use sqlmapper_core::{Dialect, EntityType, Property};

/// Builder for CREATE TABLE statements.
#[derive(Debug)]
pub struct CreateTable<'e> {
    entity: &'e EntityType,
    if_not_exists: bool,
}

impl<'e> CreateTable<'e> {
    /// Create a new CREATE TABLE builder.
    pub fn new(entity: &'e EntityType) -> Self {
        Self {
            entity,
            if_not_exists: false,
        }
    }

    /// Add IF NOT EXISTS clause.
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Build the CREATE TABLE SQL for `dialect`.
    pub fn build(&self, dialect: Dialect) -> String {
        let mut sql = String::from("CREATE TABLE ");

        if self.if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }

        sql.push_str(&dialect.quote_identifier(self.entity.storage_name()));
        sql.push_str(" (\n  ");

        let mut parts: Vec<String> = self
            .entity
            .properties()
            .iter()
            .map(|p| column_definition(p, dialect))
            .collect();

        let key = self.entity.key();
        if !key.is_serial() {
            parts.push(format!(
                "PRIMARY KEY ({})",
                dialect.quote_identifier(key.field_name())
            ));
        }

        sql.push_str(&parts.join(",\n  "));
        sql.push_str("\n)");
        sql
    }
}

fn column_definition(property: &Property, dialect: Dialect) -> String {
    let column = dialect.quote_identifier(property.field_name());
    if property.is_serial() {
        return format!("{} {}", column, dialect.serial_key_ddl());
    }

    let mut def = format!("{} {}", column, property.kind().sql_name(dialect));
    if property.is_required() {
        def.push_str(" NOT NULL");
    }
    def
}

/// Builder for DROP TABLE statements.
#[derive(Debug)]
pub struct DropTable<'e> {
    entity: &'e EntityType,
    if_exists: bool,
}

impl<'e> DropTable<'e> {
    pub fn new(entity: &'e EntityType) -> Self {
        Self {
            entity,
            if_exists: false,
        }
    }

    /// Add IF EXISTS clause.
    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    pub fn build(&self, dialect: Dialect) -> String {
        let table = dialect.quote_identifier(self.entity.storage_name());
        if self.if_exists {
            format!("DROP TABLE IF EXISTS {table}")
        } else {
            format!("DROP TABLE {table}")
        }
    }
}
