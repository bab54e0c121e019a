//! Entity type definitions.
//!
//! An [`EntityType`] is defined once, usually at startup, and shared
//! behind an `Arc` by every query and resource that refers to it.
//!
//! ```
//! use sqlmapper_core::{EntityType, Property};
//!
//! let milkshake = EntityType::builder("Milkshake")
//!     .serial("id")
//!     .property(Property::string("name").field("ml_name"))
//!     .property(Property::boolean("contains_lactose").field("bl_lactose"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(milkshake.storage_name(), "milkshakes");
//! assert_eq!(milkshake.key().name(), "id");
//! ```

use crate::error::{Error, Result, SchemaErrorKind};
use crate::property::{Property, PropertySet};
use std::sync::Arc;

/// A named schema: an ordered property set with exactly one key.
#[derive(Debug, PartialEq, Eq)]
pub struct EntityType {
    name: String,
    storage_name: String,
    properties: PropertySet,
    key: usize,
}

impl EntityType {
    /// Start defining an entity type.
    pub fn builder(name: impl Into<String>) -> EntityTypeBuilder {
        EntityTypeBuilder {
            name: name.into(),
            storage_name: None,
            properties: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the backing table.
    pub fn storage_name(&self) -> &str {
        &self.storage_name
    }

    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    /// Look up a property by logical name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// The key property.
    pub fn key(&self) -> &Property {
        &self.properties.iter().as_slice()[self.key]
    }

    /// Position of the key property.
    pub fn key_index(&self) -> usize {
        self.key
    }
}

/// Builder for [`EntityType`].
#[derive(Debug)]
pub struct EntityTypeBuilder {
    name: String,
    storage_name: Option<String>,
    properties: Vec<Property>,
}

impl EntityTypeBuilder {
    /// Add an auto-incrementing key.
    pub fn serial(mut self, name: impl Into<String>) -> Self {
        self.properties.push(Property::serial(name));
        self
    }

    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Override the default table name.
    pub fn storage_name(mut self, name: impl Into<String>) -> Self {
        self.storage_name = Some(name.into());
        self
    }

    /// Validate and build the entity type.
    pub fn build(self) -> Result<Arc<EntityType>> {
        if self.name.trim().is_empty() {
            return Err(Error::schema(
                SchemaErrorKind::Invalid,
                "entity name must not be empty",
            ));
        }

        let keys: Vec<usize> = self
            .properties
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_key())
            .map(|(i, _)| i)
            .collect();
        let key = match keys.as_slice() {
            [] => {
                return Err(Error::schema(
                    SchemaErrorKind::MissingKey,
                    format!("entity {} has no key property", self.name),
                ));
            }
            [single] => *single,
            _ => {
                return Err(Error::schema(
                    SchemaErrorKind::MultipleKeys,
                    format!("entity {} declares more than one key property", self.name),
                ));
            }
        };

        let mut properties = PropertySet::default();
        for property in self.properties {
            if properties.contains(property.name()) {
                return Err(Error::schema(
                    SchemaErrorKind::DuplicateProperty,
                    format!(
                        "entity {} declares property '{}' twice",
                        self.name,
                        property.name()
                    ),
                ));
            }
            if properties.index_of_field(property.field_name()).is_some() {
                return Err(Error::schema(
                    SchemaErrorKind::DuplicateField,
                    format!(
                        "entity {} maps field '{}' more than once",
                        self.name,
                        property.field_name()
                    ),
                ));
            }
            properties.push(property);
        }

        let storage_name = self
            .storage_name
            .unwrap_or_else(|| default_storage_name(&self.name));

        tracing::debug!(
            entity = %self.name,
            storage = %storage_name,
            properties = properties.len(),
            "Defined entity type"
        );

        Ok(Arc::new(EntityType {
            name: self.name,
            storage_name,
            properties,
            key,
        }))
    }
}

/// Table name derived from an entity name: snake_case, last word pluralized.
pub fn default_storage_name(entity: &str) -> String {
    let snake = to_snake_case(entity);
    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{head}_{}", pluralize(last)),
        None => pluralize(&snake),
    }
}

/// Convert a CamelCase name to snake_case.
///
/// Acronyms stay together: "HTTPStatus" becomes "http_status".
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let chars: Vec<char> = s.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next = chars.get(i + 1).copied();
                if prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next.is_some_and(|n| n.is_lowercase()))
                {
                    result.push('_');
                }
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }

    result
}

/// Simple English pluralization of a single lowercase word.
pub fn pluralize(word: &str) -> String {
    match word {
        "person" => return "people".to_string(),
        "child" => return "children".to_string(),
        "man" => return "men".to_string(),
        "woman" => return "women".to_string(),
        "mouse" => return "mice".to_string(),
        "datum" => return "data".to_string(),
        "index" => return "indices".to_string(),
        "matrix" => return "matrices".to_string(),
        "analysis" => return "analyses".to_string(),
        _ => {}
    }

    if word.is_empty() {
        return String::new();
    }

    if word.ends_with('s') || word.ends_with('x') || word.ends_with("ch") || word.ends_with("sh")
    {
        return format!("{word}es");
    }

    if word.ends_with('z') {
        let chars: Vec<char> = word.chars().collect();
        if chars.len() >= 2 && "aeiou".contains(chars[chars.len() - 2]) {
            return format!("{word}zes");
        }
        return format!("{word}es");
    }

    if let Some(stripped) = word.strip_suffix('y') {
        if stripped.chars().last().is_some_and(|c| !"aeiou".contains(c)) {
            return format!("{stripped}ies");
        }
        return format!("{word}s");
    }

    format!("{word}s")
}
