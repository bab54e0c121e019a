//! Property descriptors and ordered property sets.

use crate::types::{DEFAULT_STRING_LENGTH, PropertyType};
use std::collections::HashMap;

/// A named, typed property of an entity.
///
/// The logical `name` is what callers use; `field` is the column the value
/// lives in. They are the same unless the property is aliased with
/// [`Property::field`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    name: String,
    field: String,
    kind: PropertyType,
    key: bool,
    required: bool,
}

impl Property {
    /// Create a property whose column has the same name.
    pub fn new(name: impl Into<String>, kind: PropertyType) -> Self {
        let name = name.into();
        Self {
            field: name.clone(),
            name,
            kind,
            key: kind == PropertyType::Serial,
            required: kind == PropertyType::Serial,
        }
    }

    pub fn serial(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Serial)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Integer)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::String(DEFAULT_STRING_LENGTH))
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Text)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Boolean)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Float)
    }

    pub fn decimal(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Decimal)
    }

    pub fn blob(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Blob)
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Json)
    }

    /// Store this property in a differently named column.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// Mark this property as the entity key.
    pub fn key(mut self) -> Self {
        self.key = true;
        self.required = true;
        self
    }

    /// Mark this property as NOT NULL.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the maximum length of a string property.
    pub fn length(mut self, len: u32) -> Self {
        if let PropertyType::String(_) = self.kind {
            self.kind = PropertyType::String(len);
        }
        self
    }

    /// Logical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical column name.
    pub fn field_name(&self) -> &str {
        &self.field
    }

    pub fn kind(&self) -> PropertyType {
        self.kind
    }

    pub fn is_key(&self) -> bool {
        self.key
    }

    pub fn is_serial(&self) -> bool {
        self.kind == PropertyType::Serial
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// An ordered set of properties, indexed by logical name and by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    properties: Vec<Property>,
    by_name: HashMap<String, usize>,
    by_field: HashMap<String, usize>,
}

impl PropertySet {
    /// Build a set from properties in declaration order.
    ///
    /// Later duplicates are ignored; entity builders reject them before
    /// reaching this point.
    pub fn new(properties: impl IntoIterator<Item = Property>) -> Self {
        let mut set = Self::default();
        for property in properties {
            set.push(property);
        }
        set
    }

    /// Append a property, returning `false` if its name or field is taken.
    pub fn push(&mut self, property: Property) -> bool {
        if self.by_name.contains_key(property.name())
            || self.by_field.contains_key(property.field_name())
        {
            return false;
        }
        let index = self.properties.len();
        self.by_name.insert(property.name().to_string(), index);
        self.by_field.insert(property.field_name().to_string(), index);
        self.properties.push(property);
        true
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Look up a property by logical name.
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.index_of(name).map(|i| &self.properties[i])
    }

    /// Position of a property by logical name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Position of a property by physical field.
    pub fn index_of_field(&self, field: &str) -> Option<usize> {
        self.by_field.get(field).copied()
    }

    pub fn at(&self, index: usize) -> Option<&Property> {
        self.properties.get(index)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Property> {
        self.properties.iter()
    }

    /// Logical names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(Property::name)
    }
}

impl<'a> IntoIterator for &'a PropertySet {
    type Item = &'a Property;
    type IntoIter = std::slice::Iter<'a, Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.iter()
    }
}

impl FromIterator<Property> for PropertySet {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        Self::new(iter)
    }
}
