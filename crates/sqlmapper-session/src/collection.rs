//! Finder results.

use sqlmapper_core::ResourceRef;
use sqlmapper_query::Query;

/// An ordered set of resources together with the query that loaded them.
///
/// Never absent: a query matching nothing yields an empty collection.
#[derive(Debug, Clone)]
pub struct Collection {
    resources: Vec<ResourceRef>,
    query: Query,
    repository: String,
}

impl Collection {
    pub fn new(resources: Vec<ResourceRef>, query: Query, repository: impl Into<String>) -> Self {
        Self {
            resources,
            query,
            repository: repository.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn first(&self) -> Option<&ResourceRef> {
        self.resources.first()
    }

    pub fn last(&self) -> Option<&ResourceRef> {
        self.resources.last()
    }

    pub fn get(&self, index: usize) -> Option<&ResourceRef> {
        self.resources.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResourceRef> {
        self.resources.iter()
    }

    /// Does the collection hold a resource equal to `resource`?
    pub fn contains(&self, resource: &ResourceRef) -> bool {
        self.resources.iter().any(|r| r == resource)
    }

    /// The query that produced this collection.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Name of the repository the query ran against.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn into_resources(self) -> Vec<ResourceRef> {
        self.resources
    }
}

impl IntoIterator for Collection {
    type Item = ResourceRef;
    type IntoIter = std::vec::IntoIter<ResourceRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a ResourceRef;
    type IntoIter = std::slice::Iter<'a, ResourceRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}

/// What `find` returns: one optional resource for single selectors, a
/// collection for `All`.
#[derive(Debug, Clone)]
pub enum FindResult {
    One(Option<ResourceRef>),
    Many(Collection),
}

impl FindResult {
    /// The single resource, or the first of a collection.
    pub fn into_one(self) -> Option<ResourceRef> {
        match self {
            FindResult::One(resource) => resource,
            FindResult::Many(collection) => collection.into_iter().next(),
        }
    }

    /// The collection, or `None` for single selectors.
    pub fn into_collection(self) -> Option<Collection> {
        match self {
            FindResult::One(_) => None,
            FindResult::Many(collection) => Some(collection),
        }
    }

    /// Did the finder come back empty?
    pub fn is_empty(&self) -> bool {
        match self {
            FindResult::One(resource) => resource.is_none(),
            FindResult::Many(collection) => collection.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlmapper_core::{EntityType, Property, Resource, Value};
    use sqlmapper_query::{QueryKind, Selection};
    use std::sync::Arc;

    fn smoothie(entity: &Arc<EntityType>, id: i64) -> ResourceRef {
        ResourceRef::new(Resource::persisted(Arc::clone(entity), Value::BigInt(id)))
    }

    #[test]
    fn test_collection_accessors() {
        let entity = EntityType::builder("GreenSmoothie")
            .serial("id")
            .property(Property::string("name"))
            .build()
            .unwrap();
        let query = Query::new(Arc::clone(&entity), QueryKind::Symbolic(Selection::All));
        let collection = Collection::new(
            vec![smoothie(&entity, 1), smoothie(&entity, 2)],
            query.clone(),
            "default",
        );

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.first().and_then(ResourceRef::key), Some(Value::BigInt(1)));
        assert_eq!(collection.last().and_then(ResourceRef::key), Some(Value::BigInt(2)));
        assert!(collection.contains(&smoothie(&entity, 2)));
        assert!(!collection.contains(&smoothie(&entity, 3)));
        assert_eq!(collection.repository(), "default");
        assert_eq!(collection.query(), &query);
        assert_eq!(collection.iter().count(), 2);

        let empty = Collection::new(Vec::new(), query, "default");
        assert!(empty.is_empty());
        assert!(empty.first().is_none());
        assert!(FindResult::Many(empty).is_empty());
        assert!(FindResult::One(None).into_one().is_none());
    }
}
