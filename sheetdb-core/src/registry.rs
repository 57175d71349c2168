//! The set of collections known to a store, unique by name.

use crate::collection::Collection;
use crate::grid::SheetProperties;

#[derive(Debug, Clone, Default)]
pub struct Registry {
    collections: Vec<Collection>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One unmaterialized shell per sheet.
    pub fn from_sheets(sheets: Vec<SheetProperties>) -> Self {
        let mut registry = Self::new();
        for sheet in sheets {
            registry.put(Collection::shell(sheet.title.clone(), Some(sheet)));
        }
        registry
    }

    pub fn get(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Collection> {
        self.collections.iter_mut().find(|c| c.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Inserts a collection, replacing any existing one with the same name
    /// in place.
    pub fn put(&mut self, collection: Collection) {
        match self.get_mut(collection.name()) {
            Some(existing) => *existing = collection,
            None => self.collections.push(collection),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Collection> {
        let position = self.collections.iter().position(|c| c.name() == name)?;
        Some(self.collections.remove(position))
    }

    pub fn names(&self) -> Vec<&str> {
        self.collections.iter().map(Collection::name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collection> {
        self.collections.iter()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}
