//! Group Registry
//!
//! Process-wide lookup of groups by name. The registry is an explicit value
//! the host owns and hands to the HTTP pool, so tests and embedders can run
//! several isolated registries side by side.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use super::group::{Getter, Group};
use crate::error::{Error, Result};

/// Name -> group map
#[derive(Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a group.
    ///
    /// Names are unique; registering an existing name fails with
    /// `GroupExists` and leaves the original group in place.
    pub fn new_group(
        &self,
        name: impl Into<String>,
        cache_bytes: u64,
        getter: Arc<dyn Getter>,
    ) -> Result<Arc<Group>> {
        let name = name.into();
        let mut groups = self.groups.write();
        if groups.contains_key(&name) {
            return Err(Error::GroupExists(name));
        }

        let group = Group::new(name.clone(), cache_bytes, getter);
        groups.insert(name.clone(), Arc::clone(&group));
        info!(group = %name, cache_bytes, "group created");
        Ok(group)
    }

    /// Look up a group by name
    pub fn get_group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).cloned()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// All registered groups, sorted by name
    pub fn groups(&self) -> Vec<Arc<Group>> {
        let mut groups: Vec<Arc<Group>> = self.groups.read().values().cloned().collect();
        groups.sort_by(|a, b| a.name().cmp(b.name()));
        groups
    }

    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

impl std::fmt::Debug for GroupRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupRegistry")
            .field("groups", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::group::GetterFunc;
    use assert_matches::assert_matches;

    fn echo() -> Arc<dyn Getter> {
        Arc::new(GetterFunc::new(|key: &str| Ok(key.as_bytes().to_vec())))
    }

    #[test]
    fn test_new_and_lookup() {
        let registry = GroupRegistry::new();
        assert!(registry.is_empty());

        let group = registry.new_group("scores", 2 << 10, echo()).unwrap();
        assert_eq!(group.name(), "scores");

        let found = registry.get_group("scores").unwrap();
        assert!(Arc::ptr_eq(&group, &found));
        assert!(registry.get_group("missing").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = GroupRegistry::new();
        let first = registry.new_group("scores", 0, echo()).unwrap();

        assert_matches!(
            registry.new_group("scores", 0, echo()),
            Err(Error::GroupExists(name)) if name == "scores"
        );
        let found = registry.get_group("scores").unwrap();
        assert!(Arc::ptr_eq(&first, &found));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_names_sorted() {
        let registry = GroupRegistry::new();
        for name in ["users", "avatars", "scores"] {
            registry.new_group(name, 0, echo()).unwrap();
        }
        assert_eq!(registry.names(), vec!["avatars", "scores", "users"]);
        let groups: Vec<_> = registry.groups().iter().map(|g| g.name().to_string()).collect();
        assert_eq!(groups, registry.names());
    }

    #[test]
    fn test_registries_are_isolated() {
        let a = GroupRegistry::new();
        let b = GroupRegistry::new();
        a.new_group("scores", 0, echo()).unwrap();
        assert!(b.get_group("scores").is_none());
        b.new_group("scores", 0, echo()).unwrap();
    }
}
