//! Category registry
//!
//! Maps list names to stable 1-based category ids. A registry is mutated only
//! while a generation is being built and is frozen once the generation is
//! published. Seeding a new build from the previous registry keeps ids stable
//! across reloads.

use std::collections::HashMap;

use crate::types::{Category, CategoryId, ListType};

/// Reserved name for the user's custom trigger phrases.
pub const USER_TRIGGER_BLACKLIST: &str = "/user/trigger_blacklist";
/// Reserved name for the user's custom whitelist rules.
pub const USER_CUSTOM_WHITELIST: &str = "/user/custom_whitelist";
/// Reserved name for the user's self-moderation block rules.
pub const USER_SELF_MODERATION: &str = "/user/self_moderation";

/// Error type for category registration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("category '{name}' is registered as {existing}, not {requested}")]
    ListTypeConflict {
        name: String,
        existing: ListType,
        requested: ListType,
    },
}

/// Name to category mapping for one configuration generation.
#[derive(Debug, Clone, Default)]
pub struct CategoryRegistry {
    by_name: HashMap<String, CategoryId>,
    categories: Vec<Category>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the category registered under `name`, creating it if absent.
    ///
    /// New categories get id `len() + 1`. A name keeps the list type it was
    /// first registered with.
    pub fn fetch_or_create(
        &mut self,
        name: &str,
        list_type: ListType,
    ) -> Result<&Category, RegistryError> {
        if let Some(&id) = self.by_name.get(name) {
            let category = &self.categories[index_of(id)];
            if category.list_type != list_type {
                return Err(RegistryError::ListTypeConflict {
                    name: name.to_string(),
                    existing: category.list_type,
                    requested: list_type,
                });
            }
            return Ok(category);
        }

        let id = CategoryId(self.categories.len() as u32 + 1);
        log::debug!("registered category {} '{}' ({})", id, name, list_type);
        self.by_name.insert(name.to_string(), id);
        self.categories.push(Category {
            id,
            list_type,
            name: name.to_string(),
        });
        Ok(&self.categories[index_of(id)])
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        if id.0 == 0 {
            return None;
        }
        self.categories.get(index_of(id))
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Category> {
        self.by_name.get(name).and_then(|&id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Categories in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }
}

#[inline]
fn index_of(id: CategoryId) -> usize {
    id.0 as usize - 1
}
