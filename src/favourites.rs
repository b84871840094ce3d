//! Favourite notes of the signed-in user.
//!
//! Toggles are applied locally before the backend confirms them. Each toggle
//! yields a [`FavouriteChange`]; if the request fails the caller applies
//! `change.inverse()` to roll the set back.

use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavouriteSet {
    ids: HashSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavouriteChange {
    Added(String),
    Removed(String),
}

impl FavouriteChange {
    pub fn inverse(&self) -> Self {
        match self {
            FavouriteChange::Added(id) => FavouriteChange::Removed(id.clone()),
            FavouriteChange::Removed(id) => FavouriteChange::Added(id.clone()),
        }
    }

    pub fn note_id(&self) -> &str {
        match self {
            FavouriteChange::Added(id) | FavouriteChange::Removed(id) => id,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, FavouriteChange::Added(_))
    }
}

impl FavouriteSet {
    pub fn contains(&self, note_id: &str) -> bool {
        self.ids.contains(note_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn apply(&mut self, change: &FavouriteChange) {
        match change {
            FavouriteChange::Added(id) => {
                self.ids.insert(id.clone());
            }
            FavouriteChange::Removed(id) => {
                self.ids.remove(id);
            }
        }
    }

    /// Flip membership of `note_id` and return the change that was applied.
    pub fn toggle(&mut self, note_id: &str) -> FavouriteChange {
        let change = if self.contains(note_id) {
            FavouriteChange::Removed(note_id.to_string())
        } else {
            FavouriteChange::Added(note_id.to_string())
        };
        self.apply(&change);
        change
    }
}

impl FromIterator<String> for FavouriteSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
