use std::collections::HashMap;

use chrono::{DateTime, Local};

use crate::board::{BoardIdentity, UserField};

#[derive(Debug, Clone)]
struct CachedFields {
    fields: Vec<UserField>,
    confirmed_at: DateTime<Local>,
}

/// Last confirmed field values per board identity. Entries live for the whole
/// session; there is no removal, invalidation goes through the gate's validity
/// flag so re-prompts can still be pre-filled.
#[derive(Debug, Default)]
pub struct FieldCache {
    entries: HashMap<BoardIdentity, CachedFields>,
}

impl FieldCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy; callers never get at the stored entry.
    pub fn get(&self, identity: &BoardIdentity) -> Option<Vec<UserField>> {
        self.entries.get(identity).map(|e| e.fields.clone())
    }

    pub fn put(&mut self, identity: &BoardIdentity, fields: &[UserField]) {
        self.entries.insert(
            identity.clone(),
            CachedFields {
                fields: fields.to_vec(),
                confirmed_at: Local::now(),
            },
        );
    }

    pub fn contains(&self, identity: &BoardIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn confirmed_at(&self, identity: &BoardIdentity) -> Option<DateTime<Local>> {
        self.entries.get(identity).map(|e| e.confirmed_at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
