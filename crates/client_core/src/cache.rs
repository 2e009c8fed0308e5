use std::collections::HashSet;

use shared::domain::{UserId, UserRecord};
use tracing::warn;

/// Ordered local replica of the registry's records. Ids are unique.
#[derive(Debug, Clone, Default)]
pub struct RecordCache {
    records: Vec<UserRecord>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole replica, keeping server order. A repeated id keeps
    /// its first occurrence.
    pub fn replace_all(&mut self, records: Vec<UserRecord>) {
        let mut seen = HashSet::with_capacity(records.len());
        let mut deduped = Vec::with_capacity(records.len());
        for record in records {
            if seen.insert(record.id) {
                deduped.push(record);
            } else {
                warn!(user_id = record.id.0, "dropping duplicate record from list response");
            }
        }
        self.records = deduped;
    }

    pub fn remove(&mut self, id: UserId) -> Option<UserRecord> {
        let index = self.records.iter().position(|record| record.id == id)?;
        Some(self.records.remove(index))
    }

    pub fn get(&self, id: UserId) -> Option<&UserRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.get(id).is_some()
    }

    pub fn records(&self) -> &[UserRecord] {
        &self.records
    }

    pub fn ids(&self) -> Vec<UserId> {
        self.records.iter().map(|record| record.id).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
