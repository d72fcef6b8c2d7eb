use std::collections::BTreeMap;

use super::domain::{Requirement, RequirementId};

/// Latest known requirement set, keyed by store id.
///
/// Owned by the requirement service, which is its only writer: the cache is
/// replaced wholesale by an explicit store query and otherwise only grows by
/// records the service itself has just written.
#[derive(Debug, Default)]
pub struct RequirementCache {
    records: BTreeMap<RequirementId, Requirement>,
}

impl RequirementCache {
    pub fn replace(&mut self, records: Vec<Requirement>) {
        self.records = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
    }

    pub fn insert(&mut self, record: Requirement) {
        self.records.insert(record.id.clone(), record);
    }

    /// Records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.records.values()
    }
}
