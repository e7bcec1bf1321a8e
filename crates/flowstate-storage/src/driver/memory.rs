//! In-memory driver for tests and dev mode
//!
//! Stores items in a BTreeMap keyed by (group key, discriminator key), so
//! in-group ordering falls out of map iteration. Provides the same
//! semantics as the PostgreSQL driver.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use flowstate_core::SortOrder;

use super::{
    AttributeEquals, DriverError, GroupQuery, IndexQuery, Item, Patch, PutCondition,
    StorageDriver,
};

/// In-memory implementation of `StorageDriver`.
///
/// All data is stored in memory and lost on drop.
#[derive(Default)]
pub struct MemoryDriver {
    records: RwLock<BTreeMap<(String, String), Item>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records (for tests)
    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }
}

fn item_keys(item: &Item) -> Result<(String, String), DriverError> {
    let group = item
        .get("group_key")
        .and_then(Value::as_str)
        .ok_or_else(|| DriverError::Serialization("item missing group_key".to_string()))?;
    let discriminator = item
        .get("discriminator_key")
        .and_then(Value::as_str)
        .ok_or_else(|| DriverError::Serialization("item missing discriminator_key".to_string()))?;
    Ok((group.to_string(), discriminator.to_string()))
}

fn created_at_ms(item: &Item) -> i64 {
    item.get("created_at_ms").and_then(Value::as_i64).unwrap_or(0)
}

#[async_trait]
impl StorageDriver for MemoryDriver {
    async fn get(
        &self,
        group_key: &str,
        discriminator_key: &str,
    ) -> Result<Option<Item>, DriverError> {
        let records = self.records.read();
        Ok(records
            .get(&(group_key.to_string(), discriminator_key.to_string()))
            .cloned())
    }

    async fn put(&self, item: Item, condition: PutCondition) -> Result<(), DriverError> {
        let key = item_keys(&item)?;
        let mut records = self.records.write();
        if condition == PutCondition::KeyAbsent && records.contains_key(&key) {
            return Err(DriverError::ConditionFailed);
        }
        records.insert(key, item);
        Ok(())
    }

    async fn update(
        &self,
        group_key: &str,
        discriminator_key: &str,
        patch: Patch,
        condition: Option<AttributeEquals>,
    ) -> Result<Item, DriverError> {
        let key = (group_key.to_string(), discriminator_key.to_string());
        let mut records = self.records.write();

        let Some(record) = records.get_mut(&key) else {
            return Err(match condition {
                Some(_) => DriverError::ConditionFailed,
                None => DriverError::NotFound,
            });
        };

        if let Some(cond) = condition {
            if record.get(cond.attribute) != Some(&cond.expected) {
                return Err(DriverError::ConditionFailed);
            }
        }

        for (attribute, value) in patch.set_if_absent {
            record.entry(attribute).or_insert(value);
        }
        for (attribute, value) in patch.set {
            record.insert(attribute, value);
        }
        Ok(record.clone())
    }

    async fn delete(
        &self,
        group_key: &str,
        discriminator_key: &str,
    ) -> Result<Item, DriverError> {
        let key = (group_key.to_string(), discriminator_key.to_string());
        self.records.write().remove(&key).ok_or(DriverError::NotFound)
    }

    async fn query_group(&self, query: GroupQuery) -> Result<Vec<Item>, DriverError> {
        let records = self.records.read();
        let mut matched: Vec<&Item> = records
            .iter()
            .filter(|((group, discriminator), _)| {
                if group != &query.group_key {
                    return false;
                }
                if let Some(prefix) = query.key_prefix {
                    if !discriminator.starts_with(prefix) {
                        return false;
                    }
                }
                if let Some(bound) = &query.exclusive_start {
                    match query.order {
                        SortOrder::Asc => discriminator > bound,
                        SortOrder::Desc => discriminator < bound,
                    }
                } else {
                    true
                }
            })
            .map(|(_, item)| item)
            .collect();

        // BTreeMap iteration is already ascending by discriminator key
        if query.order == SortOrder::Desc {
            matched.reverse();
        }
        matched.truncate(query.limit as usize);
        Ok(matched.into_iter().cloned().collect())
    }

    async fn query_index(&self, query: IndexQuery) -> Result<Vec<Item>, DriverError> {
        let attribute = query.index.attribute();
        let records = self.records.read();
        let mut matched: Vec<(&(String, String), &Item)> = records
            .iter()
            .filter(|(_, item)| {
                if item.get(attribute).and_then(Value::as_str) != Some(query.value.as_str()) {
                    return false;
                }
                if let Some(entity) = query.entity {
                    if item.get("entity_type").and_then(Value::as_str) != Some(entity.as_str()) {
                        return false;
                    }
                }
                if let Some(bound) = query.exclusive_start {
                    match query.order {
                        SortOrder::Asc => created_at_ms(item) > bound,
                        SortOrder::Desc => created_at_ms(item) < bound,
                    }
                } else {
                    true
                }
            })
            .collect();

        matched.sort_by(|(key_a, item_a), (key_b, item_b)| {
            created_at_ms(item_a)
                .cmp(&created_at_ms(item_b))
                .then_with(|| key_a.cmp(key_b))
        });
        if query.order == SortOrder::Desc {
            matched.reverse();
        }
        matched.truncate(query.limit as usize);
        Ok(matched.into_iter().map(|(_, item)| item.clone()).collect())
    }
}
