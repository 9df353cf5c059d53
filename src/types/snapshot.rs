//! Aggregated poll results.

use std::collections::HashMap;
use std::collections::hash_map;

use crate::types::FieldValue;

/// Field values collected during one poll cycle, keyed by field name.
///
/// Later inserts overwrite earlier ones for the same key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    fields: HashMap<&'static str, FieldValue>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, returning the value it replaced.
    pub fn insert(&mut self, key: &'static str, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(key, value)
    }

    /// Merges all fields of `other` into this snapshot.
    pub fn merge(&mut self, other: Self) {
        self.fields.extend(other.fields);
    }

    /// Returns the value of a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Returns true if the field is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field was decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over all fields in arbitrary order.
    pub fn iter(&self) -> hash_map::Iter<'_, &'static str, FieldValue> {
        self.fields.iter()
    }
}

impl FromIterator<(&'static str, FieldValue)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (&'static str, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a &'static str, &'a FieldValue);
    type IntoIter = hash_map::Iter<'a, &'static str, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Snapshot::new();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.len(), 0);
        assert!(snapshot.get("total_battery_percent").is_none());
    }

    #[test]
    fn test_merge_last_write_wins() {
        let mut snapshot: Snapshot = [
            ("ac_output_on", FieldValue::Bool(false)),
            ("total_battery_percent", FieldValue::Uint(80)),
        ]
        .into_iter()
        .collect();

        snapshot.merge([("ac_output_on", FieldValue::Bool(true))].into_iter().collect());

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("ac_output_on"), Some(&FieldValue::Bool(true)));
        assert_eq!(
            snapshot.get("total_battery_percent"),
            Some(&FieldValue::Uint(80))
        );
    }
}
