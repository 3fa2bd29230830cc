use serde::Serialize;
use std::collections::HashMap;

use crate::data::{Column, Value, ValueKey};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyEntry {
    pub value: Value,
    pub count: usize,
}

/// Distinct values with their counts, most frequent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FrequencyTable {
    entries: Vec<FrequencyEntry>,
}

impl FrequencyTable {
    pub fn entries(&self) -> &[FrequencyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts (the column's non-missing count)
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.value.to_string()).collect()
    }

    pub fn counts(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.count).collect()
    }

    /// Each entry's fraction of the total; empty when there is nothing to share
    pub fn shares(&self) -> Vec<f64> {
        let total = self.total();
        if total == 0 {
            return Vec::new();
        }
        self.entries
            .iter()
            .map(|e| e.count as f64 / total as f64)
            .collect()
    }
}

/// Count each distinct present value.
///
/// Ordered by count descending; equal counts keep first-appearance order.
pub fn aggregate(column: &Column) -> FrequencyTable {
    let mut index: HashMap<ValueKey, usize> = HashMap::new();
    let mut entries: Vec<FrequencyEntry> = Vec::new();

    for value in &column.values {
        let Some(key) = value.key() else { continue };
        match index.get(&key) {
            Some(&i) => entries[i].count += 1,
            None => {
                index.insert(key, entries.len());
                entries.push(FrequencyEntry {
                    value: value.clone(),
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable
    entries.sort_by(|a, b| b.count.cmp(&a.count));

    FrequencyTable { entries }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(table: &FrequencyTable) -> Vec<(String, usize)> {
        table
            .entries()
            .iter()
            .map(|e| (e.value.to_string(), e.count))
            .collect()
    }

    #[test]
    fn test_categorical_counts() {
        let column = Column::new(
            "c",
            ["A", "B", "A", "C", "B", "A"]
                .iter()
                .map(|s| Value::Text(s.to_string()))
                .collect(),
        );
        let table = aggregate(&column);
        assert_eq!(
            pairs(&table),
            vec![("A".into(), 3), ("B".into(), 2), ("C".into(), 1)]
        );
    }

    #[test]
    fn test_ties_keep_first_appearance() {
        let column = Column::new(
            "n",
            vec![
                Value::Integer(30),
                Value::Integer(10),
                Value::Integer(20),
                Value::Integer(10),
            ],
        );
        let table = aggregate(&column);
        assert_eq!(
            pairs(&table),
            vec![("10".into(), 2), ("30".into(), 1), ("20".into(), 1)]
        );
    }

    #[test]
    fn test_missing_excluded() {
        let column = Column::new(
            "m",
            vec![Value::Missing, Value::Float(1.5), Value::Float(f64::NAN), Value::Float(1.5)],
        );
        let table = aggregate(&column);
        assert_eq!(table.total(), 2);
        assert_eq!(table.total(), column.non_missing_count());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_empty_column() {
        let table = aggregate(&Column::new("e", vec![]));
        assert!(table.is_empty());
        assert!(table.shares().is_empty());
    }

    #[test]
    fn test_shares() {
        let column = Column::new(
            "b",
            vec![Value::Boolean(true), Value::Boolean(true), Value::Boolean(false), Value::Boolean(true)],
        );
        let table = aggregate(&column);
        assert_eq!(table.shares(), vec![0.75, 0.25]);
    }

    #[test]
    fn test_serializes_as_list() {
        let column = Column::new("s", vec![Value::Text("x".into())]);
        let json = serde_json::to_value(aggregate(&column)).unwrap();
        assert_eq!(json, serde_json::json!([{"value": "x", "count": 1}]));
    }
}
