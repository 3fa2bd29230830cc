use serde::ser::{Serialize, Serializer};
use std::collections::HashMap;

use crate::classify::classify;
use crate::data::{Column, Value, ValueKey};
use crate::error::{Result, VizError};
use crate::ir::ColumnType;

/// Codes in row order; `None` marks a missing cell.
pub type EncodedSequence = Vec<Option<usize>>;

/// Distinct categorical value -> integer code, in order of first appearance.
///
/// Codes are dense (`0..len`) and never reassigned once handed out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodingMap {
    values: Vec<Value>,
    codes: HashMap<ValueKey, usize>,
}

impl EncodingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn code(&self, value: &Value) -> Option<usize> {
        value.key().and_then(|k| self.codes.get(&k).copied())
    }

    pub fn value(&self, code: usize) -> Option<&Value> {
        self.values.get(code)
    }

    /// `(code, value)` pairs in code order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.values.iter().enumerate()
    }

    /// Display labels indexed by code
    pub fn labels(&self) -> Vec<String> {
        self.values.iter().map(|v| v.to_string()).collect()
    }

    /// Code for `value`, assigning the next one on first sighting.
    fn assign(&mut self, value: &Value) -> Option<usize> {
        let key = value.key()?;
        let next = self.values.len();
        let code = *self.codes.entry(key).or_insert(next);
        if code == next {
            self.values.push(value.clone());
        }
        Some(code)
    }
}

impl Serialize for EncodingMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(serde::Serialize)]
        struct Entry<'a> {
            code: usize,
            value: &'a Value,
        }

        serializer.collect_seq(self.iter().map(|(code, value)| Entry { code, value }))
    }
}

/// Encode a categorical column with a fresh map.
pub fn encode(column: &Column) -> Result<(EncodingMap, EncodedSequence)> {
    let mut map = EncodingMap::new();
    let sequence = encode_with(&mut map, column)?;
    Ok((map, sequence))
}

/// Encode a categorical column, extending `map` with values it has not seen.
pub fn encode_with(map: &mut EncodingMap, column: &Column) -> Result<EncodedSequence> {
    let found = classify(column);
    if found != ColumnType::Categorical {
        return Err(VizError::InvalidColumnType {
            column: column.name.clone(),
            found,
        });
    }

    Ok(column.values.iter().map(|v| map.assign(v)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Column {
        Column::new(
            "dept",
            items
                .iter()
                .map(|s| {
                    if s.is_empty() {
                        Value::Missing
                    } else {
                        Value::Text(s.to_string())
                    }
                })
                .collect(),
        )
    }

    #[test]
    fn test_first_appearance_order() {
        let (map, seq) = encode(&labels(&["A", "B", "A", "C", "B", "A"])).unwrap();
        assert_eq!(map.labels(), vec!["A", "B", "C"]);
        assert_eq!(seq, vec![Some(0), Some(1), Some(0), Some(2), Some(1), Some(0)]);
    }

    #[test]
    fn test_missing_is_not_coded() {
        let (map, seq) = encode(&labels(&["x", "", "y", ""])).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(seq, vec![Some(0), None, Some(1), None]);
    }

    #[test]
    fn test_idempotent() {
        let column = labels(&["q", "r", "q", "s"]);
        let first = encode(&column).unwrap();
        let second = encode(&column).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_extending_keeps_existing_codes() {
        let mut map = EncodingMap::new();
        encode_with(&mut map, &labels(&["b", "a"])).unwrap();
        let seq = encode_with(&mut map, &labels(&["c", "a", "b"])).unwrap();
        assert_eq!(seq, vec![Some(2), Some(1), Some(0)]);
        assert_eq!(map.code(&Value::Text("a".into())), Some(1));
        assert_eq!(map.value(2), Some(&Value::Text("c".into())));
    }

    #[test]
    fn test_numeric_column_rejected() {
        let column = Column::new("age", vec![Value::Integer(3), Value::Integer(4)]);
        let err = encode(&column).unwrap_err();
        assert_eq!(
            err,
            VizError::InvalidColumnType {
                column: "age".to_string(),
                found: ColumnType::Numeric,
            }
        );
    }

    #[test]
    fn test_mixed_numbers_share_codes() {
        let column = Column::new(
            "m",
            vec![Value::Text("k".into()), Value::Integer(10), Value::Float(10.0)],
        );
        let (map, seq) = encode(&column).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(seq, vec![Some(0), Some(1), Some(1)]);
    }

    #[test]
    fn test_serializes_as_entries() {
        let (map, _) = encode(&labels(&["A", "B"])).unwrap();
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"code": 0, "value": "A"}, {"code": 1, "value": "B"}])
        );
    }
}
