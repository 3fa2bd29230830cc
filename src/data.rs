use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Cell tokens treated as missing by the CSV loader
const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// A single cell, typed by the loader before it reaches the dispatch core.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Missing,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    /// Non-primitive value (JSON object or array), kept as raw text
    Nested(String),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_)) || matches!(self, Value::Float(v) if !v.is_nan())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    /// Identity used for counting and encoding. `None` for missing cells.
    ///
    /// Integral floats share a key with the equal integer, and `-0.0` with `0`.
    pub fn key(&self) -> Option<ValueKey> {
        match self {
            Value::Missing => None,
            Value::Integer(v) => Some(ValueKey::Integer(*v)),
            Value::Float(v) if v.is_nan() => None,
            Value::Float(v) => {
                if v.fract() == 0.0 && *v >= -9.223_372_036_854_775_808e18 && *v < 9.223_372_036_854_775_808e18 {
                    Some(ValueKey::Integer(*v as i64))
                } else {
                    Some(ValueKey::Float(v.to_bits()))
                }
            }
            Value::Text(s) => Some(ValueKey::Text(s.clone())),
            Value::Boolean(b) => Some(ValueKey::Boolean(*b)),
            Value::Nested(s) => Some(ValueKey::Nested(s.clone())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) | Value::Nested(s) => f.write_str(s),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Hashable identity of a present value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Integer(i64),
    Float(u64),
    Text(String),
    Boolean(bool),
    Nested(String),
}

/// A named column of typed cells, one per row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Non-missing values in row order
    pub fn present(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().filter(|v| !v.is_missing())
    }

    pub fn non_missing_count(&self) -> usize {
        self.present().count()
    }
}

/// An in-memory table: ordered, named columns of equal length.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            if let Some(bad) = columns.iter().find(|c| c.len() != first.len()) {
                return Err(anyhow!(
                    "Column '{}' has {} rows, expected {}",
                    bad.name,
                    bad.len(),
                    first.len()
                ));
            }
        }
        let mut names = HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !names.insert(c.name.as_str())) {
            return Err(anyhow!("Column name '{}' appears more than once", dup.name));
        }
        Ok(Self { columns })
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Look up a column by name; exact match first, then ASCII case-insensitive.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name)))
    }

    /// Load a delimited file with a header row
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open dataset '{}'", path.display()))?;
        Self::from_csv_reader(file)
            .with_context(|| format!("Failed to load dataset '{}'", path.display()))
    }

    /// Read CSV data and infer one value kind per column.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let headers = dedupe_headers(headers);

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            anyhow::bail!("CSV data has no header row");
        }

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for (line, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("Failed to parse CSV row {}", line + 1))?;
            for (idx, field) in record.iter().enumerate() {
                cells[idx].push(field.to_string());
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, raw)| infer_column(name, raw))
            .collect();

        Self::new(columns)
    }

    /// Create a Dataset from a JSON array of objects
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| anyhow!("Input data must be a JSON array of objects"))?;

        if array.is_empty() {
            return Err(anyhow!("Input data array is empty"));
        }

        let mut headers: Vec<String> = Vec::new();
        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| anyhow!("Items in array must be objects"))?;
            for key in obj.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }

        let columns = headers
            .into_iter()
            .map(|header| {
                let values = array
                    .iter()
                    .map(|item| json_to_value(item.get(&header)))
                    .collect();
                Column::new(header, values)
            })
            .collect();

        Self::new(columns)
    }

    /// Render the first `rows` rows as an aligned text table
    pub fn preview(&self, rows: usize) -> String {
        let shown = rows.min(self.row_count());
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.name.chars().count()).collect();
        let mut grid: Vec<Vec<String>> = Vec::with_capacity(shown);
        for row in 0..shown {
            let cells: Vec<String> = self.columns.iter().map(|c| c.values[row].to_string()).collect();
            for (w, cell) in widths.iter_mut().zip(&cells) {
                *w = (*w).max(cell.chars().count());
            }
            grid.push(cells);
        }

        let format_row = |cells: Vec<String>| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let mut out = format_row(self.columns.iter().map(|c| c.name.clone()).collect());
        out.push('\n');
        out.push_str(
            &widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        out.push('\n');
        for cells in grid {
            out.push_str(&format_row(cells));
            out.push('\n');
        }
        if self.row_count() > shown {
            out.push_str(&format!("... {} more rows\n", self.row_count() - shown));
        }
        out
    }
}

/// Repeated header names get a `.1`, `.2`, ... suffix so every column
/// stays addressable by name.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = headers.iter().cloned().collect();
    let mut seen: HashSet<String> = HashSet::new();
    headers
        .into_iter()
        .map(|header| {
            if seen.insert(header.clone()) {
                return header;
            }
            let mut n = 1;
            let renamed = loop {
                let candidate = format!("{}.{}", header, n);
                if !taken.contains(&candidate) {
                    break candidate;
                }
                n += 1;
            };
            taken.insert(renamed.clone());
            seen.insert(renamed.clone());
            renamed
        })
        .collect()
}

fn is_missing_token(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell.trim())
}

/// Pick one kind for the whole column: integer, then float, else text.
fn infer_column(name: String, raw: Vec<String>) -> Column {
    let present: Vec<&str> = raw
        .iter()
        .map(|s| s.trim())
        .filter(|s| !is_missing_token(s))
        .collect();

    let all_int = !present.is_empty() && present.iter().all(|s| s.parse::<i64>().is_ok());
    let all_float = !present.is_empty() && present.iter().all(|s| s.parse::<f64>().is_ok());

    let values = raw
        .into_iter()
        .map(|cell| {
            if is_missing_token(&cell) {
                return Value::Missing;
            }
            let trimmed = cell.trim();
            if all_int {
                trimmed.parse::<i64>().map(Value::Integer).unwrap_or(Value::Missing)
            } else if all_float {
                // `inf` and `NaN` parse as floats but cannot be plotted
                match trimmed.parse::<f64>() {
                    Ok(v) if v.is_finite() => Value::Float(v),
                    _ => Value::Missing,
                }
            } else {
                Value::Text(cell)
            }
        })
        .collect();

    Column::new(name, values)
}

fn json_to_value(value: Option<&JsonValue>) -> Value {
    match value {
        None | Some(JsonValue::Null) => Value::Missing,
        Some(JsonValue::String(s)) => Value::Text(s.clone()),
        Some(JsonValue::Bool(b)) => Value::Boolean(*b),
        Some(JsonValue::Number(n)) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Missing),
        },
        Some(other) => Value::Nested(other.to_string()),
    }
}
