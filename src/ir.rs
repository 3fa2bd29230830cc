use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::aggregate::FrequencyTable;
use crate::encode::EncodingMap;

// =============================================================================
// Classification
// =============================================================================

/// Semantic type assigned to a column by `classify`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Categorical,
    Numeric,
    Unsupported,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Categorical => "categorical",
            ColumnType::Numeric => "numeric",
            ColumnType::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Pie,
    Line,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [ChartKind::Bar, ChartKind::Pie, ChartKind::Line];

    /// Human-facing name, as offered in the chart type picker
    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar Chart",
            ChartKind::Pie => "Pie Chart",
            ChartKind::Line => "Line Graph",
        }
    }

    /// Whether the chart draws counts rather than a row-ordered trace
    pub fn is_frequency(&self) -> bool {
        matches!(self, ChartKind::Bar | ChartKind::Pie)
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Line => "line",
        };
        f.write_str(name)
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "bar" | "bar chart" => Ok(ChartKind::Bar),
            "pie" | "pie chart" => Ok(ChartKind::Pie),
            "line" | "line graph" | "line chart" => Ok(ChartKind::Line),
            _ => Err(format!("Unknown chart kind '{}' (expected bar, pie or line)", s)),
        }
    }
}

// =============================================================================
// Descriptors
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    FrequencyTable,
    RawSequence,
    EncodedSequence,
}

/// Resolved data a renderer draws
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Frequencies { table: FrequencyTable },
    Values { values: Vec<f64> },
    /// Codes in row order, with the encoding used to produce them.
    ///
    /// The encoding is a snapshot of the session map, so after a column has
    /// been extended it may hold values this sequence never uses; those
    /// codes keep their numbers and the renderer leaves their ticks blank.
    Codes { codes: Vec<usize>, encoding: EncodingMap },
}

impl Payload {
    pub fn series_kind(&self) -> SeriesKind {
        match self {
            Payload::Frequencies { .. } => SeriesKind::FrequencyTable,
            Payload::Values { .. } => SeriesKind::RawSequence,
            Payload::Codes { .. } => SeriesKind::EncodedSequence,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Frequencies { table } => table.len(),
            Payload::Values { values } => values.len(),
            Payload::Codes { codes, .. } => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything a renderer needs to draw one column as one chart kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDescriptor {
    pub column: String,
    pub column_type: ColumnType,
    pub kind: ChartKind,
    pub series: SeriesKind,
    pub payload: Payload,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
}
