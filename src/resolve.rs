use crate::aggregate::aggregate;
use crate::classify::classify;
use crate::data::{Column, Value};
use crate::encode::{encode_with, EncodingMap};
use crate::error::{Result, VizError};
use crate::ir::{ChartDescriptor, ChartKind, ColumnType, Payload, SeriesKind};

/// Which series each (column type, chart kind) pair is drawn from.
/// Pairs absent from the table cannot be visualized.
const DISPATCH_TABLE: &[(ColumnType, ChartKind, SeriesKind)] = &[
    (ColumnType::Categorical, ChartKind::Bar, SeriesKind::FrequencyTable),
    (ColumnType::Categorical, ChartKind::Pie, SeriesKind::FrequencyTable),
    (ColumnType::Categorical, ChartKind::Line, SeriesKind::EncodedSequence),
    (ColumnType::Numeric, ChartKind::Bar, SeriesKind::FrequencyTable),
    (ColumnType::Numeric, ChartKind::Pie, SeriesKind::FrequencyTable),
    (ColumnType::Numeric, ChartKind::Line, SeriesKind::RawSequence),
];

/// Look up the series kind for a pair, `None` if the pair is unsupported
pub fn series_for(column_type: ColumnType, kind: ChartKind) -> Option<SeriesKind> {
    DISPATCH_TABLE
        .iter()
        .find(|(t, k, _)| *t == column_type && *k == kind)
        .map(|(_, _, series)| *series)
}

/// Resolve a chart for one column using a throwaway encoding.
pub fn resolve(column: &Column, column_type: ColumnType, kind: ChartKind) -> Result<ChartDescriptor> {
    let mut encoding = EncodingMap::new();
    resolve_with(column, column_type, kind, &mut encoding)
}

/// Resolve a chart for one column, reusing (and extending) a session encoding.
pub fn resolve_with(
    column: &Column,
    column_type: ColumnType,
    kind: ChartKind,
    encoding: &mut EncodingMap,
) -> Result<ChartDescriptor> {
    let series = series_for(column_type, kind).ok_or_else(|| VizError::UnsupportedColumn {
        column: column.name.clone(),
    })?;

    let payload = match series {
        SeriesKind::FrequencyTable => Payload::Frequencies {
            table: aggregate(column),
        },
        SeriesKind::EncodedSequence => {
            let codes = encode_with(encoding, column)?.into_iter().flatten().collect();
            Payload::Codes {
                codes,
                encoding: encoding.clone(),
            }
        }
        SeriesKind::RawSequence => Payload::Values {
            values: raw_sequence(column)?,
        },
    };

    let (title, x_label, y_label) = describe(&column.name, kind, series);

    Ok(ChartDescriptor {
        column: column.name.clone(),
        column_type,
        kind,
        series,
        payload,
        title,
        x_label,
        y_label,
    })
}

/// Present values in row order; every one must be numeric
fn raw_sequence(column: &Column) -> Result<Vec<f64>> {
    column
        .present()
        .map(|v| match v {
            Value::Integer(_) | Value::Float(_) => v.as_f64(),
            _ => None,
        })
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| VizError::InvalidColumnType {
            column: column.name.clone(),
            found: classify(column),
        })
}

/// Title and axis labels, all non-empty
fn describe(column: &str, kind: ChartKind, series: SeriesKind) -> (String, String, String) {
    let name = if column.trim().is_empty() {
        "(unnamed)"
    } else {
        column
    };
    let title = format!("{} for {}", kind.label(), name);
    match (kind, series) {
        (ChartKind::Bar, _) => (title, name.to_string(), "Count".to_string()),
        (ChartKind::Pie, _) => (title, name.to_string(), "Share".to_string()),
        (ChartKind::Line, SeriesKind::EncodedSequence) => {
            (title, "Row".to_string(), format!("{} (code)", name))
        }
        (ChartKind::Line, _) => (title, "Row".to_string(), name.to_string()),
    }
}
