use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::classify::classify;
use crate::data::{Column, Dataset};
use crate::encode::EncodingMap;
use crate::error::{Result, VizError};
use crate::ir::{ChartDescriptor, ChartKind, SeriesKind};
use crate::resolve::{resolve, resolve_with, series_for};

/// Per-column result: a descriptor, or the reason the column cannot be drawn
pub type ColumnOutcome = Result<ChartDescriptor>;

/// Runs classification and resolution over selected columns.
///
/// The engine is the session: encodings for categorical columns are kept
/// per column name, so asking for the same column again (for instance after
/// switching chart kind back and forth) yields the same codes.
#[derive(Debug, Default)]
pub struct DispatchEngine {
    encodings: Mutex<HashMap<String, EncodingMap>>,
}

impl DispatchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// One outcome per column, in input order. A failing column never stops the rest.
    pub fn run(&self, columns: &[Column], kind: ChartKind) -> Vec<ColumnOutcome> {
        columns
            .iter()
            .map(|column| self.dispatch_column(column, kind))
            .collect()
    }

    /// Same as `run`, evaluating columns on the rayon pool
    pub fn run_parallel(&self, columns: &[Column], kind: ChartKind) -> Vec<ColumnOutcome> {
        columns
            .par_iter()
            .map(|column| self.dispatch_column(column, kind))
            .collect()
    }

    /// Dispatch columns of `dataset` by name; unknown names become `ColumnNotFound`.
    pub fn run_selection<S: AsRef<str>>(
        &self,
        dataset: &Dataset,
        names: &[S],
        kind: ChartKind,
    ) -> Vec<ColumnOutcome> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                match dataset.column(name) {
                    Some(column) => self.dispatch_column(column, kind),
                    None => {
                        let err = VizError::ColumnNotFound {
                            column: name.to_string(),
                        };
                        warn!(column = name, error = %err, "column not in dataset");
                        Err(err)
                    }
                }
            })
            .collect()
    }

    pub fn dispatch_column(&self, column: &Column, kind: ChartKind) -> ColumnOutcome {
        let column_type = classify(column);
        debug!(column = %column.name, %column_type, %kind, rows = column.len(), "classified column");

        let result = if series_for(column_type, kind) == Some(SeriesKind::EncodedSequence) {
            let mut encodings = self.encodings.lock();
            let encoding = encodings.entry(column.name.clone()).or_default();
            resolve_with(column, column_type, kind, encoding)
        } else {
            resolve(column, column_type, kind)
        };

        match &result {
            Ok(descriptor) => {
                debug!(column = %column.name, series = ?descriptor.series, points = descriptor.payload.len(), "resolved chart")
            }
            Err(err) => warn!(column = %column.name, error = %err, "column cannot be visualized"),
        }
        result
    }

    /// Snapshot of the session encoding for a column, if one was built
    pub fn encoding(&self, column: &str) -> Option<EncodingMap> {
        self.encodings.lock().get(column).cloned()
    }

    /// Forget all session encodings
    pub fn reset(&self) {
        self.encodings.lock().clear();
    }
}
