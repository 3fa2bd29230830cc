use thiserror::Error;

use crate::ir::ColumnType;

/// Errors raised by the dispatch core for a single column.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VizError {
    #[error("Column '{column}' cannot be visualized: no supported value kind")]
    UnsupportedColumn { column: String },
    #[error("Column '{column}' has type {found}, which this operation does not accept")]
    InvalidColumnType { column: String, found: ColumnType },
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },
}

impl VizError {
    /// Name of the column the failure belongs to
    pub fn column(&self) -> &str {
        match self {
            VizError::UnsupportedColumn { column }
            | VizError::InvalidColumnType { column, .. }
            | VizError::ColumnNotFound { column } => column,
        }
    }
}

pub type Result<T> = std::result::Result<T, VizError>;
