use crate::data::{Column, Value};
use crate::ir::ColumnType;

/// Assign a semantic type from the declared kinds of the column's present values.
///
/// Numeric-looking text is not coerced: `Text("10")` makes a column categorical.
/// Booleans are labels too, so an all-`Boolean` column is categorical and a
/// line chart of it plots `true`/`false` codes rather than 0/1 values.
pub fn classify(column: &Column) -> ColumnType {
    let mut any_present = false;
    let mut any_label = false;

    for value in column.present() {
        any_present = true;
        match value {
            Value::Nested(_) => return ColumnType::Unsupported,
            Value::Text(_) | Value::Boolean(_) => any_label = true,
            Value::Integer(_) | Value::Float(_) | Value::Missing => {}
        }
    }

    if !any_present {
        ColumnType::Unsupported
    } else if any_label {
        ColumnType::Categorical
    } else {
        ColumnType::Numeric
    }
}
