//! Wide-to-long reshaping.
//!
//! ```text
//! Region    Pass  Fail            Region    Status  Count
//! Central     48    84     →      Central   Pass       48
//! Northern    64    64            Central   Fail       84
//!                                 Northern  Pass       64
//!                                 Northern  Fail       64
//! ```

use serde::{Deserialize, Serialize};

use crate::error::TransformResult;
use crate::models::{parse_count, LongRecord, WideTable};

/// Options for [`melt`] and [`melt_columns`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeltOptions {
    /// Drop cells whose count is zero, missing or not a number.
    ///
    /// When false, such cells are kept with a count of 0.
    #[serde(default)]
    pub drop_zero: bool,
}

impl MeltOptions {
    pub fn drop_zero() -> Self {
        Self { drop_zero: true }
    }
}

/// Melt every column except `entity_column`.
pub fn melt(
    table: &WideTable,
    entity_column: &str,
    options: &MeltOptions,
) -> TransformResult<Vec<LongRecord>> {
    let value_columns: Vec<&str> = table
        .headers()
        .iter()
        .map(String::as_str)
        .filter(|h| *h != entity_column)
        .collect();

    melt_columns(table, entity_column, &value_columns, options)
}

/// Melt the given value columns, in the order supplied.
///
/// Rows are visited in input order and, within a row, value columns in the
/// order of `value_columns`, so identical input always gives identical
/// output. Every named column must exist.
pub fn melt_columns<S: AsRef<str>>(
    table: &WideTable,
    entity_column: &str,
    value_columns: &[S],
    options: &MeltOptions,
) -> TransformResult<Vec<LongRecord>> {
    let entity_idx = table.require_column(entity_column)?;
    let value_idx = value_columns
        .iter()
        .map(|name| Ok((name.as_ref(), table.require_column(name.as_ref())?)))
        .collect::<TransformResult<Vec<_>>>()?;

    let mut records = Vec::with_capacity(table.len() * value_idx.len());

    for row in table.rows() {
        let entity = &row[entity_idx];
        for &(dimension, idx) in &value_idx {
            let count = parse_count(&row[idx]);
            if options.drop_zero && count.unwrap_or(0) == 0 {
                continue;
            }
            records.push(LongRecord::new(entity.as_str(), dimension, count.unwrap_or(0)));
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use crate::parser::parse_table;

    fn regional() -> WideTable {
        parse_table(
            "Region,Pass,Fail,Total\nCentral,48,84,132\nNorthern,64,64,128\n",
            ',',
        )
        .unwrap()
    }

    #[test]
    fn test_melt_selected_columns() {
        let records = melt_columns(&regional(), "Region", &["Pass", "Fail"], &MeltOptions::default()).unwrap();

        assert_eq!(
            records,
            vec![
                LongRecord::new("Central", "Pass", 48),
                LongRecord::new("Central", "Fail", 84),
                LongRecord::new("Northern", "Pass", 64),
                LongRecord::new("Northern", "Fail", 64),
            ]
        );
    }

    #[test]
    fn test_melt_all_columns_by_default() {
        let records = melt(&regional(), "Region", &MeltOptions::default()).unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(records[2].dimension, "Total");
    }

    #[test]
    fn test_column_order_follows_request() {
        let records = melt_columns(&regional(), "Region", &["Fail", "Pass"], &MeltOptions::default()).unwrap();
        assert_eq!(records[0].dimension, "Fail");
        assert_eq!(records[1].dimension, "Pass");
    }

    #[test]
    fn test_malformed_cells_kept_as_zero() {
        let table = parse_table("Outlet,Pass,Fail\nMT,x,0\n", ',').unwrap();
        let records = melt(&table, "Outlet", &MeltOptions::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.count == 0));
    }

    #[test]
    fn test_drop_zero() {
        let table = parse_table("Outlet,Pass,Fail\nMT,4,0\nPY,,3\n", ',').unwrap();
        let records = melt(&table, "Outlet", &MeltOptions::drop_zero()).unwrap();
        assert_eq!(
            records,
            vec![LongRecord::new("MT", "Pass", 4), LongRecord::new("PY", "Fail", 3)]
        );
    }

    #[test]
    fn test_missing_entity_column() {
        let err = melt(&regional(), "Outlet", &MeltOptions::default()).unwrap_err();
        assert!(matches!(err, TransformError::MissingColumn(c) if c == "Outlet"));
    }

    #[test]
    fn test_missing_value_column() {
        let err = melt_columns(&regional(), "Region", &["Pass", "Pending"], &MeltOptions::default())
            .unwrap_err();
        assert!(matches!(err, TransformError::MissingColumn(c) if c == "Pending"));
    }

    #[test]
    fn test_empty_table_gives_no_records() {
        let table = parse_table("Region,Pass,Fail\n", ',').unwrap();
        let records = melt(&table, "Region", &MeltOptions::default()).unwrap();
        assert!(records.is_empty());
    }
}
