//! Tidy reshaping of compound-label tables.
//!
//! Input rows are keyed by a compound label (`"iPhone (Pass)"`) and every
//! other column is a region:
//!
//! ```text
//! Result          Central  Northern        Result         Region    Product  Status  Count
//! iPhone (Pass)        20        45   →    iPhone (Pass)  Central   iPhone   Pass       20
//! iPhone (Fail)        45        56        iPhone (Pass)  Northern  iPhone   Pass       45
//!                                          ...
//! ```

use serde::{Deserialize, Serialize};

use super::label::{canonical_region, classify_compound_label, normalize_label};
use super::melt::{melt, MeltOptions};
use crate::error::TransformResult;
use crate::models::{LongRecord, WideTable};

/// Entity column used by the compound-label tables.
pub const DEFAULT_ENTITY_COLUMN: &str = "Result";

/// Options for [`tidy_compound_table`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TidyOptions {
    /// Remove aggregate `Total` columns before melting.
    #[serde(default = "default_true")]
    pub exclude_total: bool,

    /// Drop zero / missing counts.
    #[serde(default)]
    pub drop_zero: bool,

    /// Map region column names to their canonical spelling.
    #[serde(default = "default_true")]
    pub canonical_regions: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TidyOptions {
    fn default() -> Self {
        Self {
            exclude_total: true,
            drop_zero: false,
            canonical_regions: true,
        }
    }
}

/// Whether a column name denotes an aggregate column (`"Total"`, any case).
pub fn is_total_column(name: &str) -> bool {
    normalize_label(name).eq_ignore_ascii_case("total")
}

/// Melt a compound-label table on all region columns and classify each row.
///
/// The `Total` filter runs on the wide table: once melted, an aggregate
/// column is indistinguishable from a real region.
pub fn tidy_compound_table(
    table: &WideTable,
    entity_column: &str,
    options: &TidyOptions,
) -> TransformResult<Vec<LongRecord>> {
    table.require_column(entity_column)?;

    let filtered;
    let source = if options.exclude_total {
        filtered = table.without_columns(|h| h != entity_column && is_total_column(h));
        &filtered
    } else {
        table
    };

    let melt_options = MeltOptions {
        drop_zero: options.drop_zero,
    };

    let records = melt(source, entity_column, &melt_options)?
        .into_iter()
        .map(|record| {
            let (category, status) = classify_compound_label(&record.entity);
            let dimension = if options.canonical_regions {
                canonical_region(&record.dimension)
            } else {
                record.dimension.clone()
            };
            LongRecord {
                dimension,
                ..record
            }
            .with_labels(category, status)
        })
        .collect();

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use crate::models::Status;
    use crate::parser::parse_table;

    const LOB: &str = "\
Result,Central,Nothern,Sarawak ,Total
iPhone (Pass),20,45,23,88
iPhone (Fail),45,56,12,113
Apple Watch & iPhone (Pass),11,45,67,123
";

    #[test]
    fn test_tidy_classifies_and_excludes_total() {
        let table = parse_table(LOB, ',').unwrap();
        let records = tidy_compound_table(&table, DEFAULT_ENTITY_COLUMN, &TidyOptions::default()).unwrap();

        assert_eq!(records.len(), 9);
        assert!(records.iter().all(|r| r.dimension != "Total"));

        let first = &records[0];
        assert_eq!(first.entity, "iPhone (Pass)");
        assert_eq!(first.dimension, "Central");
        assert_eq!(first.category.as_deref(), Some("iPhone"));
        assert_eq!(first.status, Some(Status::Pass));
        assert_eq!(first.count, 20);

        let watch = &records[6];
        assert_eq!(watch.category.as_deref(), Some("Apple Watch & iPhone"));
    }

    #[test]
    fn test_region_names_canonicalized() {
        let table = parse_table(LOB, ',').unwrap();
        let records = tidy_compound_table(&table, DEFAULT_ENTITY_COLUMN, &TidyOptions::default()).unwrap();
        let regions: Vec<&str> = records.iter().take(3).map(|r| r.dimension.as_str()).collect();
        assert_eq!(regions, vec!["Central", "Northern", "Sarawak"]);
    }

    #[test]
    fn test_total_kept_when_requested() {
        let table = parse_table(LOB, ',').unwrap();
        let options = TidyOptions {
            exclude_total: false,
            canonical_regions: false,
            ..TidyOptions::default()
        };
        let records = tidy_compound_table(&table, DEFAULT_ENTITY_COLUMN, &options).unwrap();
        assert_eq!(records.len(), 12);
        assert_eq!(records[1].dimension, "Nothern");
        assert_eq!(records[3].dimension, "Total");
    }

    #[test]
    fn test_missing_result_column() {
        let table = parse_table("Label,Central\nx,1\n", ',').unwrap();
        let err = tidy_compound_table(&table, DEFAULT_ENTITY_COLUMN, &TidyOptions::default()).unwrap_err();
        assert!(matches!(err, TransformError::MissingColumn(c) if c == "Result"));
    }

    #[test]
    fn test_degenerate_label() {
        let table = parse_table("Result,Central\nNoParens,5\n", ',').unwrap();
        let records = tidy_compound_table(&table, DEFAULT_ENTITY_COLUMN, &TidyOptions::default()).unwrap();
        assert_eq!(records[0].category.as_deref(), Some("NoParens"));
        assert_eq!(records[0].status, Some(Status::Fail));
    }

    #[test]
    fn test_is_total_column() {
        assert!(is_total_column("Total"));
        assert!(is_total_column(" TOTAL "));
        assert!(!is_total_column("Total Headcount"));
    }
}
