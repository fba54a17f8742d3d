//! Domain models for the Passboard reshaping pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Status`] - Pass/Fail inspection outcome
//! - [`LongRecord`] - one tidy (entity, dimension, count) observation
//! - [`OutletRecord`] - one surviving row of a staggered outlet block
//! - [`BlockSpec`] / [`StaggeredBlockLayout`] - where sub-tables sit in a raw grid
//! - [`WideTable`], [`RawGrid`], [`Frame`] - tabular containers (see [`table`])

pub mod table;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use table::{parse_count, Frame, RawGrid, WideTable};

// =============================================================================
// Inspection Status
// =============================================================================

/// Outcome of a quality inspection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Status {
    Pass,
    Fail,
}

impl Status {
    /// Interpret a dimension name such as `"Pass"` or `"fail"` as a status.
    pub fn from_dimension(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "pass" => Some(Status::Pass),
            "fail" => Some(Status::Fail),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "Pass",
            Status::Fail => "Fail",
        }
    }

    /// Chart colour used for this status.
    pub fn color(&self) -> &'static str {
        match self {
            Status::Pass => "#00CC96",
            Status::Fail => "#EF553B",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Long (tidy) records
// =============================================================================

/// One observation of a long-format table.
///
/// `category` and `status` are only filled in when the entity is a compound
/// label such as `"iPhone (Pass)"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LongRecord {
    pub entity: String,
    pub dimension: String,
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl LongRecord {
    pub fn new(entity: impl Into<String>, dimension: impl Into<String>, count: u64) -> Self {
        Self {
            entity: entity.into(),
            dimension: dimension.into(),
            count,
            category: None,
            status: None,
        }
    }

    pub fn with_labels(mut self, category: impl Into<String>, status: Status) -> Self {
        self.category = Some(category.into());
        self.status = Some(status);
        self
    }

    /// Status of this record: the derived one if present, otherwise the
    /// dimension read as `Pass`/`Fail`.
    pub fn effective_status(&self) -> Option<Status> {
        self.status.or_else(|| Status::from_dimension(&self.dimension))
    }
}

/// Build a column-ordered frame from long records.
///
/// `entity_name` and `dimension_name` label the first two columns (for
/// example `Region` / `Status`). Derived columns are only added when at
/// least one record carries them.
pub fn long_frame(records: &[LongRecord], entity_name: &str, dimension_name: &str) -> Frame {
    let mut frame = Frame::new()
        .with_column(entity_name, records.iter().map(|r| r.entity.clone().into()).collect())
        .with_column(dimension_name, records.iter().map(|r| r.dimension.clone().into()).collect());

    if records.iter().any(|r| r.category.is_some()) {
        frame = frame.with_column(
            "Product",
            records
                .iter()
                .map(|r| r.category.clone().unwrap_or_default().into())
                .collect(),
        );
    }
    if records.iter().any(|r| r.status.is_some()) {
        frame = frame.with_column(
            "Status",
            records
                .iter()
                .map(|r| r.status.map(|s| s.as_str()).unwrap_or_default().into())
                .collect(),
        );
    }

    frame.with_column("Count", records.iter().map(|r| r.count.into()).collect())
}

// =============================================================================
// Staggered block extraction
// =============================================================================

/// One row of an outlet sub-table pulled out of a staggered grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct OutletRecord {
    pub outlet: String,
    pub pass: u64,
    pub fail: u64,
    pub region: String,
}

impl OutletRecord {
    pub fn total(&self) -> u64 {
        self.pass.saturating_add(self.fail)
    }
}

/// Frame with the columns `Outlet, Pass, Fail, Region`.
pub fn outlet_frame(records: &[OutletRecord]) -> Frame {
    Frame::new()
        .with_column("Outlet", records.iter().map(|r| r.outlet.clone().into()).collect())
        .with_column("Pass", records.iter().map(|r| r.pass.into()).collect())
        .with_column("Fail", records.iter().map(|r| r.fail.into()).collect())
        .with_column("Region", records.iter().map(|r| r.region.clone().into()).collect())
}

/// Where one logical sub-table starts inside a raw grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockSpec {
    /// Zero-based index of the block's first (entity name) column.
    pub offset: usize,
    /// Label attached to every row of the block, e.g. a region name.
    pub label: String,
}

impl BlockSpec {
    pub fn new(offset: usize, label: impl Into<String>) -> Self {
        Self {
            offset,
            label: label.into(),
        }
    }
}

/// Default width of an outlet block: name, pass count, fail count.
pub const DEFAULT_BLOCK_WIDTH: usize = 3;

fn default_block_width() -> usize {
    DEFAULT_BLOCK_WIDTH
}

/// A set of non-overlapping blocks of equal width.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StaggeredBlockLayout {
    #[serde(default = "default_block_width")]
    pub block_width: usize,
    pub blocks: Vec<BlockSpec>,
}

impl StaggeredBlockLayout {
    pub fn new(blocks: Vec<BlockSpec>) -> Self {
        Self {
            block_width: DEFAULT_BLOCK_WIDTH,
            blocks,
        }
    }

    /// The fixed layout of the bundled outlets-by-region file.
    pub fn default_outlets() -> Self {
        Self::new(vec![
            BlockSpec::new(0, "Central"),
            BlockSpec::new(4, "Northern"),
            BlockSpec::new(8, "Southern"),
            BlockSpec::new(12, "East Coast"),
            BlockSpec::new(16, "Sabah"),
            BlockSpec::new(20, "Sarawak"),
        ])
    }

    /// Check that the width is usable and no two blocks share a column.
    pub fn check(&self) -> Result<(), String> {
        if self.block_width == 0 {
            return Err("block width must be at least 1".to_string());
        }

        let mut spans: Vec<(usize, &str)> = self
            .blocks
            .iter()
            .map(|b| (b.offset, b.label.as_str()))
            .collect();
        spans.sort_by_key(|(offset, _)| *offset);

        for pair in spans.windows(2) {
            let (first, first_label) = pair[0];
            let (second, second_label) = pair[1];
            if second < first + self.block_width {
                return Err(format!(
                    "blocks '{}' (column {}) and '{}' (column {}) overlap",
                    first_label, first, second_label, second
                ));
            }
        }

        Ok(())
    }

    pub fn labels(&self) -> Vec<String> {
        self.blocks.iter().map(|b| b.label.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_dimension() {
        assert_eq!(Status::from_dimension("Pass"), Some(Status::Pass));
        assert_eq!(Status::from_dimension(" fail "), Some(Status::Fail));
        assert_eq!(Status::from_dimension("Total"), None);
    }

    #[test]
    fn test_effective_status_prefers_derived_label() {
        let record = LongRecord::new("iPhone (Pass)", "Central", 20).with_labels("iPhone", Status::Pass);
        assert_eq!(record.effective_status(), Some(Status::Pass));

        let plain = LongRecord::new("Central", "Fail", 84);
        assert_eq!(plain.effective_status(), Some(Status::Fail));
    }

    #[test]
    fn test_long_frame_columns() {
        let records = vec![
            LongRecord::new("Central", "Pass", 48),
            LongRecord::new("Central", "Fail", 84),
        ];
        let frame = long_frame(&records, "Region", "Status");
        assert_eq!(frame.names(), vec!["Region", "Status", "Count"]);
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn test_long_frame_with_derived_labels() {
        let records = vec![LongRecord::new("Mac (Fail)", "Sabah", 6).with_labels("Mac", Status::Fail)];
        let frame = long_frame(&records, "Result", "Region");
        assert_eq!(frame.names(), vec!["Result", "Region", "Product", "Status", "Count"]);
    }

    #[test]
    fn test_default_layout_is_valid() {
        let layout = StaggeredBlockLayout::default_outlets();
        assert!(layout.check().is_ok());
        assert_eq!(layout.blocks.len(), 6);
    }

    #[test]
    fn test_overlapping_layout_rejected() {
        let layout = StaggeredBlockLayout::new(vec![BlockSpec::new(0, "A"), BlockSpec::new(2, "B")]);
        let err = layout.check().unwrap_err();
        assert!(err.contains("overlap"));
    }

    #[test]
    fn test_layout_json_defaults_width() {
        let layout: StaggeredBlockLayout =
            serde_json::from_str(r#"{"blocks":[{"offset":0,"label":"Central"}]}"#).unwrap();
        assert_eq!(layout.block_width, 3);
    }
}
