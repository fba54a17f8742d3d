//! Positional extraction of staggered sub-tables.
//!
//! Some source files hold several outlet tables pasted side by side, each
//! one starting a little lower than the previous:
//!
//! ```text
//! col:  0               1     2     3  4                5     6
//!       Central Region
//!       Outlet          Pass  Fail
//!       MT              4     2        Northern Region
//!       PY              5     3        Outlet           Pass  Fail
//!       Total           9     5        KL               7     1
//!                                      Total            7     1
//! ```
//!
//! A [`StaggeredBlockLayout`] says where each block begins. Every block is
//! sliced out by column, cleaned of sentinel rows and tagged with its label.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::label::canonical_region;
use crate::error::{TransformError, TransformResult};
use crate::models::{parse_count, BlockSpec, OutletRecord, RawGrid, StaggeredBlockLayout};

/// Entity-name substrings that mark aggregate or header rows (case-insensitive).
const SENTINELS: [&str; 2] = ["total", "region"];

/// Header cells such as `"East Coast Region"`.
static REGION_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\S.*?)\s+region\s*$").expect("region header pattern is valid")
});

/// Per-block outcome of an extraction.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockReport {
    pub label: String,
    pub offset: usize,
    pub kept: usize,
    pub blank: usize,
    pub sentinel: usize,
    pub non_numeric: usize,
}

impl BlockReport {
    pub fn dropped(&self) -> usize {
        self.blank + self.sentinel + self.non_numeric
    }
}

fn is_sentinel(name: &str) -> bool {
    let lower = name.to_lowercase();
    SENTINELS.iter().any(|s| lower.contains(s))
}

fn check_layout(layout: &StaggeredBlockLayout) -> TransformResult<()> {
    if layout.block_width < 3 {
        return Err(TransformError::InvalidLayout(format!(
            "block width {} is too small for name, pass and fail columns",
            layout.block_width
        )));
    }
    layout.check().map_err(TransformError::InvalidLayout)
}

/// Extract every block of `layout` from `grid`.
///
/// Output keeps layout order, then row order within each block. A block whose
/// offset lies beyond the grid yields no rows.
pub fn extract_blocks(
    grid: &RawGrid,
    layout: &StaggeredBlockLayout,
) -> TransformResult<Vec<OutletRecord>> {
    extract_blocks_with_report(grid, layout).map(|(records, _)| records)
}

/// Like [`extract_blocks`], also returning what happened to each block.
pub fn extract_blocks_with_report(
    grid: &RawGrid,
    layout: &StaggeredBlockLayout,
) -> TransformResult<(Vec<OutletRecord>, Vec<BlockReport>)> {
    check_layout(layout)?;

    let width = grid.width();
    let mut records = Vec::new();
    let mut reports = Vec::with_capacity(layout.blocks.len());

    for block in &layout.blocks {
        let region = canonical_region(&block.label);
        let mut report = BlockReport {
            label: region.clone(),
            offset: block.offset,
            ..BlockReport::default()
        };

        if block.offset >= width {
            reports.push(report);
            continue;
        }

        for row in 0..grid.row_count() {
            let name = grid.cell(row, block.offset).trim();
            if name.is_empty() {
                report.blank += 1;
                continue;
            }
            if is_sentinel(name) {
                report.sentinel += 1;
                continue;
            }

            let pass = parse_count(grid.cell(row, block.offset + 1));
            let fail = parse_count(grid.cell(row, block.offset + 2));
            match (pass, fail) {
                (Some(pass), Some(fail)) => {
                    report.kept += 1;
                    records.push(OutletRecord {
                        outlet: name.to_string(),
                        pass,
                        fail,
                        region: region.clone(),
                    });
                }
                _ => report.non_numeric += 1,
            }
        }

        reports.push(report);
    }

    Ok((records, reports))
}

/// Find blocks by scanning for `"<Name> Region"` header cells.
///
/// The first header found in a column starts a block at that column.
/// Blocks are ordered by column; a candidate overlapping an earlier block is
/// ignored.
pub fn detect_layout(grid: &RawGrid, block_width: usize) -> StaggeredBlockLayout {
    let mut candidates: Vec<BlockSpec> = Vec::new();

    for row in grid.rows() {
        for (col, cell) in row.iter().enumerate() {
            if candidates.iter().any(|b| b.offset == col) {
                continue;
            }
            if let Some(caps) = REGION_HEADER.captures(cell) {
                candidates.push(BlockSpec::new(col, canonical_region(&caps[1])));
            }
        }
    }

    candidates.sort_by_key(|b| b.offset);

    let mut blocks: Vec<BlockSpec> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let clear = blocks
            .last()
            .map_or(true, |prev| candidate.offset >= prev.offset + block_width);
        if clear {
            blocks.push(candidate);
        }
    }

    StaggeredBlockLayout {
        block_width,
        blocks,
    }
}

/// Lay extracted records back out as a staggered grid.
///
/// Each block gets a `"<Label> Region"` header, an `Outlet, Pass, Fail`
/// sub-header, its rows and a `Total` row. Every block starts two rows below
/// the previous one.
pub fn embed_blocks(
    records: &[OutletRecord],
    layout: &StaggeredBlockLayout,
) -> TransformResult<RawGrid> {
    check_layout(layout)?;

    let mut grid = RawGrid::default();

    for (i, block) in layout.blocks.iter().enumerate() {
        let region = canonical_region(&block.label);
        let top = i * 2;
        let col = block.offset;

        grid.set(top, col, format!("{} Region", region));
        grid.set(top + 1, col, "Outlet");
        grid.set(top + 1, col + 1, "Pass");
        grid.set(top + 1, col + 2, "Fail");

        let mut row = top + 2;
        let (mut pass_total, mut fail_total) = (0u64, 0u64);
        for record in records.iter().filter(|r| r.region == region) {
            grid.set(row, col, record.outlet.clone());
            grid.set(row, col + 1, record.pass.to_string());
            grid.set(row, col + 2, record.fail.to_string());
            pass_total = pass_total.saturating_add(record.pass);
            fail_total = fail_total.saturating_add(record.fail);
            row += 1;
        }

        grid.set(row, col, "Total");
        grid.set(row, col + 1, pass_total.to_string());
        grid.set(row, col + 2, fail_total.to_string());
    }

    Ok(grid)
}
