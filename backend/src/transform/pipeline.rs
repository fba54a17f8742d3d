//! High-level pipeline API: bytes or file → table → long records.
//!
//! These functions combine parsing, reshaping and KPI aggregation and log
//! each step through the broadcaster in [`crate::api::logs`].
//!
//! # Example
//!
//! ```rust,ignore
//! use passboard::pipeline::{reshape_csv, ReshapeOptions};
//! use std::path::Path;
//!
//! let result = reshape_csv(Path::new("lob.csv"), &ReshapeOptions::compound())?;
//! println!("{} records, pass rate {}", result.records.len(), result.kpis.pass_rate_display());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::extract::{detect_layout, extract_blocks_with_report, BlockReport};
use super::kpi::Kpis;
use super::melt::{melt, melt_columns, MeltOptions};
use super::tidy::{tidy_compound_table, TidyOptions, DEFAULT_ENTITY_COLUMN};
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{LongRecord, OutletRecord, StaggeredBlockLayout, DEFAULT_BLOCK_WIDTH};
use crate::parser::{parse_bytes_auto, parse_grid_bytes_auto, GridParseResult, ParseResult};

// =============================================================================
// Options
// =============================================================================

/// Options for [`reshape_bytes`] / [`reshape_csv`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReshapeOptions {
    /// Entity column; defaults to `Result` for compound tables, otherwise the
    /// first column.
    #[serde(default)]
    pub entity_column: Option<String>,

    /// Columns to melt; defaults to every other column.
    #[serde(default)]
    pub value_columns: Option<Vec<String>>,

    /// Treat the entity as a `"<Product> (<Status>)"` label.
    #[serde(default)]
    pub compound_labels: bool,

    /// Keep aggregate `Total` columns (compound tables only).
    #[serde(default)]
    pub keep_total: bool,

    #[serde(default)]
    pub drop_zero: bool,
}

impl ReshapeOptions {
    pub fn compound() -> Self {
        Self {
            compound_labels: true,
            ..Self::default()
        }
    }
}

/// How the extractor finds its blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutSource {
    /// Scan the grid for `"<Name> Region"` headers.
    Detect {
        #[serde(default = "default_block_width")]
        block_width: usize,
    },
    /// Use the given offsets as they are.
    Fixed { layout: StaggeredBlockLayout },
}

fn default_block_width() -> usize {
    DEFAULT_BLOCK_WIDTH
}

impl Default for LayoutSource {
    fn default() -> Self {
        LayoutSource::Detect {
            block_width: DEFAULT_BLOCK_WIDTH,
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Source file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Output of a reshape run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReshapeResult {
    pub records: Vec<LongRecord>,
    pub kpis: Kpis,
    pub entity_column: String,
    pub csv_info: CsvInfo,
}

/// Output of an extraction run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResult {
    pub records: Vec<OutletRecord>,
    pub reports: Vec<BlockReport>,
    pub layout: StaggeredBlockLayout,
    pub kpis: Kpis,
    pub csv_info: CsvInfo,
}

// =============================================================================
// Reshape
// =============================================================================

/// Reshape a wide CSV file into long records.
pub fn reshape_csv(path: &Path, options: &ReshapeOptions) -> PipelineResult<ReshapeResult> {
    log_info(format!("📖 Reading {}", path.display()));
    let bytes = std::fs::read(path).map_err(crate::error::CsvError::from)?;
    reshape_bytes(&bytes, options)
}

/// Reshape wide CSV bytes into long records.
pub fn reshape_bytes(bytes: &[u8], options: &ReshapeOptions) -> PipelineResult<ReshapeResult> {
    let parsed = parse_bytes_auto(bytes)?;
    reshape_parsed(parsed, options)
}

fn reshape_parsed(parsed: ParseResult, options: &ReshapeOptions) -> PipelineResult<ReshapeResult> {
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(parsed.delimiter)));
    log_success(format!("Read {} rows", parsed.table.len()));

    let csv_info = CsvInfo {
        encoding: parsed.encoding.clone(),
        delimiter: parsed.delimiter,
        headers: parsed.headers().to_vec(),
        row_count: parsed.table.len(),
    };

    if parsed.table.is_empty() {
        log_warning("Table has no data rows");
    }

    let table = &parsed.table;
    let entity_column = match &options.entity_column {
        Some(column) => column.clone(),
        None if options.compound_labels => DEFAULT_ENTITY_COLUMN.to_string(),
        None => table.headers().first().cloned().unwrap_or_default(),
    };

    log_info(format!("🔄 Melting on entity column '{}'", entity_column));

    let records = if options.compound_labels {
        let tidy = TidyOptions {
            exclude_total: !options.keep_total,
            drop_zero: options.drop_zero,
            ..TidyOptions::default()
        };
        tidy_compound_table(table, &entity_column, &tidy)?
    } else {
        let melt_options = MeltOptions {
            drop_zero: options.drop_zero,
        };
        match &options.value_columns {
            Some(columns) => melt_columns(table, &entity_column, columns, &melt_options)?,
            None => melt(table, &entity_column, &melt_options)?,
        }
    };

    log_success(format!("Generated {} long records", records.len()));

    let kpis = Kpis::from_records(&records);
    log_info(format!(
        "Pass {} / Fail {} / rate {}",
        kpis.total_pass,
        kpis.total_fail,
        kpis.pass_rate_display()
    ));

    Ok(ReshapeResult {
        records,
        kpis,
        entity_column,
        csv_info,
    })
}

// =============================================================================
// Extract
// =============================================================================

/// Extract staggered outlet blocks from a CSV file.
pub fn extract_csv(path: &Path, source: &LayoutSource) -> PipelineResult<ExtractResult> {
    log_info(format!("📖 Reading {}", path.display()));
    let bytes = std::fs::read(path).map_err(crate::error::CsvError::from)?;
    extract_bytes(&bytes, source)
}

/// Extract staggered outlet blocks from CSV bytes.
pub fn extract_bytes(bytes: &[u8], source: &LayoutSource) -> PipelineResult<ExtractResult> {
    let parsed = parse_grid_bytes_auto(bytes)?;
    extract_parsed(parsed, source)
}

fn extract_parsed(parsed: GridParseResult, source: &LayoutSource) -> PipelineResult<ExtractResult> {
    let grid = &parsed.grid;
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(parsed.delimiter)));
    log_success(format!("Read {} rows x {} columns", grid.row_count(), grid.width()));

    let layout = match source {
        LayoutSource::Fixed { layout } => {
            log_info(format!("Using fixed layout with {} blocks", layout.blocks.len()));
            layout.clone()
        }
        LayoutSource::Detect { block_width } => {
            log_info("🔍 Scanning for '<Name> Region' headers...");
            let layout = detect_layout(grid, *block_width);
            if layout.blocks.is_empty() {
                return Err(PipelineError::NoLayout);
            }
            log_success(format!("Detected {} blocks", layout.blocks.len()));
            layout
        }
    };

    for block in &layout.blocks {
        log_info_indent(format!("[col {:2}] {}", block.offset, block.label), 1);
    }

    let (records, reports) = extract_blocks_with_report(grid, &layout)?;

    for report in &reports {
        if report.kept == 0 {
            log_warning(format!("Block '{}' (col {}) is empty", report.label, report.offset));
        } else {
            log_info_indent(
                format!(
                    "{}: {} rows kept, {} sentinel, {} non-numeric",
                    report.label, report.kept, report.sentinel, report.non_numeric
                ),
                1,
            );
        }
    }
    log_success(format!("Extracted {} outlet rows", records.len()));

    let kpis = Kpis::from_outlets(&records);
    let csv_info = CsvInfo {
        encoding: parsed.encoding.clone(),
        delimiter: parsed.delimiter,
        headers: Vec::new(),
        row_count: grid.row_count(),
    };

    Ok(ExtractResult {
        records,
        reports,
        layout,
        kpis,
        csv_info,
    })
}

/// Sum of counts per entity, in first-seen order.
pub fn totals_by_entity(records: &[LongRecord]) -> Vec<(String, u64)> {
    let mut order: Vec<String> = Vec::new();
    let mut sums: BTreeMap<String, u64> = BTreeMap::new();
    for record in records {
        let sum = sums.entry(record.entity.clone()).or_insert_with(|| {
            order.push(record.entity.clone());
            0
        });
        *sum = sum.saturating_add(record.count);
    }
    order
        .into_iter()
        .map(|entity| {
            let total = sums.get(&entity).copied().unwrap_or(0);
            (entity, total)
        })
        .collect()
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
