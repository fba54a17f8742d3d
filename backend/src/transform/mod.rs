//! Transformation module.
//!
//! - Melt: wide → long reshaping
//! - Label: compound label parsing, region name normalization
//! - Tidy: melt + classification of compound-label tables
//! - Extract: staggered block extraction, layout detection
//! - KPI: headline figures
//! - Pipeline: bytes/file → records orchestration

pub mod extract;
pub mod kpi;
pub mod label;
pub mod melt;
pub mod pipeline;
pub mod tidy;

pub use extract::{
    detect_layout, embed_blocks, extract_blocks, extract_blocks_with_report, BlockReport,
};
pub use kpi::{pass_rate, Kpis};
pub use label::{canonical_region, classify_compound_label, normalize_label, KNOWN_REGIONS};
pub use melt::{melt, melt_columns, MeltOptions};
pub use tidy::{is_total_column, tidy_compound_table, TidyOptions, DEFAULT_ENTITY_COLUMN};
