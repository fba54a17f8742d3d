//! # Passboard - tidy reshaping for pass/fail inspection dashboards
//!
//! Passboard turns the spreadsheets behind an inspection dashboard into
//! long-format records that a charting layer can consume directly.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│    Transform    │────▶│  Long JSON  │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (melt, extract) │     │ + view model│
//! └─────────────┘     └─────────────┘     └─────────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use passboard::{classify_compound_label, melt, parse_table, MeltOptions, Status};
//!
//! let table = parse_table("Region,Pass,Fail\nCentral,48,84\n", ',').unwrap();
//! let records = melt(&table, "Region", &MeltOptions::default()).unwrap();
//! assert_eq!(records.len(), 2);
//!
//! let (product, status) = classify_compound_label("iPhone (Fail)");
//! assert_eq!(product, "iPhone");
//! assert_eq!(status, Status::Fail);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Tables, long records, outlet records, block layouts
//! - [`parser`] - CSV parsing with encoding and delimiter detection
//! - [`transform`] - Melt, label classification, block extraction, pipeline
//! - [`datasets`] - Built-in datasets and dashboard view models
//! - [`validation`] - JSON Schema validation
//! - [`cache`] - Shared dashboard state and layout registry
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Dashboard
pub mod datasets;

// Validation
pub mod validation;

// Caching
pub mod cache;

pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CsvError, CsvResult, PipelineError, PipelineResult, RegistryError, RegistryResult,
    ServerError, TransformError, TransformResult, ValidationError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    long_frame, outlet_frame, parse_count, BlockSpec, Frame, LongRecord, OutletRecord, RawGrid,
    StaggeredBlockLayout, Status, WideTable, DEFAULT_BLOCK_WIDTH,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_file_auto,
    parse_grid, parse_grid_bytes_auto, parse_grid_file_auto, parse_table, GridParseResult,
    ParseResult,
};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    canonical_region, classify_compound_label, detect_layout, embed_blocks, extract_blocks,
    extract_blocks_with_report, melt, melt_columns, tidy_compound_table, BlockReport, Kpis,
    MeltOptions, TidyOptions,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline;
pub use transform::pipeline::{
    extract_bytes, extract_csv, reshape_bytes, reshape_csv, CsvInfo, ExtractResult, LayoutSource,
    ReshapeOptions, ReshapeResult,
};

// =============================================================================
// Re-exports - Dashboard, registry, config
// =============================================================================

pub use cache::{shared_state, LayoutRegistry, StoredLayout};
pub use config::Config;
pub use datasets::{render, DashboardState, Dataset, ViewFilters, ViewModel};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
