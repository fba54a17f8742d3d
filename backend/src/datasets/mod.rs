//! Built-in inspection datasets and the read-only dashboard state.
//!
//! The four datasets ship inside the binary (`backend/data/`). A data
//! directory can override any of them with a file of the same name.

pub mod view;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::api::logs::log_info;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{LongRecord, OutletRecord, StaggeredBlockLayout, WideTable};
use crate::parser::{decode_content, detect_delimiter, detect_encoding, parse_grid, parse_table};
use crate::transform::{extract_blocks, tidy_compound_table, TidyOptions, DEFAULT_ENTITY_COLUMN};

pub use view::{render, ChartSpec, KpiCard, ViewFilters, ViewModel, EMPTY_PLACEHOLDER};

const REGIONAL_CSV: &str = include_str!("../../data/regional.csv");
const OUTLET_CSV: &str = include_str!("../../data/outlet.csv");
const LOB_CSV: &str = include_str!("../../data/lob.csv");
const OUTLETS_BY_REGION_CSV: &str = include_str!("../../data/outlets_by_region.csv");

/// The dashboard's selectable datasets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Dataset {
    Regional,
    Outlet,
    Lob,
    OutletsByRegion,
}

impl Dataset {
    pub const ALL: [Dataset; 4] = [
        Dataset::Regional,
        Dataset::Outlet,
        Dataset::Lob,
        Dataset::OutletsByRegion,
    ];

    /// Identifier used on the command line and in URLs.
    pub fn slug(&self) -> &'static str {
        match self {
            Dataset::Regional => "regional",
            Dataset::Outlet => "outlet",
            Dataset::Lob => "lob",
            Dataset::OutletsByRegion => "outlets-by-region",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Dataset::Regional => "Regional Performance",
            Dataset::Outlet => "Outlet Performance",
            Dataset::Lob => "LOB Comparison",
            Dataset::OutletsByRegion => "Outlet Performance by Region",
        }
    }

    /// File name looked up in a data directory override.
    pub fn file_name(&self) -> &'static str {
        match self {
            Dataset::Regional => "regional.csv",
            Dataset::Outlet => "outlet.csv",
            Dataset::Lob => "lob.csv",
            Dataset::OutletsByRegion => "outlets_by_region.csv",
        }
    }

    fn embedded(&self) -> &'static str {
        match self {
            Dataset::Regional => REGIONAL_CSV,
            Dataset::Outlet => OUTLET_CSV,
            Dataset::Lob => LOB_CSV,
            Dataset::OutletsByRegion => OUTLETS_BY_REGION_CSV,
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Dataset {
    type Err = PipelineError;

    /// Accepts the slug or the title, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Dataset::ALL
            .into_iter()
            .find(|d| d.slug() == wanted || d.title().to_lowercase() == wanted)
            .ok_or_else(|| PipelineError::UnknownDataset(s.to_string()))
    }
}

/// Parsed base tables, built once and never mutated.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub regional: WideTable,
    pub outlet: WideTable,
    pub lob: WideTable,
    /// `lob` melted and classified.
    pub lob_records: Vec<LongRecord>,
    /// Outlet rows pulled out of the staggered file.
    pub outlets_by_region: Vec<OutletRecord>,
}

impl DashboardState {
    /// State from the embedded datasets.
    pub fn builtin() -> PipelineResult<Self> {
        Self::build(|dataset| Ok(dataset.embedded().to_string()))
    }

    /// State from `dir`, falling back to the embedded copy of any missing file.
    pub fn from_dir(dir: &Path) -> PipelineResult<Self> {
        Self::build(|dataset| {
            let path = dir.join(dataset.file_name());
            if !path.is_file() {
                return Ok(dataset.embedded().to_string());
            }
            log_info(format!("Loading {} from {}", dataset.title(), path.display()));
            let bytes = std::fs::read(&path).map_err(crate::error::CsvError::from)?;
            Ok(decode_content(&bytes, &detect_encoding(&bytes))?)
        })
    }

    fn build<F>(source: F) -> PipelineResult<Self>
    where
        F: Fn(Dataset) -> PipelineResult<String>,
    {
        let table = |dataset: Dataset| -> PipelineResult<WideTable> {
            let text = source(dataset)?;
            Ok(parse_table(&text, detect_delimiter(&text))?)
        };

        let regional = table(Dataset::Regional)?;
        let outlet = table(Dataset::Outlet)?;
        let lob = table(Dataset::Lob)?;
        let lob_records = tidy_compound_table(&lob, DEFAULT_ENTITY_COLUMN, &TidyOptions::default())?;

        let staggered = source(Dataset::OutletsByRegion)?;
        let grid = parse_grid(&staggered, detect_delimiter(&staggered))?;
        let outlets_by_region = extract_blocks(&grid, &StaggeredBlockLayout::default_outlets())?;

        Ok(Self {
            regional,
            outlet,
            lob,
            lob_records,
            outlets_by_region,
        })
    }

    /// Wide table shown for a dataset.
    pub fn table(&self, dataset: Dataset) -> Option<&WideTable> {
        match dataset {
            Dataset::Regional => Some(&self.regional),
            Dataset::Outlet => Some(&self.outlet),
            Dataset::Lob => Some(&self.lob),
            Dataset::OutletsByRegion => None,
        }
    }
}
