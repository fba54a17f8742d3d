//! REST API types.
//!
//! Every reshaping response carries a job id and a status (`"ready"`,
//! `"warning"` or `"error"`) so clients can treat all endpoints alike.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::datasets::{Dataset, ViewFilters};
use crate::error::PipelineResult;
use crate::models::{LongRecord, OutletRecord, StaggeredBlockLayout};
use crate::transform::pipeline::{CsvInfo, ExtractResult, ReshapeResult};
use crate::transform::{BlockReport, Kpis};

/// Response to `POST /api/tidy`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TidyResponse {
    pub job_id: String,
    pub status: String,
    pub records: Vec<LongRecord>,
    pub metadata: TidyMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TidyMetadata {
    pub total_records: usize,
    pub entity_column: String,
    pub kpis: Kpis,
    pub csv_info: CsvMetadata,
}

/// Response to `POST /api/extract`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub job_id: String,
    pub status: String,
    pub records: Vec<OutletRecord>,
    pub metadata: ExtractMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractMetadata {
    pub total_records: usize,
    pub layout: StaggeredBlockLayout,
    /// Registry layout used, if any
    pub layout_id: Option<String>,
    pub blocks: Vec<BlockReport>,
    pub kpis: Kpis,
    pub csv_info: CsvMetadata,
}

/// CSV file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl From<CsvInfo> for CsvMetadata {
    fn from(info: CsvInfo) -> Self {
        Self {
            encoding: info.encoding,
            delimiter: crate::transform::pipeline::format_delimiter(info.delimiter),
            row_count: info.row_count,
            columns: info.headers,
        }
    }
}

impl From<ReshapeResult> for TidyResponse {
    fn from(result: ReshapeResult) -> Self {
        let status = if result.records.is_empty() { "warning" } else { "ready" };
        TidyResponse {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            metadata: TidyMetadata {
                total_records: result.records.len(),
                entity_column: result.entity_column,
                kpis: result.kpis,
                csv_info: result.csv_info.into(),
            },
            records: result.records,
        }
    }
}

impl ExtractResponse {
    pub fn new(result: ExtractResult, layout_id: Option<String>) -> Self {
        // An empty block usually means the layout is off by a column.
        let status = if result.reports.iter().any(|r| r.kept == 0) {
            "warning"
        } else {
            "ready"
        };
        ExtractResponse {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            metadata: ExtractMetadata {
                total_records: result.records.len(),
                layout: result.layout,
                layout_id,
                blocks: result.reports,
                kpis: result.kpis,
                csv_info: result.csv_info.into(),
            },
            records: result.records,
        }
    }
}

/// One entry of `GET /api/datasets`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub id: String,
    pub title: String,
}

impl From<Dataset> for DatasetSummary {
    fn from(dataset: Dataset) -> Self {
        Self {
            id: dataset.slug().to_string(),
            title: dataset.title().to_string(),
        }
    }
}

/// Query string of `GET /api/view`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewQuery {
    /// Dataset slug or title; defaults to the regional view.
    pub dataset: Option<String>,
    pub region: Option<String>,
    #[serde(default)]
    pub drop_zero: bool,
}

impl ViewQuery {
    pub fn into_filters(self) -> PipelineResult<ViewFilters> {
        let dataset = match self.dataset.as_deref() {
            Some(name) => name.parse::<Dataset>()?,
            None => Dataset::Regional,
        };
        Ok(ViewFilters {
            dataset,
            region: self.region.filter(|r| !r.trim().is_empty()),
            drop_zero: self.drop_zero,
        })
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "records": [],
    })
}
