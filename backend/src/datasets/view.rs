//! View models: one pure `render(state, filters)` call per interaction.
//!
//! A view model holds everything a presentation layer needs for one screen:
//! KPI cards, a bar chart description with its long-format data, and the
//! table to display. Drawing is someone else's job.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{DashboardState, Dataset};
use crate::error::PipelineResult;
use crate::models::{long_frame, outlet_frame, Frame, LongRecord, OutletRecord, Status, WideTable};
use crate::transform::{canonical_region, melt_columns, Kpis, MeltOptions};

/// Shown instead of a chart when the selection has no rows.
pub const EMPTY_PLACEHOLDER: &str = "No data available for the current selection.";

/// What the user picked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewFilters {
    pub dataset: Dataset,
    /// Keep only this region (ignored by datasets without regions).
    #[serde(default)]
    pub region: Option<String>,
    /// Leave zero counts out of the chart.
    #[serde(default)]
    pub drop_zero: bool,
}

impl ViewFilters {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            region: None,
            drop_zero: false,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    fn region_matches(&self, name: &str) -> bool {
        match &self.region {
            Some(wanted) => canonical_region(wanted) == canonical_region(name),
            None => true,
        }
    }
}

/// One headline number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KpiCard {
    pub label: String,
    pub value: String,
}

/// Bar chart description.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub title: String,
    pub x: String,
    pub y: String,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facet: Option<String>,
    /// `"group"` for side-by-side bars, `"relative"` for stacked.
    pub barmode: String,
    pub text_auto: bool,
    pub color_map: BTreeMap<String, String>,
    pub data: Frame,
}

impl ChartSpec {
    fn bars(title: &str, x: &str, data: Frame) -> Self {
        let color_map = [Status::Pass, Status::Fail]
            .iter()
            .map(|s| (s.to_string(), s.color().to_string()))
            .collect();

        Self {
            title: title.to_string(),
            x: x.to_string(),
            y: "Count".to_string(),
            color: "Status".to_string(),
            facet: None,
            barmode: "group".to_string(),
            text_auto: true,
            color_map,
            data,
        }
    }

    fn faceted(mut self, facet: &str) -> Self {
        self.facet = Some(facet.to_string());
        self.barmode = "relative".to_string();
        self.text_auto = false;
        self
    }
}

/// Everything needed to draw one dashboard screen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub dataset: Dataset,
    pub title: String,
    pub kpis: Kpis,
    pub kpi_cards: Vec<KpiCard>,
    pub chart: Option<ChartSpec>,
    pub table: Frame,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// Group digits by thousands: `12345` → `"12,345"`.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn kpi_cards(kpis: &Kpis) -> Vec<KpiCard> {
    let card = |label: &str, value: String| KpiCard {
        label: label.to_string(),
        value,
    };
    vec![
        card("Total Volume", format_thousands(kpis.total_volume)),
        card("Total Pass", format_thousands(kpis.total_pass)),
        card("Total Fail", format_thousands(kpis.total_fail)),
        card("Pass Rate", kpis.pass_rate_display()),
    ]
}

/// Build the view model for `filters`. Pure: `state` is only read.
pub fn render(state: &DashboardState, filters: &ViewFilters) -> PipelineResult<ViewModel> {
    let melt_options = MeltOptions {
        drop_zero: filters.drop_zero,
    };

    let (kpis, chart, table) = match filters.dataset {
        Dataset::Regional => {
            let table = filter_wide(&state.regional, "Region", filters)?;
            let kpis = Kpis::from_wide(&table, "Pass", "Fail", Some("Total Headcount"))?;
            let long = melt_columns(&table, "Region", &["Pass", "Fail"], &melt_options)?;
            let chart = ChartSpec::bars("Pass vs Fail by Region", "Region", long_frame(&long, "Region", "Status"));
            (kpis, chart, table.to_frame())
        }
        Dataset::Outlet => {
            let table = &state.outlet;
            let kpis = Kpis::from_wide(table, "Pass", "Fail", None)?;
            let long = melt_columns(table, "Outlet", &["Pass", "Fail"], &melt_options)?;
            let chart = ChartSpec::bars("Pass vs Fail by Outlet", "Outlet", long_frame(&long, "Outlet", "Status"));
            (kpis, chart, table.to_frame())
        }
        Dataset::Lob => {
            let records: Vec<LongRecord> = state
                .lob_records
                .iter()
                .filter(|r| filters.region_matches(&r.dimension))
                .cloned()
                .collect();
            let kpis = Kpis::from_records(&records);
            let shown: Vec<LongRecord> = records
                .iter()
                .filter(|r| !(filters.drop_zero && r.count == 0))
                .cloned()
                .collect();
            let chart = ChartSpec::bars("Product Performance by Region", "Product", lob_frame(&shown))
                .faceted("Region");
            (kpis, chart, lob_frame(&records))
        }
        Dataset::OutletsByRegion => {
            let records: Vec<OutletRecord> = state
                .outlets_by_region
                .iter()
                .filter(|r| filters.region_matches(&r.region))
                .cloned()
                .collect();
            let kpis = Kpis::from_outlets(&records);
            let chart = ChartSpec::bars(
                "Pass vs Fail by Outlet and Region",
                "Outlet",
                outlet_long_frame(&records, filters.drop_zero),
            )
            .faceted("Region");
            (kpis, chart, outlet_frame(&records))
        }
    };

    let placeholder = table.is_empty().then(|| EMPTY_PLACEHOLDER.to_string());
    let chart = if table.is_empty() { None } else { Some(chart) };

    Ok(ViewModel {
        dataset: filters.dataset,
        title: filters.dataset.title().to_string(),
        kpi_cards: kpi_cards(&kpis),
        kpis,
        chart,
        table,
        placeholder,
    })
}

fn filter_wide(table: &WideTable, region_column: &str, filters: &ViewFilters) -> PipelineResult<WideTable> {
    if filters.region.is_none() {
        return Ok(table.clone());
    }
    let idx = table.require_column(region_column)?;
    Ok(table.filter_rows(|row| filters.region_matches(&row[idx])))
}

/// LOB display columns: `Region, Product, Status, Count`.
fn lob_frame(records: &[LongRecord]) -> Frame {
    Frame::new()
        .with_column("Region", records.iter().map(|r| r.dimension.clone().into()).collect())
        .with_column(
            "Product",
            records
                .iter()
                .map(|r| r.category.clone().unwrap_or_default().into())
                .collect(),
        )
        .with_column(
            "Status",
            records
                .iter()
                .map(|r| r.status.map(|s| s.as_str()).unwrap_or_default().into())
                .collect(),
        )
        .with_column("Count", records.iter().map(|r| r.count.into()).collect())
}

/// Outlet rows as `Outlet, Status, Count, Region`, pass before fail.
fn outlet_long_frame(records: &[OutletRecord], drop_zero: bool) -> Frame {
    let rows: Vec<(&OutletRecord, Status, u64)> = records
        .iter()
        .flat_map(|r| [(r, Status::Pass, r.pass), (r, Status::Fail, r.fail)])
        .filter(|(_, _, count)| !(drop_zero && *count == 0))
        .collect();

    Frame::new()
        .with_column("Outlet", rows.iter().map(|(r, _, _)| r.outlet.clone().into()).collect())
        .with_column("Status", rows.iter().map(|(_, s, _)| s.as_str().into()).collect())
        .with_column("Count", rows.iter().map(|(_, _, c)| (*c).into()).collect())
        .with_column("Region", rows.iter().map(|(r, _, _)| r.region.clone().into()).collect())
}
