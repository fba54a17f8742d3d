//! Headline figures shown above every view.

use serde::{Deserialize, Serialize};

use crate::error::TransformResult;
use crate::models::{LongRecord, OutletRecord, Status, WideTable};

/// Volume, pass and fail totals plus the pass rate (percent).
///
/// Totals saturate at `u64::MAX` instead of overflowing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_volume: u64,
    pub total_pass: u64,
    pub total_fail: u64,
    pub pass_rate: f64,
}

/// `pass / volume * 100`, or 0 when there is no volume.
pub fn pass_rate(pass: u64, volume: u64) -> f64 {
    if volume == 0 {
        0.0
    } else {
        pass as f64 / volume as f64 * 100.0
    }
}

impl Kpis {
    pub fn new(total_pass: u64, total_fail: u64, total_volume: u64) -> Self {
        Self {
            total_volume,
            total_pass,
            total_fail,
            pass_rate: pass_rate(total_pass, total_volume),
        }
    }

    /// KPIs of a wide table with pass and fail columns.
    ///
    /// The volume is the sum of `total_column` when given (a headcount may
    /// differ from pass + fail), otherwise pass + fail.
    pub fn from_wide(
        table: &WideTable,
        pass_column: &str,
        fail_column: &str,
        total_column: Option<&str>,
    ) -> TransformResult<Self> {
        let pass = table.column_sum(pass_column)?;
        let fail = table.column_sum(fail_column)?;
        let volume = match total_column {
            Some(column) => table.column_sum(column)?,
            None => pass.saturating_add(fail),
        };
        Ok(Self::new(pass, fail, volume))
    }

    /// KPIs of long records, counted by their (derived or dimension) status.
    pub fn from_records(records: &[LongRecord]) -> Self {
        let (pass, fail) = records
            .iter()
            .fold((0u64, 0u64), |(pass, fail), r| match r.effective_status() {
                Some(Status::Pass) => (pass.saturating_add(r.count), fail),
                Some(Status::Fail) => (pass, fail.saturating_add(r.count)),
                None => (pass, fail),
            });
        Self::new(pass, fail, pass.saturating_add(fail))
    }

    pub fn from_outlets(records: &[OutletRecord]) -> Self {
        let pass = records.iter().map(|r| r.pass).fold(0, u64::saturating_add);
        let fail = records.iter().map(|r| r.fail).fold(0, u64::saturating_add);
        Self::new(pass, fail, pass.saturating_add(fail))
    }

    /// Pass rate with one decimal, e.g. `"43.1%"`.
    pub fn pass_rate_display(&self) -> String {
        format!("{:.1}%", self.pass_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_table;

    #[test]
    fn test_regional_pass_rate() {
        let table = parse_table(
            "Region,Pass,Fail,Total\nCentral,48,84,132\nNorthern,64,64,128\n",
            ',',
        )
        .unwrap();
        let kpis = Kpis::from_wide(&table, "Pass", "Fail", Some("Total")).unwrap();

        assert_eq!(kpis.total_pass, 112);
        assert_eq!(kpis.total_fail, 148);
        assert_eq!(kpis.total_volume, 260);
        assert!((kpis.pass_rate - 43.0769).abs() < 0.001);
        assert_eq!(kpis.pass_rate_display(), "43.1%");
    }

    #[test]
    fn test_zero_volume_rate_is_zero() {
        assert_eq!(pass_rate(0, 0), 0.0);
        let kpis = Kpis::from_records(&[]);
        assert_eq!(kpis.pass_rate_display(), "0.0%");
    }

    #[test]
    fn test_from_records_uses_status() {
        let records = vec![
            LongRecord::new("iPhone (Pass)", "Central", 20).with_labels("iPhone", Status::Pass),
            LongRecord::new("iPhone (Fail)", "Central", 45).with_labels("iPhone", Status::Fail),
            LongRecord::new("Central", "Total", 999),
        ];
        let kpis = Kpis::from_records(&records);
        assert_eq!(kpis.total_pass, 20);
        assert_eq!(kpis.total_fail, 45);
        assert_eq!(kpis.total_volume, 65);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let table = parse_table(
            "Region,Pass,Fail\nCentral,18446744073709551615,0\nNorthern,1,0\n",
            ',',
        )
        .unwrap();
        let kpis = Kpis::from_wide(&table, "Pass", "Fail", None).unwrap();
        assert_eq!(kpis.total_pass, u64::MAX);
        assert_eq!(kpis.total_volume, u64::MAX);

        let records = vec![
            LongRecord::new("Central", "Pass", u64::MAX),
            LongRecord::new("Northern", "Pass", 1),
            LongRecord::new("Northern", "Fail", u64::MAX),
        ];
        let kpis = Kpis::from_records(&records);
        assert_eq!(kpis.total_pass, u64::MAX);
        assert_eq!(kpis.total_volume, u64::MAX);

        let outlet = |name: &str, count: u64| OutletRecord {
            outlet: name.into(),
            pass: count,
            fail: count,
            region: "Central".into(),
        };
        let outlets = vec![outlet("MT", u64::MAX), outlet("PY", 1)];
        assert_eq!(Kpis::from_outlets(&outlets).total_volume, u64::MAX);
        assert_eq!(outlets[0].total(), u64::MAX);
    }

    #[test]
    fn test_from_outlets() {
        let records = vec![OutletRecord {
            outlet: "MT".into(),
            pass: 4,
            fail: 2,
            region: "Central".into(),
        }];
        let kpis = Kpis::from_outlets(&records);
        assert_eq!(kpis.total_volume, 6);
        assert_eq!(kpis.pass_rate_display(), "66.7%");
    }
}
