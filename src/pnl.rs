use crate::schema::ValueKind;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PnlMonthDetail {
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: u32,
    pub external_revenue: f64,
    pub internal_revenue: f64,
    pub payroll: f64,
    pub claims: f64,
    pub parking_rents: f64,
    pub other_expense: f64,
    pub pteb: f64,
    pub insurance: f64,
    pub occupied_rooms: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PnlBySite {
    pub site_id: String,
    pub actual: Vec<PnlMonthDetail>,
    pub budget: Vec<PnlMonthDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<Vec<PnlMonthDetail>>,
}

impl PnlBySite {
    pub fn new(site_id: &str) -> Self {
        Self {
            site_id: site_id.to_string(),
            ..Self::default()
        }
    }

    pub fn details(&self, kind: ValueKind) -> &[PnlMonthDetail] {
        match kind {
            ValueKind::Actual => &self.actual,
            ValueKind::Budget => &self.budget,
            ValueKind::Forecast => self.forecast.as_deref().unwrap_or(&[]),
        }
    }

    pub fn details_mut(&mut self, kind: ValueKind) -> &mut Vec<PnlMonthDetail> {
        match kind {
            ValueKind::Actual => &mut self.actual,
            ValueKind::Budget => &mut self.budget,
            ValueKind::Forecast => self.forecast.get_or_insert_with(Vec::new),
        }
    }

    /// True when the site has no rows of any kind.
    pub fn is_empty(&self) -> bool {
        self.actual.is_empty()
            && self.budget.is_empty()
            && self.forecast.as_ref().map_or(true, Vec::is_empty)
    }

    pub fn sort_details(&mut self) {
        let by_month = |a: &PnlMonthDetail, b: &PnlMonthDetail| (a.year, a.month).cmp(&(b.year, b.month));
        self.actual.sort_by(by_month);
        self.budget.sort_by(by_month);
        if let Some(forecast) = self.forecast.as_mut() {
            forecast.sort_by(by_month);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PnlBySiteList {
    pub sites: Vec<PnlBySite>,
}

impl PnlBySiteList {
    pub fn site(&self, site_id: &str) -> Option<&PnlBySite> {
        self.sites.iter().find(|s| s.site_id == site_id)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(
            "Site,Kind,Year,Month,External Revenue,Internal Revenue,Payroll,Claims,Parking Rents,Other Expense,PTEB,Insurance,Occupied Rooms\n",
        );

        for site in &self.sites {
            for (kind, label) in [
                (ValueKind::Actual, "ACTUAL"),
                (ValueKind::Budget, "BUDGET"),
                (ValueKind::Forecast, "FORECAST"),
            ] {
                for d in site.details(kind) {
                    output.push_str(&format!(
                        "{},{},{},{},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{}\n",
                        site.site_id,
                        label,
                        d.year,
                        d.month,
                        d.external_revenue,
                        d.internal_revenue,
                        d.payroll,
                        d.claims,
                        d.parking_rents,
                        d.other_expense,
                        d.pteb,
                        d.insurance,
                        d.occupied_rooms
                    ));
                }
            }
        }

        output
    }
}

/// Merges per-year PnL results into one by-site view.
pub struct PnlAggregator;

type MonthRows = BTreeMap<(i32, u32), PnlMonthDetail>;

#[derive(Default)]
struct SiteRows {
    actual: MonthRows,
    budget: MonthRows,
    forecast: Option<MonthRows>,
}

impl PnlAggregator {
    /// Keyed by site, then value kind, months in order. A (year, month) already seen for a
    /// site and kind keeps its first row. Sites missing from a year contribute nothing for it.
    pub fn aggregate(results: Vec<(i32, PnlBySiteList)>) -> PnlBySiteList {
        let mut merged: BTreeMap<String, SiteRows> = BTreeMap::new();

        for (year, list) in results {
            debug!("Merging {} site(s) for {}", list.sites.len(), year);

            for site in list.sites {
                let rows = merged.entry(site.site_id.clone()).or_default();

                merge_rows(&mut rows.actual, year, site.actual);
                merge_rows(&mut rows.budget, year, site.budget);
                if let Some(forecast) = site.forecast {
                    merge_rows(rows.forecast.get_or_insert_with(BTreeMap::new), year, forecast);
                }
            }
        }

        PnlBySiteList {
            sites: merged
                .into_iter()
                .map(|(site_id, rows)| PnlBySite {
                    site_id,
                    actual: rows.actual.into_values().collect(),
                    budget: rows.budget.into_values().collect(),
                    forecast: rows.forecast.map(|f| f.into_values().collect()),
                })
                .collect(),
        }
    }
}

fn merge_rows(target: &mut MonthRows, year: i32, details: Vec<PnlMonthDetail>) {
    for mut detail in details {
        if detail.year == 0 {
            detail.year = year;
        }
        target.entry((detail.year, detail.month)).or_insert(detail);
    }
}
