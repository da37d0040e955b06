use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical period identifier: "YYYY-MM-DD" (daily/weekly), "YYYY-MM" or "Q{n} {year}" (monthly).
pub type PeriodKey = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValueKind {
    Budget,
    Forecast,
    Actual,
}

impl ValueKind {
    pub const ALL: [ValueKind; 3] = [ValueKind::Budget, ValueKind::Forecast, ValueKind::Actual];

    pub fn parse_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "BUDGET" => Some(Self::Budget),
            "FORECAST" => Some(Self::Forecast),
            "ACTUAL" => Some(Self::Actual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

/// One value per Budget/Forecast/Actual stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ByValueKind<T> {
    pub budget: T,
    pub forecast: T,
    pub actual: T,
}

impl<T> ByValueKind<T> {
    pub fn get(&self, kind: ValueKind) -> &T {
        match kind {
            ValueKind::Budget => &self.budget,
            ValueKind::Forecast => &self.forecast,
            ValueKind::Actual => &self.actual,
        }
    }

    pub fn get_mut(&mut self, kind: ValueKind) -> &mut T {
        match kind {
            ValueKind::Budget => &mut self.budget,
            ValueKind::Forecast => &mut self.forecast,
            ValueKind::Actual => &mut self.actual,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(ValueKind, &T) -> U) -> ByValueKind<U> {
        ByValueKind {
            budget: f(ValueKind::Budget, &self.budget),
            forecast: f(ValueKind::Forecast, &self.forecast),
            actual: f(ValueKind::Actual, &self.actual),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PeriodEntry {
    pub period_key: PeriodKey,
    pub display_label: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RateSet {
    pub valet_rate_daily: f64,
    pub valet_rate_monthly: f64,
    pub valet_rate_overnight: f64,
    pub self_rate_daily: f64,
    pub self_rate_monthly: f64,
    pub self_rate_overnight: f64,
    pub base_revenue: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct StatisticPeriodRecord {
    #[schemars(description = "Period anchor as supplied upstream (ISO date, YYYY-MM or 'Q{n} {year}')")]
    pub period_start: String,
    pub period_label: String,

    #[schemars(description = "Occupancy as a 0-1 fraction")]
    pub occupancy: Option<f64>,
    pub occupied_rooms: Option<f64>,

    pub valet_daily: f64,
    pub valet_monthly: f64,
    pub valet_overnight: f64,
    pub valet_comps: f64,
    pub self_daily: f64,
    pub self_monthly: f64,
    pub self_overnight: f64,
    pub self_comps: f64,
    pub valet_aggregator: f64,
    pub self_aggregator: f64,

    #[schemars(description = "Fraction of occupied rooms generating an overnight parking event (0-1)")]
    pub drive_in_ratio: f64,
    #[schemars(description = "Fraction of overnight drive-ins retained as valet (0-1)")]
    pub capture_ratio: f64,

    pub rates: Option<RateSet>,
}

impl StatisticPeriodRecord {
    /// Zero-valued placeholder for a period with no data.
    pub fn placeholder(period_start: &str, period_label: &str) -> Self {
        Self {
            period_start: period_start.to_string(),
            period_label: period_label.to_string(),
            occupancy: Some(0.0),
            occupied_rooms: Some(0.0),
            ..Self::default()
        }
    }

    pub fn occupancy_value(&self) -> f64 {
        self.occupancy.unwrap_or(0.0)
    }

    pub fn occupied_rooms_value(&self) -> f64 {
        self.occupied_rooms.unwrap_or(0.0)
    }

    pub fn rate_set(&self) -> RateSet {
        self.rates.clone().unwrap_or_default()
    }
}

/// Statistics source payload for one site and starting month.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteStatistics {
    pub site_statistic_id: String,
    pub customer_site_id: String,
    pub total_rooms: f64,
    pub period_label: String,
    pub budget_data: Vec<StatisticPeriodRecord>,
    pub forecast_data: Vec<StatisticPeriodRecord>,
    pub actual_data: Vec<StatisticPeriodRecord>,
}

impl SiteStatistics {
    pub fn records(&self, kind: ValueKind) -> &[StatisticPeriodRecord] {
        match kind {
            ValueKind::Budget => &self.budget_data,
            ValueKind::Forecast => &self.forecast_data,
            ValueKind::Actual => &self.actual_data,
        }
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = schemars::schema_for!(SiteStatistics);
        serde_json::to_string_pretty(&schema)
    }
}

pub type PeriodSeries = BTreeMap<PeriodKey, StatisticPeriodRecord>;
