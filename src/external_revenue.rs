//! External (parking) revenue: volumes × rates plus overnight traffic derived from
//! drive-in and capture ratios.
//!
//! All terms are summed in full precision and rounded once to the nearest whole
//! currency unit.

use crate::normalizer::NormalizedStatistics;
use crate::schema::{ByValueKind, PeriodKey, RateSet, StatisticPeriodRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Damping applied to overnight volume variances in actual reconciliation.
pub const OVERNIGHT_ADJUSTMENT_FACTOR: f64 = 0.8;

pub type ExternalRevenueByPeriod = BTreeMap<PeriodKey, ByValueKind<f64>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvernightSplit {
    pub total: f64,
    pub valet: f64,
    pub self_park: f64,
}

pub fn split_overnight(drive_in_ratio: f64, capture_ratio: f64, occupied_rooms: f64) -> OvernightSplit {
    let total = drive_in_ratio * occupied_rooms;
    let self_park = if capture_ratio >= 1.0 {
        0.0
    } else {
        total * (1.0 - capture_ratio)
    };

    OvernightSplit {
        total,
        valet: total * capture_ratio,
        self_park,
    }
}

fn overnight_for(record: &StatisticPeriodRecord) -> OvernightSplit {
    split_overnight(
        record.drive_in_ratio,
        record.capture_ratio,
        record.occupied_rooms_value(),
    )
}

fn volume_revenue(record: &StatisticPeriodRecord, rates: &RateSet) -> f64 {
    let overnight = overnight_for(record);

    record.valet_daily * rates.valet_rate_daily
        + record.valet_monthly * rates.valet_rate_monthly
        + overnight.valet * rates.valet_rate_overnight
        + record.self_daily * rates.self_rate_daily
        + record.self_monthly * rates.self_rate_monthly
        + overnight.self_park * rates.self_rate_overnight
}

pub struct ExternalRevenueCalculator {
    available_rooms: f64,
}

impl ExternalRevenueCalculator {
    pub fn new(available_rooms: f64) -> Self {
        Self { available_rooms }
    }

    /// Budget/forecast revenue for one period.
    pub fn standard(&self, record: &StatisticPeriodRecord) -> f64 {
        volume_revenue(record, &record.rate_set()).round()
    }

    /// Actual revenue reconciled against the same period's budget: base revenue scaled by
    /// occupancy plus a damped overnight variance.
    pub fn actual_reconciliation(
        &self,
        actual: &StatisticPeriodRecord,
        budget: &StatisticPeriodRecord,
    ) -> f64 {
        let rates = actual.rate_set();
        let occupancy_factor = if self.available_rooms > 0.0 {
            actual.occupied_rooms_value() / self.available_rooms
        } else {
            1.0
        };

        let actual_overnight = overnight_for(actual);
        let budget_overnight = overnight_for(budget);
        let overnight_adjustment = (actual_overnight.self_park - budget_overnight.self_park)
            * rates.self_rate_daily
            * OVERNIGHT_ADJUSTMENT_FACTOR
            + (actual_overnight.valet - budget_overnight.valet)
                * rates.valet_rate_daily
                * OVERNIGHT_ADJUSTMENT_FACTOR;

        (volume_revenue(actual, &rates) + rates.base_revenue * occupancy_factor + overnight_adjustment)
            .round()
    }

    pub fn by_period(&self, normalized: &NormalizedStatistics) -> ExternalRevenueByPeriod {
        normalized
            .budget_values
            .iter()
            .map(|(key, budget)| {
                let forecast = normalized.forecast_values.get(key).unwrap_or(budget);
                // Zero-filled actuals are never reconciled
                let actual = match normalized.actual_values.get(key) {
                    Some(record) if normalized.has_actual(key) => {
                        self.actual_reconciliation(record, budget)
                    }
                    _ => 0.0,
                };

                (
                    key.clone(),
                    ByValueKind {
                        budget: self.standard(budget),
                        forecast: self.standard(forecast),
                        actual,
                    },
                )
            })
            .collect()
    }
}
