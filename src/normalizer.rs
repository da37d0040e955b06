use crate::periods::{sort_period_keys, PeriodKeyResolver};
use crate::schema::{
    Granularity, PeriodEntry, PeriodKey, PeriodSeries, SiteStatistics, StatisticPeriodRecord,
    ValueKind,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Budget/Forecast/Actual series keyed by canonical period key, with every key present in all three.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedStatistics {
    pub budget_values: PeriodSeries,
    pub forecast_values: PeriodSeries,
    pub actual_values: PeriodSeries,
    /// Keys whose Actual entry is a zero-filled placeholder rather than a supplied record.
    #[serde(skip)]
    pub absent_actuals: BTreeSet<PeriodKey>,
}

impl NormalizedStatistics {
    pub fn series(&self, kind: ValueKind) -> &PeriodSeries {
        match kind {
            ValueKind::Budget => &self.budget_values,
            ValueKind::Forecast => &self.forecast_values,
            ValueKind::Actual => &self.actual_values,
        }
    }

    pub fn has_actual(&self, key: &str) -> bool {
        self.actual_values.contains_key(key) && !self.absent_actuals.contains(key)
    }

    /// Period keys in chronological order.
    pub fn period_keys(&self) -> Vec<PeriodKey> {
        let mut keys: Vec<PeriodKey> = self.budget_values.keys().cloned().collect();
        sort_period_keys(&mut keys);
        keys
    }
}

pub struct StatisticsNormalizer {
    resolver: PeriodKeyResolver,
    total_rooms: f64,
}

impl StatisticsNormalizer {
    pub fn new(granularity: Granularity, total_rooms: f64) -> Self {
        Self {
            resolver: PeriodKeyResolver::new(granularity),
            total_rooms,
        }
    }

    pub fn normalize(&self, statistics: &SiteStatistics) -> NormalizedStatistics {
        let mut budget = self.index_by_period(statistics.records(ValueKind::Budget));
        let mut forecast = self.index_by_period(statistics.records(ValueKind::Forecast));
        let mut actual = self.index_by_period(statistics.records(ValueKind::Actual));

        let all_keys: BTreeSet<PeriodKey> = budget
            .keys()
            .chain(forecast.keys())
            .chain(actual.keys())
            .cloned()
            .collect();
        let mut absent_actuals = BTreeSet::new();

        for key in &all_keys {
            let label = budget
                .get(key)
                .or_else(|| forecast.get(key))
                .or_else(|| actual.get(key))
                .map(|r| r.period_label.clone())
                .unwrap_or_default();

            // 1. Forecast defaults to budget, never to zero, when budget exists
            if !forecast.contains_key(key) {
                let fill = match budget.get(key) {
                    Some(record) => {
                        debug!("Forecast for {} borrowed from budget", key);
                        record.clone()
                    }
                    None => StatisticPeriodRecord::placeholder(key, &label),
                };
                forecast.insert(key.clone(), fill);
            }

            // 2. Remaining gaps become zero-valued placeholders
            if !budget.contains_key(key) {
                debug!("Budget for {} missing; zero-filled", key);
                budget.insert(key.clone(), StatisticPeriodRecord::placeholder(key, &label));
            }
            if !actual.contains_key(key) {
                debug!("Actual for {} missing; zero-filled", key);
                actual.insert(key.clone(), StatisticPeriodRecord::placeholder(key, &label));
                absent_actuals.insert(key.clone());
            }

            // 3. Rates are a planning input: forecast and actual borrow budget rates
            let budget_rates = budget.get(key).and_then(|r| r.rates.clone());
            for series in [&mut forecast, &mut actual] {
                if let Some(record) = series.get_mut(key) {
                    if record.rates.is_none() {
                        record.rates = budget_rates.clone();
                    }
                }
            }
        }

        for record in budget
            .values_mut()
            .chain(forecast.values_mut())
            .chain(actual.values_mut())
        {
            sync_occupancy(record, self.total_rooms);
        }

        NormalizedStatistics {
            budget_values: budget,
            forecast_values: forecast,
            actual_values: actual,
            absent_actuals,
        }
    }

    /// Every (key, label) pair found in the records, budget first.
    pub fn observed_periods(&self, statistics: &SiteStatistics) -> Vec<PeriodEntry> {
        ValueKind::ALL
            .iter()
            .flat_map(|kind| statistics.records(*kind))
            .map(|record| PeriodEntry {
                period_key: self.resolver.canonical_key(&record.period_start),
                display_label: record.period_label.clone(),
            })
            .collect()
    }

    fn index_by_period(&self, records: &[StatisticPeriodRecord]) -> PeriodSeries {
        let mut series = PeriodSeries::new();
        for record in records {
            let key = self.resolver.canonical_key(&record.period_start);
            if series.contains_key(&key) {
                debug!("Duplicate statistics record for {}; keeping the first", key);
                continue;
            }
            series.insert(key, record.clone());
        }
        series
    }
}

/// Keeps occupancy fraction and occupied-room count mutually derivable.
///
/// With no rooms available nothing can be derived; whatever is missing is reported as 0.
pub fn sync_occupancy(record: &mut StatisticPeriodRecord, total_rooms: f64) {
    if total_rooms <= 0.0 {
        record.occupancy.get_or_insert(0.0);
        record.occupied_rooms.get_or_insert(0.0);
        return;
    }

    match (record.occupancy, record.occupied_rooms) {
        (Some(occupancy), None) => {
            record.occupied_rooms = Some((occupancy * total_rooms).round());
        }
        (None, Some(occupied)) => {
            record.occupancy = Some(occupied / total_rooms);
        }
        (None, None) => {
            record.occupancy = Some(0.0);
            record.occupied_rooms = Some(0.0);
        }
        (Some(_), Some(_)) => {}
    }
}
