//! Period key resolution for the daily, weekly and monthly statistics views.
//!
//! Upstream feeds disagree on how a period is spelled ("2025-07-01T00:00:00Z",
//! "2025-07", "Q3 2025"). Every key is first reduced to one canonical form per
//! granularity, and windows are then ordered chronologically. Keys that cannot be
//! dated fall back to a literal string sort after all dated keys.

use crate::error::Result;
use crate::schema::{Granularity, PeriodEntry, PeriodKey};
use crate::utils::{
    add_months, day_label, days_in_month, first_day_of_month, format_year_month, month_label,
    parse_iso_date_prefix, parse_year_month, quarter_of_month, week_label,
};
use chrono::NaiveDate;
use log::debug;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PeriodSortKey {
    Dated(NaiveDate),
    Literal(String),
}

/// Parses a legacy quarter token "Q{n} {year}" into (quarter, year).
pub fn parse_quarter_key(key: &str) -> Option<(u32, i32)> {
    let mut parts = key.split_whitespace();
    let quarter_part = parts.next()?;
    let year_part = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let quarter: u32 = quarter_part
        .strip_prefix('Q')
        .or_else(|| quarter_part.strip_prefix('q'))?
        .parse()
        .ok()?;
    let year: i32 = year_part.parse().ok()?;

    (1..=4).contains(&quarter).then_some((quarter, year))
}

pub fn period_sort_key(key: &str) -> PeriodSortKey {
    if let Some(date) = parse_iso_date_prefix(key) {
        return PeriodSortKey::Dated(date);
    }
    if let Some((quarter, year)) = parse_quarter_key(key) {
        if let Some(date) = first_day_of_month(year, (quarter - 1) * 3 + 1) {
            return PeriodSortKey::Dated(date);
        }
    }
    if let Ok((year, month)) = parse_year_month(key) {
        if let Some(date) = first_day_of_month(year, month) {
            return PeriodSortKey::Dated(date);
        }
    }
    PeriodSortKey::Literal(key.to_string())
}

pub fn sort_period_keys(keys: &mut [PeriodKey]) {
    keys.sort_by_key(|k| period_sort_key(k));
}

pub struct PeriodKeyResolver {
    granularity: Granularity,
}

impl PeriodKeyResolver {
    pub fn new(granularity: Granularity) -> Self {
        Self { granularity }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Reduces any supported spelling of a period to the canonical key for this granularity.
    pub fn canonical_key(&self, raw: &str) -> PeriodKey {
        let trimmed = raw.trim();

        match self.granularity {
            Granularity::Daily | Granularity::Weekly => match parse_iso_date_prefix(trimmed) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => trimmed.to_string(),
            },
            Granularity::Monthly => {
                if let Some((quarter, year)) = parse_quarter_key(trimmed) {
                    format!("Q{} {}", quarter, year)
                } else if let Some(date) = parse_iso_date_prefix(trimmed) {
                    date.format("%Y-%m").to_string()
                } else if let Ok((year, month)) = parse_year_month(trimmed) {
                    format_year_month(year, month)
                } else {
                    trimmed.to_string()
                }
            }
        }
    }

    /// Resolves the ordered period window starting at `starting_month` ("YYYY-MM").
    ///
    /// `observed` carries the period keys and labels found in the budget/forecast/actual
    /// records; weekly keys and quarter tokens only ever come from there.
    pub fn resolve(
        &self,
        starting_month: &str,
        window_months: u32,
        observed: &[PeriodEntry],
    ) -> Result<Vec<PeriodEntry>> {
        let (year, month) = parse_year_month(starting_month)?;

        let entries = match self.granularity {
            Granularity::Daily => self.resolve_daily(year, month, window_months),
            Granularity::Weekly => self.resolve_weekly(observed),
            Granularity::Monthly => self.resolve_monthly(year, month, window_months, observed),
        };

        debug!(
            "Resolved {} {:?} periods from {}",
            entries.len(),
            self.granularity,
            starting_month
        );

        Ok(entries)
    }

    fn resolve_daily(&self, year: i32, month: u32, window_months: u32) -> Vec<PeriodEntry> {
        (0..window_months as i32)
            .map(|offset| add_months(year, month, offset))
            .flat_map(|(y, m)| days_in_month(y, m))
            .map(|date| PeriodEntry {
                period_key: date.format("%Y-%m-%d").to_string(),
                display_label: day_label(date),
            })
            .collect()
    }

    fn resolve_weekly(&self, observed: &[PeriodEntry]) -> Vec<PeriodEntry> {
        let mut entries = self.dedupe_observed(observed);
        entries.sort_by_key(|e| period_sort_key(&e.period_key));

        for entry in &mut entries {
            if entry.display_label.trim().is_empty() {
                entry.display_label = match parse_iso_date_prefix(&entry.period_key) {
                    Some(date) => week_label(date),
                    None => entry.period_key.clone(),
                };
            }
        }

        entries
    }

    fn resolve_monthly(
        &self,
        year: i32,
        month: u32,
        window_months: u32,
        observed: &[PeriodEntry],
    ) -> Vec<PeriodEntry> {
        let observed = self.dedupe_observed(observed);

        if observed
            .iter()
            .any(|e| parse_quarter_key(&e.period_key).is_some())
        {
            return resolve_quarters(year, month, observed);
        }

        let mut months: BTreeMap<PeriodSortKey, PeriodEntry> = BTreeMap::new();
        for entry in observed {
            months
                .entry(period_sort_key(&entry.period_key))
                .or_insert(entry);
        }

        for offset in 0..window_months as i32 {
            let (y, m) = add_months(year, month, offset);
            let key = format_year_month(y, m);
            months
                .entry(period_sort_key(&key))
                .or_insert_with(|| PeriodEntry {
                    period_key: key,
                    display_label: String::new(),
                });
        }

        months
            .into_values()
            .map(|mut entry| {
                if entry.display_label.trim().is_empty() {
                    entry.display_label = match parse_year_month(&entry.period_key) {
                        Ok((y, m)) => month_label(y, m),
                        Err(_) => entry.period_key.clone(),
                    };
                }
                entry
            })
            .collect()
    }

    fn dedupe_observed(&self, observed: &[PeriodEntry]) -> Vec<PeriodEntry> {
        let mut seen = HashSet::new();
        observed
            .iter()
            .filter_map(|entry| {
                let key = self.canonical_key(&entry.period_key);
                seen.insert(key.clone()).then(|| PeriodEntry {
                    period_key: key,
                    display_label: entry.display_label.clone(),
                })
            })
            .collect()
    }
}

/// Quarter mode: known quarters in chronological order, rotated to start at the
/// quarter containing the requested month. When that quarter is unknown the keys
/// are returned in literal string order.
fn resolve_quarters(year: i32, month: u32, observed: Vec<PeriodEntry>) -> Vec<PeriodEntry> {
    let mut quarters: Vec<PeriodEntry> = observed
        .into_iter()
        .filter(|e| parse_quarter_key(&e.period_key).is_some())
        .map(|mut e| {
            if e.display_label.trim().is_empty() {
                e.display_label = e.period_key.clone();
            }
            e
        })
        .collect();

    quarters.sort_by_key(|e| period_sort_key(&e.period_key));

    let wanted = (quarter_of_month(month), year);
    match quarters
        .iter()
        .position(|e| parse_quarter_key(&e.period_key) == Some(wanted))
    {
        Some(start) => {
            quarters.rotate_left(start);
        }
        None => {
            debug!(
                "Quarter Q{} {} not among known quarters; falling back to literal key order",
                wanted.0, wanted.1
            );
            quarters.sort_by(|a, b| a.period_key.cmp(&b.period_key));
        }
    }

    quarters
}
