use crate::config::RatioScale;
use crate::pnl::{PnlBySite, PnlBySiteList, PnlMonthDetail};
use crate::schema::{SiteStatistics, StatisticPeriodRecord, ValueKind};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-site monthly row as returned by the PnL/statistics-by-year source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPnlRow {
    pub site_id: String,
    pub year: i32,
    pub month: u32,
    /// "ACTUAL", "BUDGET" or "FORECAST".
    pub value_type: String,
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

fn scale_ratio(value: f64, scale: RatioScale) -> f64 {
    match scale {
        RatioScale::Fraction => value,
        RatioScale::Percent => value / 100.0,
    }
}

fn scale_record(record: &mut StatisticPeriodRecord, scale: RatioScale) {
    record.occupancy = record.occupancy.map(|o| scale_ratio(o, scale));
    record.drive_in_ratio = scale_ratio(record.drive_in_ratio, scale);
    record.capture_ratio = scale_ratio(record.capture_ratio, scale);
}

/// Brings a statistics feed onto 0-1 ratios.
pub fn ingest_site_statistics(mut raw: SiteStatistics, scale: RatioScale) -> SiteStatistics {
    if scale == RatioScale::Percent {
        debug!(
            "Scaling percentage ratios down for site {}",
            raw.customer_site_id
        );
    }

    for record in raw
        .budget_data
        .iter_mut()
        .chain(raw.forecast_data.iter_mut())
        .chain(raw.actual_data.iter_mut())
    {
        scale_record(record, scale);
    }

    raw
}

pub fn rows_to_pnl_by_site_list(rows: &[RawPnlRow], include_forecast: bool) -> PnlBySiteList {
    let mut sites: BTreeMap<String, PnlBySite> = BTreeMap::new();

    for row in rows {
        let Some(kind) = ValueKind::parse_tag(&row.value_type) else {
            debug!(
                "Skipping PnL row for site {} with unknown value type '{}'",
                row.site_id, row.value_type
            );
            continue;
        };
        if kind == ValueKind::Forecast && !include_forecast {
            continue;
        }

        let site = sites
            .entry(row.site_id.clone())
            .or_insert_with(|| PnlBySite::new(&row.site_id));

        site.details_mut(kind).push(PnlMonthDetail {
            year: row.year,
            month: row.month,
            external_revenue: row.external_revenue,
            internal_revenue: row.internal_revenue,
            payroll: row.payroll,
            claims: row.claims,
            parking_rents: row.parking_rents,
            other_expense: row.other_expense,
            pteb: row.pteb,
            insurance: row.insurance,
            occupied_rooms: row.occupied_rooms,
        });
    }

    PnlBySiteList {
        sites: sites
            .into_values()
            .map(|mut site| {
                site.sort_details();
                site
            })
            .collect(),
    }
}
