//! # Parking Billing Engine
//!
//! Revenue reconciliation and contract calculation for parking-facility billing.
//!
//! ## Core Concepts
//!
//! - **Site Statistics**: Budget, Forecast and Actual occupancy/volume/rate records per period
//! - **Period Keys**: Daily, weekly, monthly or quarter identifiers resolved into an ordered window
//! - **External Revenue**: Parking revenue derived from volumes and rates; Actual is reconciled against Budget
//! - **Contract Terms**: Per-site billing components, each mapped to a GL code
//! - **Internal Revenue**: Line items produced by the enabled contract components for one period
//! - **PnL by Site**: Monthly Actual/Budget/Forecast figures merged across years
//!
//! ## Example
//!
//! ```rust,ignore
//! use parking_billing_engine::*;
//!
//! let engine = ReconciliationEngine::new(EngineConfig::default())?;
//!
//! let catalog = GlCodeCatalog::new(vec![
//!     GlCodeEntry::new("4010", "Valet Services", GlCodeType::Service),
//! ]);
//!
//! let outcome = engine.run_batch(
//!     vec![SiteBatchInput {
//!         site_id: "0042".to_string(),
//!         statistics,
//!         contract,
//!         granularity: Granularity::Monthly,
//!         costs: SiteCosts::default(),
//!     }],
//!     &catalog,
//! );
//!
//! for (site_id, error) in &outcome.failures {
//!     eprintln!("{}: {}", site_id, error);
//! }
//! let pnl = outcome.to_pnl_by_site_list(2025, false);
//! println!("{}", pnl.to_csv());
//! ```

pub mod calculators;
pub mod config;
pub mod contract;
pub mod engine;
pub mod error;
pub mod external_revenue;
pub mod gl_codes;
pub mod ingestion;
pub mod invoice;
pub mod normalizer;
pub mod periods;
pub mod pnl;
pub mod schema;
pub mod sources;
pub mod utils;

pub use calculators::{
    total_amount, BillingPeriod, CalculatorRegistry, ContractCalculator, ContractComponent,
    InternalRevenueLineItem, LaborHours, PeriodCosts,
};
pub use config::{EngineConfig, RatioScale};
pub use contract::*;
pub use engine::{
    BatchOutcome, ComputedStatistics, PeriodComputation, ReconciliationEngine, SiteBatchInput,
    SiteComputation, SiteCosts,
};
pub use error::{BillingEngineError, Result};
pub use external_revenue::{ExternalRevenueByPeriod, ExternalRevenueCalculator};
pub use gl_codes::{GlCodeCatalog, GlCodeEntry, GlCodeType, GlCodeValidator};
pub use ingestion::RawPnlRow;
pub use invoice::{group_line_items, InvoiceGroupTotal};
pub use normalizer::{NormalizedStatistics, StatisticsNormalizer};
pub use periods::PeriodKeyResolver;
pub use pnl::{PnlAggregator, PnlBySite, PnlBySiteList, PnlMonthDetail};
pub use schema::*;
pub use sources::{ContractSource, EngineSources, GlCatalogSource, PnlSource, StatisticsSource};

use log::info;

/// Builds an engine from `config` and runs one batch against `catalog`.
pub fn reconcile_sites(
    config: EngineConfig,
    inputs: Vec<SiteBatchInput>,
    catalog: &GlCodeCatalog,
) -> Result<BatchOutcome> {
    let engine = ReconciliationEngine::new(config)?;
    let outcome = engine.run_batch(inputs, catalog);

    if !outcome.failures.is_empty() {
        info!(
            "{} site(s) need contract fixes before they can be billed",
            outcome.failures.len()
        );
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_sites_without_inputs() {
        let outcome = reconcile_sites(
            EngineConfig {
                worker_threads: Some(1),
                ..EngineConfig::default()
            },
            Vec::new(),
            &GlCodeCatalog::default(),
        )
        .unwrap();

        assert!(outcome.computed.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_reconcile_sites_rejects_bad_config() {
        let result = reconcile_sites(
            EngineConfig {
                year_window_months: 0,
                ..EngineConfig::default()
            },
            Vec::new(),
            &GlCodeCatalog::default(),
        );
        assert!(matches!(result, Err(BillingEngineError::InvalidConfig(_))));
    }
}
