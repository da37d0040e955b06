//! Upstream collaborators. The engine performs no I/O of its own; these traits are the
//! fetch/save boundary. Implementations report failures as
//! [`BillingEngineError::UpstreamFetchFailure`](crate::error::BillingEngineError), which the
//! engine passes through without retrying.

use crate::contract::ContractTerms;
use crate::error::Result;
use crate::gl_codes::{GlCodeCatalog, GlCodeEntry, GlCodeType};
use crate::ingestion::RawPnlRow;
use crate::schema::SiteStatistics;
use std::collections::BTreeSet;

pub trait StatisticsSource: Send + Sync {
    /// Up to three months of budget/forecast/actual records starting at `starting_month`.
    fn fetch_statistics(&self, site_id: &str, starting_month: &str) -> Result<SiteStatistics>;
}

pub trait ContractSource: Send + Sync {
    fn fetch_contract(&self, site_id: &str) -> Result<ContractTerms>;

    /// Full-replace update; the create/update/delete diff of child collections is the
    /// implementation's concern.
    fn save_contract(&self, terms: &ContractTerms) -> Result<()>;
}

pub trait GlCatalogSource: Send + Sync {
    fn fetch_codes(&self, types: &BTreeSet<GlCodeType>) -> Result<Vec<GlCodeEntry>>;
}

pub trait PnlSource: Send + Sync {
    fn fetch_pnl_rows(&self, site_ids: &[String], year: i32) -> Result<Vec<RawPnlRow>>;
}

/// An in-memory catalog snapshot can serve as its own source.
impl GlCatalogSource for GlCodeCatalog {
    fn fetch_codes(&self, types: &BTreeSet<GlCodeType>) -> Result<Vec<GlCodeEntry>> {
        Ok(self
            .entries()
            .iter()
            .filter(|e| types.contains(&e.code_type))
            .cloned()
            .collect())
    }
}

/// The collaborators needed to fetch everything a reconciliation run reads.
#[derive(Clone, Copy)]
pub struct EngineSources<'a> {
    pub statistics: &'a dyn StatisticsSource,
    pub contracts: &'a dyn ContractSource,
    pub gl_catalog: &'a dyn GlCatalogSource,
}
