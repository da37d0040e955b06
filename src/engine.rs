//! The reconciliation facade.
//!
//! A run is two phases per contract: GL validation completes first, then statistics are
//! normalized, external revenue is derived and every enabled contract component is
//! computed for each Budget/Forecast/Actual period. Sites run in parallel on a bounded
//! worker pool; results are merged by site id, so completion order does not matter.

use crate::calculators::{
    total_amount, BillingPeriod, CalculatorRegistry, InternalRevenueLineItem, PeriodCosts,
};
use crate::config::EngineConfig;
use crate::contract::ContractTerms;
use crate::error::{BillingEngineError, Result};
use crate::external_revenue::{ExternalRevenueByPeriod, ExternalRevenueCalculator};
use crate::gl_codes::{required_code_types, GlCodeCatalog, GlCodeType, GlCodeValidator};
use crate::ingestion::{ingest_site_statistics, rows_to_pnl_by_site_list, RawPnlRow};
use crate::normalizer::{NormalizedStatistics, StatisticsNormalizer};
use crate::periods::PeriodKeyResolver;
use crate::pnl::{PnlAggregator, PnlBySite, PnlBySiteList, PnlMonthDetail};
use crate::schema::{ByValueKind, Granularity, PeriodEntry, PeriodKey, SiteStatistics, ValueKind};
use crate::sources::{ContractSource, EngineSources, GlCatalogSource, PnlSource};
use crate::utils::parse_year_month;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Cost-side inputs per value kind, keyed by period.
pub type SiteCosts = ByValueKind<BTreeMap<PeriodKey, PeriodCosts>>;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComputedStatistics {
    #[serde(flatten)]
    pub values: NormalizedStatistics,
    pub external_revenue_by_period: ExternalRevenueByPeriod,
}

#[derive(Debug, Clone)]
pub struct SiteBatchInput {
    pub site_id: String,
    pub statistics: SiteStatistics,
    pub contract: ContractTerms,
    pub granularity: Granularity,
    pub costs: SiteCosts,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PeriodComputation {
    pub external_revenue: ByValueKind<f64>,
    pub internal_revenue: ByValueKind<Vec<InternalRevenueLineItem>>,
    pub costs: ByValueKind<PeriodCosts>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteComputation {
    pub site_id: String,
    pub granularity: Granularity,
    /// The contract as validated, with populated GL codes.
    pub contract: ContractTerms,
    pub statistics: NormalizedStatistics,
    pub periods: BTreeMap<PeriodKey, PeriodComputation>,
}

impl SiteComputation {
    /// Monthly PnL rows for `year`. Periods that are not plain "YYYY-MM" keys are skipped.
    pub fn to_pnl_by_site(&self, year: i32, include_forecast: bool) -> PnlBySite {
        let mut site = PnlBySite::new(&self.site_id);
        let kinds: &[ValueKind] = if include_forecast {
            &[ValueKind::Actual, ValueKind::Budget, ValueKind::Forecast]
        } else {
            &[ValueKind::Actual, ValueKind::Budget]
        };

        for (key, period) in &self.periods {
            let Ok((key_year, month)) = parse_year_month(key) else {
                debug!("Period {} has no calendar month; left out of PnL", key);
                continue;
            };
            if key_year != year {
                continue;
            }

            for &kind in kinds {
                let costs = period.costs.get(kind);
                let occupied_rooms = self
                    .statistics
                    .series(kind)
                    .get(key)
                    .map(|r| r.occupied_rooms_value())
                    .unwrap_or(0.0);

                site.details_mut(kind).push(PnlMonthDetail {
                    year,
                    month,
                    external_revenue: *period.external_revenue.get(kind),
                    internal_revenue: total_amount(period.internal_revenue.get(kind)),
                    payroll: costs.payroll,
                    claims: costs.claims,
                    parking_rents: costs.parking_rents,
                    other_expense: costs.other_expense,
                    pteb: costs.pteb,
                    insurance: costs.insurance,
                    occupied_rooms,
                });
            }
        }

        site.sort_details();
        site
    }
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub computed: BTreeMap<String, SiteComputation>,
    pub failures: BTreeMap<String, BillingEngineError>,
}

impl BatchOutcome {
    /// Sites with no periods in `year` are left out.
    pub fn to_pnl_by_site_list(&self, year: i32, include_forecast: bool) -> PnlBySiteList {
        PnlBySiteList {
            sites: self
                .computed
                .values()
                .map(|c| c.to_pnl_by_site(year, include_forecast))
                .filter(|site| !site.is_empty())
                .collect(),
        }
    }
}

pub struct ReconciliationEngine {
    config: EngineConfig,
    registry: CalculatorRegistry,
    pool: rayon::ThreadPool,
}

impl ReconciliationEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_registry(config, CalculatorRegistry::default())
    }

    pub fn with_registry(config: EngineConfig, registry: CalculatorRegistry) -> Result<Self> {
        config.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_count())
            .thread_name(|idx| format!("billing-worker-{}", idx))
            .build()
            .map_err(|e| BillingEngineError::WorkerPool(e.to_string()))?;

        Ok(Self {
            config,
            registry,
            pool,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &CalculatorRegistry {
        &self.registry
    }

    pub fn resolve_periods(
        &self,
        starting_month: &str,
        granularity: Granularity,
        window_length: u32,
    ) -> Result<Vec<PeriodEntry>> {
        PeriodKeyResolver::new(granularity).resolve(starting_month, window_length, &[])
    }

    /// Year-based views span `year_window_months` from the starting month.
    pub fn resolve_year_periods(
        &self,
        starting_month: &str,
        granularity: Granularity,
    ) -> Result<Vec<PeriodEntry>> {
        self.resolve_periods(starting_month, granularity, self.config.year_window_months)
    }

    /// Resolves the statistics-screen window using the keys and labels present in the records.
    pub fn resolve_site_periods(
        &self,
        statistics: &SiteStatistics,
        starting_month: &str,
        granularity: Granularity,
    ) -> Result<Vec<PeriodEntry>> {
        let observed =
            StatisticsNormalizer::new(granularity, statistics.total_rooms).observed_periods(statistics);

        PeriodKeyResolver::new(granularity).resolve(
            starting_month,
            self.config.statistics_window_months,
            &observed,
        )
    }

    /// Ingests a raw statistics payload, fills every gap, and derives external revenue per period.
    pub fn normalize_and_compute(
        &self,
        raw: &SiteStatistics,
        total_rooms: f64,
        granularity: Granularity,
    ) -> ComputedStatistics {
        let statistics = ingest_site_statistics(raw.clone(), self.config.ratio_scale);
        let values = StatisticsNormalizer::new(granularity, total_rooms).normalize(&statistics);
        let external_revenue_by_period = ExternalRevenueCalculator::new(total_rooms).by_period(&values);

        ComputedStatistics {
            values,
            external_revenue_by_period,
        }
    }

    pub fn validate_and_populate_gl_codes(
        &self,
        terms: &ContractTerms,
        catalog_source: &dyn GlCatalogSource,
    ) -> Result<ContractTerms> {
        let types = required_code_types(terms);
        let catalog = GlCodeCatalog::new(catalog_source.fetch_codes(&types)?);

        GlCodeValidator::new(&catalog).validate_and_populate(terms)
    }

    /// Validates, then hands the contract to the persistence collaborator. Nothing is
    /// saved when validation fails.
    pub fn update_contract(
        &self,
        terms: &ContractTerms,
        catalog_source: &dyn GlCatalogSource,
        contract_source: &dyn ContractSource,
    ) -> Result<ContractTerms> {
        let validated = self.validate_and_populate_gl_codes(terms, catalog_source)?;
        contract_source.save_contract(&validated)?;

        info!(
            "Contract {} for site {} validated and saved",
            validated.contract_id, validated.customer_site_id
        );
        Ok(validated)
    }

    pub fn compute_internal_revenue(
        &self,
        terms: &ContractTerms,
        period: &BillingPeriod<'_>,
        catalog: &GlCodeCatalog,
    ) -> Vec<InternalRevenueLineItem> {
        self.registry.compute(terms, period, catalog)
    }

    /// Fetches per-site monthly rows for each year and merges them by site.
    pub fn aggregate_pnl(
        &self,
        site_ids: &[String],
        years: &[i32],
        source: &dyn PnlSource,
    ) -> Result<PnlBySiteList> {
        info!(
            "Aggregating PnL for {} site(s) over {} year(s)",
            site_ids.len(),
            years.len()
        );

        let requested: BTreeSet<&str> = site_ids.iter().map(String::as_str).collect();
        let include_forecast = self.config.include_forecast;

        let per_year = self.pool.install(|| {
            years
                .par_iter()
                .map(|&year| -> Result<(i32, PnlBySiteList)> {
                    let rows: Vec<RawPnlRow> = source
                        .fetch_pnl_rows(site_ids, year)?
                        .into_iter()
                        .filter(|row| requested.contains(row.site_id.as_str()))
                        .collect();
                    Ok((year, rows_to_pnl_by_site_list(&rows, include_forecast)))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        Ok(PnlAggregator::aggregate(per_year))
    }

    /// Runs the validate-then-compute pipeline for every site on the worker pool.
    ///
    /// `catalog` is the read-only snapshot for the whole run. A site that fails validation
    /// is reported in `failures` and never blocks the others. Only the first input for a
    /// site id is run.
    pub fn run_batch(&self, inputs: Vec<SiteBatchInput>, catalog: &GlCodeCatalog) -> BatchOutcome {
        let mut seen = BTreeSet::new();
        let inputs: Vec<SiteBatchInput> = inputs
            .into_iter()
            .filter(|input| {
                let first = seen.insert(input.site_id.clone());
                if !first {
                    warn!("Duplicate batch input for site {}; keeping the first", input.site_id);
                }
                first
            })
            .collect();

        info!(
            "Running reconciliation batch for {} site(s) on {} worker(s)",
            inputs.len(),
            self.pool.current_num_threads()
        );

        let results: Vec<(String, Result<SiteComputation>)> = self.pool.install(|| {
            inputs
                .into_par_iter()
                .map(|input| {
                    let site_id = input.site_id.clone();
                    (site_id, self.compute_site(input, catalog))
                })
                .collect()
        });

        let mut outcome = BatchOutcome::default();
        for (site_id, result) in results {
            match result {
                Ok(computation) => {
                    outcome.computed.insert(site_id, computation);
                }
                Err(e) => {
                    warn!("Site {} not computed: {}", site_id, e);
                    outcome.failures.insert(site_id, e);
                }
            }
        }

        info!(
            "Batch finished: {} computed, {} failed",
            outcome.computed.len(),
            outcome.failures.len()
        );
        outcome
    }

    /// Fetches statistics and contracts for each site plus one catalog snapshot, then runs
    /// the batch. A site whose fetch fails is reported in `failures`; a catalog fetch
    /// failure aborts the run.
    pub fn run_for_sites(
        &self,
        site_ids: &[String],
        starting_month: &str,
        granularity: Granularity,
        sources: EngineSources<'_>,
        costs: &BTreeMap<String, SiteCosts>,
    ) -> Result<BatchOutcome> {
        parse_year_month(starting_month)?;

        let all_types: BTreeSet<GlCodeType> = GlCodeType::ALL.into_iter().collect();
        let catalog = GlCodeCatalog::new(sources.gl_catalog.fetch_codes(&all_types)?);

        let mut inputs = Vec::new();
        let mut fetch_failures = BTreeMap::new();

        for site_id in site_ids {
            let fetched = sources
                .statistics
                .fetch_statistics(site_id, starting_month)
                .and_then(|statistics| Ok((statistics, sources.contracts.fetch_contract(site_id)?)));

            match fetched {
                Ok((statistics, contract)) => inputs.push(SiteBatchInput {
                    site_id: site_id.clone(),
                    statistics,
                    contract,
                    granularity,
                    costs: costs.get(site_id).cloned().unwrap_or_default(),
                }),
                Err(e) => {
                    warn!("Fetch for site {} failed: {}", site_id, e);
                    fetch_failures.insert(site_id.clone(), e);
                }
            }
        }

        let mut outcome = self.run_batch(inputs, &catalog);
        outcome.failures.extend(fetch_failures);
        Ok(outcome)
    }

    fn compute_site(&self, input: SiteBatchInput, catalog: &GlCodeCatalog) -> Result<SiteComputation> {
        // Phase 1: the contract must validate before any calculator sees it
        let relevant = catalog.filtered(&required_code_types(&input.contract));
        let contract = GlCodeValidator::new(&relevant).validate_and_populate(&input.contract)?;

        // Phase 2: normalize, derive external revenue, dispatch calculators per kind
        let total_rooms = input.statistics.total_rooms;
        let computed = self.normalize_and_compute(&input.statistics, total_rooms, input.granularity);

        let resolver = PeriodKeyResolver::new(input.granularity);
        let costs: SiteCosts = input.costs.map(|_, by_period| {
            by_period
                .iter()
                .map(|(key, c)| (resolver.canonical_key(key), c.clone()))
                .collect()
        });

        let mut periods = BTreeMap::new();
        for (key, external) in &computed.external_revenue_by_period {
            let period_costs = costs.map(|_, by_period| by_period.get(key).cloned().unwrap_or_default());
            let mut internal: ByValueKind<Vec<InternalRevenueLineItem>> = ByValueKind::default();

            for kind in ValueKind::ALL {
                let Some(statistics) = computed.values.series(kind).get(key) else {
                    continue;
                };
                let period = BillingPeriod {
                    period_key: key,
                    statistics,
                    external_revenue: *external.get(kind),
                    costs: period_costs.get(kind),
                };
                *internal.get_mut(kind) = self.registry.compute(&contract, &period, catalog);
            }

            periods.insert(
                key.clone(),
                PeriodComputation {
                    external_revenue: external.clone(),
                    internal_revenue: internal,
                    costs: period_costs,
                },
            );
        }

        debug!(
            "Site {} computed over {} period(s)",
            input.site_id,
            periods.len()
        );

        Ok(SiteComputation {
            site_id: input.site_id,
            granularity: input.granularity,
            contract,
            statistics: computed.values,
            periods,
        })
    }
}
