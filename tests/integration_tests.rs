use parking_billing_engine::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {}, got {}",
        expected,
        actual
    );
}

fn upstream_failure(source_name: &str, details: &str) -> BillingEngineError {
    BillingEngineError::UpstreamFetchFailure {
        source_name: source_name.to_string(),
        details: details.to_string(),
    }
}

struct InMemoryStatistics {
    by_site: BTreeMap<String, SiteStatistics>,
}

impl StatisticsSource for InMemoryStatistics {
    fn fetch_statistics(&self, site_id: &str, _starting_month: &str) -> Result<SiteStatistics> {
        self.by_site
            .get(site_id)
            .cloned()
            .ok_or_else(|| upstream_failure("statistics", &format!("no statistics for {}", site_id)))
    }
}

#[derive(Default)]
struct InMemoryContracts {
    by_site: BTreeMap<String, ContractTerms>,
    saved: Mutex<Vec<ContractTerms>>,
}

impl ContractSource for InMemoryContracts {
    fn fetch_contract(&self, site_id: &str) -> Result<ContractTerms> {
        self.by_site
            .get(site_id)
            .cloned()
            .ok_or_else(|| upstream_failure("contracts", &format!("no contract for {}", site_id)))
    }

    fn save_contract(&self, terms: &ContractTerms) -> Result<()> {
        self.saved.lock().unwrap().push(terms.clone());
        Ok(())
    }
}

struct FailingCatalog;

impl GlCatalogSource for FailingCatalog {
    fn fetch_codes(&self, _types: &BTreeSet<GlCodeType>) -> Result<Vec<GlCodeEntry>> {
        Err(upstream_failure("gl-codes", "connection reset"))
    }
}

struct InMemoryPnl {
    rows_by_year: BTreeMap<i32, Vec<RawPnlRow>>,
}

impl PnlSource for InMemoryPnl {
    fn fetch_pnl_rows(&self, _site_ids: &[String], year: i32) -> Result<Vec<RawPnlRow>> {
        Ok(self.rows_by_year.get(&year).cloned().unwrap_or_default())
    }
}

fn catalog() -> GlCodeCatalog {
    GlCodeCatalog::new(vec![
        GlCodeEntry::new("4010", "Valet Services", GlCodeType::Service),
        GlCodeEntry::new("JobCode1", "Valet Attendant", GlCodeType::SalariedJob),
        GlCodeEntry::new("JobCode7", "Cashier", GlCodeType::NonSalariedJob),
        GlCodeEntry::new("4500", "Management Fee", GlCodeType::ManagementAgreement),
    ])
}

fn engine() -> ReconciliationEngine {
    ReconciliationEngine::new(EngineConfig {
        worker_threads: Some(2),
        ..EngineConfig::default()
    })
    .unwrap()
}

fn good_contract(site_id: &str) -> ContractTerms {
    ContractTerms {
        contract_id: format!("contract-{}", site_id),
        customer_site_id: site_id.to_string(),
        fixed_fee: FixedFeeTerms {
            enabled: true,
            service_rates: vec![FixedFeeServiceRate {
                name: "Valet".to_string(),
                code: "4010".to_string(),
                fee: 1_500.0,
                ..FixedFeeServiceRate::default()
            }],
        },
        per_labor_hour: PerLaborHourTerms {
            enabled: true,
            job_rates: vec![JobRate {
                name: "Valet Attendant".to_string(),
                rate: 20.0,
                overtime_rate: 30.0,
                ..JobRate::default()
            }],
        },
        management_agreement: ManagementAgreementTerms {
            enabled: true,
            fixed_fee: 500.0,
            revenue_percentage: 0.1,
            ..ManagementAgreementTerms::default()
        },
        ..ContractTerms::default()
    }
}

fn july_statistics(site_id: &str) -> SiteStatistics {
    SiteStatistics {
        customer_site_id: site_id.to_string(),
        total_rooms: 200.0,
        budget_data: vec![StatisticPeriodRecord {
            period_start: "2025-07-01".to_string(),
            occupancy: Some(0.5),
            valet_daily: 100.0,
            rates: Some(RateSet {
                valet_rate_daily: 20.0,
                ..RateSet::default()
            }),
            ..StatisticPeriodRecord::default()
        }],
        actual_data: vec![StatisticPeriodRecord {
            period_start: "2025-07-01".to_string(),
            occupied_rooms: Some(120.0),
            valet_daily: 110.0,
            ..StatisticPeriodRecord::default()
        }],
        ..SiteStatistics::default()
    }
}

#[test]
fn test_update_contract_with_unknown_service_code_saves_nothing() {
    let contracts = InMemoryContracts::default();
    let mut terms = good_contract("0042");
    terms.fixed_fee.service_rates[0].code = "4999".to_string();
    let before = terms.clone();

    let err = engine()
        .update_contract(&terms, &catalog(), &contracts)
        .unwrap_err();

    assert!(matches!(
        err,
        BillingEngineError::GlCodeNotFound { ref code, .. } if code == "4999"
    ));
    assert!(err.is_validation_error());
    assert!(contracts.saved.lock().unwrap().is_empty());
    assert_eq!(terms, before);
}

#[test]
fn test_update_contract_populates_codes_before_saving() -> anyhow::Result<()> {
    let contracts = InMemoryContracts::default();
    let mut terms = good_contract("0042");
    terms.per_labor_hour.job_rates.push(JobRate {
        name: "Cashier".to_string(),
        rate: 15.0,
        ..JobRate::default()
    });

    let validated = engine().update_contract(&terms, &catalog(), &contracts)?;

    let codes: Vec<Option<&str>> = validated
        .per_labor_hour
        .job_rates
        .iter()
        .map(|j| j.job_code.as_deref())
        .collect();
    assert_eq!(codes, vec![Some("JobCode1"), Some("JobCode7")]);
    assert_eq!(validated.management_agreement.code.as_deref(), Some("4500"));

    let saved = contracts.saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0], validated);
    Ok(())
}

#[test]
fn test_update_contract_with_unknown_job_name() {
    let contracts = InMemoryContracts::default();
    let mut terms = good_contract("0042");
    terms.per_labor_hour.job_rates[0].name = "Night Doorman".to_string();

    let err = engine()
        .update_contract(&terms, &catalog(), &contracts)
        .unwrap_err();

    assert!(matches!(err, BillingEngineError::InvalidJobName(ref name) if name == "Night Doorman"));
    assert!(contracts.saved.lock().unwrap().is_empty());
}

#[test]
fn test_catalog_outage_passes_through() {
    let err = engine()
        .validate_and_populate_gl_codes(&good_contract("0042"), &FailingCatalog)
        .unwrap_err();

    assert!(matches!(err, BillingEngineError::UpstreamFetchFailure { .. }));
    assert!(!err.is_validation_error());
}

#[test]
fn test_run_for_sites_isolates_failures() {
    let mut bad_contract = good_contract("0077");
    bad_contract.fixed_fee.service_rates[0].code = "9999".to_string();

    let statistics = InMemoryStatistics {
        by_site: BTreeMap::from([
            ("0042".to_string(), july_statistics("0042")),
            ("0077".to_string(), july_statistics("0077")),
        ]),
    };
    let contracts = InMemoryContracts {
        by_site: BTreeMap::from([
            ("0042".to_string(), good_contract("0042")),
            ("0077".to_string(), bad_contract),
        ]),
        ..InMemoryContracts::default()
    };
    let gl_catalog = catalog();
    let sources = EngineSources {
        statistics: &statistics,
        contracts: &contracts,
        gl_catalog: &gl_catalog,
    };

    let mut actual_costs = BTreeMap::new();
    actual_costs.insert(
        "2025-07-01".to_string(),
        PeriodCosts {
            labor_hours: BTreeMap::from([(
                "JobCode1".to_string(),
                LaborHours {
                    regular: 10.0,
                    overtime: 2.0,
                },
            )]),
            payroll: 4_200.0,
            ..PeriodCosts::default()
        },
    );
    let costs = BTreeMap::from([(
        "0042".to_string(),
        SiteCosts {
            actual: actual_costs,
            ..SiteCosts::default()
        },
    )]);

    let site_ids = vec!["0042".to_string(), "0077".to_string(), "0099".to_string()];
    let outcome = engine()
        .run_for_sites(&site_ids, "2025-07", Granularity::Monthly, sources, &costs)
        .unwrap();

    assert_eq!(outcome.computed.keys().collect::<Vec<_>>(), vec!["0042"]);
    assert!(matches!(
        outcome.failures["0077"],
        BillingEngineError::GlCodeNotFound { ref code, .. } if code == "9999"
    ));
    assert!(matches!(
        outcome.failures["0099"],
        BillingEngineError::UpstreamFetchFailure { .. }
    ));

    let site = &outcome.computed["0042"];
    let july = &site.periods["2025-07"];
    assert_close(july.external_revenue.budget, 2_000.0);
    assert_close(july.external_revenue.forecast, 2_000.0);
    assert_close(july.external_revenue.actual, 2_200.0);

    let actual_items = &july.internal_revenue.actual;
    let labor = actual_items
        .iter()
        .find(|i| i.component == ContractComponent::PerLaborHour)
        .unwrap();
    assert_eq!(labor.gl_code.as_deref(), Some("JobCode1"));
    assert_close(labor.amount, 260.0);

    let management = actual_items
        .iter()
        .find(|i| i.component == ContractComponent::ManagementAgreement)
        .unwrap();
    assert_close(management.amount, 720.0);
    assert_close(total_amount(actual_items), 1_500.0 + 260.0 + 720.0);

    // No budget labor hours were supplied
    let budget_labor = july
        .internal_revenue
        .budget
        .iter()
        .find(|i| i.component == ContractComponent::PerLaborHour)
        .unwrap();
    assert_close(budget_labor.amount, 0.0);

    let pnl = outcome.to_pnl_by_site_list(2025, false);
    let row = &pnl.site("0042").unwrap().actual[0];
    assert_eq!((row.year, row.month), (2025, 7));
    assert_close(row.internal_revenue, 2_480.0);
    assert_close(row.payroll, 4_200.0);
    assert_close(row.occupied_rooms, 120.0);
    assert!(pnl.to_csv().contains("0042,ACTUAL,2025,7,2200.00,2480.00,4200.00"));
}

#[test]
fn test_run_for_sites_aborts_on_catalog_outage() {
    let statistics = InMemoryStatistics {
        by_site: BTreeMap::new(),
    };
    let contracts = InMemoryContracts::default();
    let sources = EngineSources {
        statistics: &statistics,
        contracts: &contracts,
        gl_catalog: &FailingCatalog,
    };

    let result = engine().run_for_sites(
        &["0042".to_string()],
        "2025-07",
        Granularity::Monthly,
        sources,
        &BTreeMap::new(),
    );
    assert!(matches!(result, Err(BillingEngineError::UpstreamFetchFailure { .. })));
}

#[test]
fn test_run_for_sites_rejects_bad_starting_month() {
    let statistics = InMemoryStatistics {
        by_site: BTreeMap::new(),
    };
    let contracts = InMemoryContracts::default();
    let gl_catalog = catalog();
    let sources = EngineSources {
        statistics: &statistics,
        contracts: &contracts,
        gl_catalog: &gl_catalog,
    };

    let result = engine().run_for_sites(&[], "July 2025", Granularity::Monthly, sources, &BTreeMap::new());
    assert!(matches!(result, Err(BillingEngineError::InvalidStartingMonth(_))));
}

#[test]
fn test_monthly_window_includes_observed_months() {
    let mut statistics = july_statistics("0042");
    statistics.budget_data.push(StatisticPeriodRecord {
        period_start: "2025-11".to_string(),
        period_label: "Nov '25".to_string(),
        ..StatisticPeriodRecord::default()
    });

    let periods = engine()
        .resolve_site_periods(&statistics, "2025-07", Granularity::Monthly)
        .unwrap();

    let keys: Vec<&str> = periods.iter().map(|p| p.period_key.as_str()).collect();
    assert_eq!(keys, vec!["2025-07", "2025-08", "2025-09", "2025-11"]);
    assert_eq!(periods[0].display_label, "July 2025");
    assert_eq!(periods[3].display_label, "Nov '25");
}

#[test]
fn test_quarter_keys_rotate_to_starting_quarter() {
    let quarter = |key: &str| StatisticPeriodRecord {
        period_start: key.to_string(),
        period_label: key.to_string(),
        ..StatisticPeriodRecord::default()
    };
    let statistics = SiteStatistics {
        total_rooms: 100.0,
        budget_data: vec![quarter("Q1 2025"), quarter("Q4 2025"), quarter("Q3 2025")],
        ..SiteStatistics::default()
    };

    let periods = engine()
        .resolve_site_periods(&statistics, "2025-08", Granularity::Monthly)
        .unwrap();

    let keys: Vec<&str> = periods.iter().map(|p| p.period_key.as_str()).collect();
    assert_eq!(keys, vec!["Q3 2025", "Q4 2025", "Q1 2025"]);
}

#[test]
fn test_daily_window_covers_every_day() {
    let periods = engine()
        .resolve_periods("2024-02", Granularity::Daily, 1)
        .unwrap();

    assert_eq!(periods.len(), 29);
    assert_eq!(periods[0].period_key, "2024-02-01");
    assert_eq!(periods[28].period_key, "2024-02-29");
}

#[test]
fn test_percent_feed_normalized() {
    let engine = ReconciliationEngine::new(EngineConfig {
        worker_threads: Some(1),
        ratio_scale: RatioScale::Percent,
        ..EngineConfig::default()
    })
    .unwrap();

    let raw = SiteStatistics {
        budget_data: vec![StatisticPeriodRecord {
            period_start: "2025-07".to_string(),
            occupancy: Some(50.0),
            drive_in_ratio: 10.0,
            capture_ratio: 100.0,
            rates: Some(RateSet {
                valet_rate_overnight: 30.0,
                self_rate_overnight: 25.0,
                ..RateSet::default()
            }),
            ..StatisticPeriodRecord::default()
        }],
        ..SiteStatistics::default()
    };

    let computed = engine.normalize_and_compute(&raw, 200.0, Granularity::Monthly);
    let budget = &computed.values.budget_values["2025-07"];

    assert_close(budget.occupancy_value(), 0.5);
    assert_close(budget.occupied_rooms_value(), 100.0);
    // 10 overnight cars, all valet at full capture
    assert_close(computed.external_revenue_by_period["2025-07"].budget, 300.0);
    assert_eq!(computed.values.actual_values["2025-07"].occupied_rooms, Some(0.0));
}

#[test]
fn test_pnl_merged_across_years() -> anyhow::Result<()> {
    let row = |site_id: &str, year: i32, month: u32, value_type: &str, external: f64| RawPnlRow {
        site_id: site_id.to_string(),
        year,
        month,
        value_type: value_type.to_string(),
        external_revenue: external,
        ..RawPnlRow::default()
    };

    let source = InMemoryPnl {
        rows_by_year: BTreeMap::from([
            (
                2024,
                vec![
                    row("0042", 2024, 12, "ACTUAL", 900.0),
                    row("0077", 2024, 12, "ACTUAL", 50.0),
                ],
            ),
            (
                2025,
                vec![
                    row("0042", 0, 1, "ACTUAL", 1_000.0),
                    row("0042", 2025, 1, "ACTUAL", 9_999.0),
                    row("0042", 2025, 1, "BUDGET", 1_100.0),
                    row("0042", 2025, 1, "FORECAST", 1_050.0),
                ],
            ),
        ]),
    };

    let list = engine().aggregate_pnl(&["0042".to_string()], &[2024, 2025], &source)?;

    assert_eq!(list.sites.len(), 1);
    let site = list.site("0042").unwrap();
    let actual: Vec<(i32, u32, f64)> = site
        .actual
        .iter()
        .map(|d| (d.year, d.month, d.external_revenue))
        .collect();
    assert_eq!(actual, vec![(2024, 12, 900.0), (2025, 1, 1_000.0)]);
    assert_eq!(site.budget.len(), 1);
    assert!(site.forecast.is_none());
    Ok(())
}

#[test]
fn test_invoice_groups_for_computed_items() {
    let mut terms = good_contract("0042");
    terms.invoice_grouping_enabled = true;
    terms.invoice_groups = vec![InvoiceGroup {
        group_number: 2,
        title: "Management".to_string(),
        ..InvoiceGroup::default()
    }];
    terms.management_agreement.invoice_group = 2;

    let engine = engine();
    let gl_catalog = catalog();
    let validated = engine.validate_and_populate_gl_codes(&terms, &gl_catalog).unwrap();

    let stats = StatisticPeriodRecord::default();
    let costs = PeriodCosts::default();
    let period = BillingPeriod {
        period_key: "2025-07",
        statistics: &stats,
        external_revenue: 1_000.0,
        costs: &costs,
    };
    let items = engine.compute_internal_revenue(&validated, &period, &gl_catalog);
    let groups = group_line_items(&validated, &items);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].group_number, 1);
    assert_close(groups[0].total, 1_500.0);
    assert_eq!(groups[1].title, "Management");
    assert_close(groups[1].total, 600.0);
}

#[test]
fn test_computed_statistics_wire_shape() -> anyhow::Result<()> {
    let computed =
        engine().normalize_and_compute(&july_statistics("0042"), 200.0, Granularity::Monthly);
    let json = serde_json::to_value(&computed)?;

    for key in [
        "budgetValues",
        "forecastValues",
        "actualValues",
        "externalRevenueByPeriod",
    ] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(
        json["externalRevenueByPeriod"]["2025-07"]["budget"],
        serde_json::json!(2000.0)
    );
    assert_eq!(json["budgetValues"]["2025-07"]["occupiedRooms"], serde_json::json!(100.0));
    Ok(())
}
