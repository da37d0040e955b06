//! Internal-revenue calculators, one per contract component.
//!
//! The registry maps each [`ContractComponent`] to a stateless calculator. Dispatch runs
//! every calculator whose component is enabled on the contract and concatenates the
//! resulting line items; a disabled component contributes no rows at all.

mod fixed_fee;
mod line_items;
mod management_agreement;
mod per_labor_hour;
mod per_occupied_room;
mod revenue_share;

pub use fixed_fee::FixedFeeCalculator;
pub use line_items::{BellServiceCalculator, DepositedRevenueCalculator, MidMonthAdvanceCalculator};
pub use management_agreement::{
    AdditionalPayrollAmountCalculator, BillablePtebCalculator, ExpenseAccountCalculator,
    ManagementFeeCalculator, SupportServicesCalculator,
};
pub use per_labor_hour::PerLaborHourCalculator;
pub use per_occupied_room::PerOccupiedRoomCalculator;
pub use revenue_share::{tiered_share, RevenueShareCalculator};

use crate::contract::ContractTerms;
use crate::gl_codes::GlCodeCatalog;
use crate::schema::StatisticPeriodRecord;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum ContractComponent {
    FixedFee,
    PerOccupiedRoom,
    PerLaborHour,
    RevenueShare,
    ManagementAgreement,
    AdditionalPayrollAmount,
    BillablePteb,
    SupportServices,
    ExpenseAccount,
    BellService,
    MidMonthAdvance,
    DepositedRevenue,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LaborHours {
    pub regular: f64,
    pub overtime: f64,
}

/// Cost-side inputs for one period, supplied by the caller alongside the statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PeriodCosts {
    #[schemars(description = "Worked hours keyed by job code")]
    pub labor_hours: BTreeMap<String, LaborHours>,
    pub payroll: f64,
    pub pteb: f64,
    pub claims: f64,
    pub parking_rents: f64,
    pub insurance: f64,
    pub other_expense: f64,
    #[schemars(description = "Recorded expenses keyed by GL code")]
    pub expenses: BTreeMap<String, f64>,
}

/// Everything a calculator may read for one period.
#[derive(Debug, Clone, Copy)]
pub struct BillingPeriod<'a> {
    pub period_key: &'a str,
    pub statistics: &'a StatisticPeriodRecord,
    pub external_revenue: f64,
    pub costs: &'a PeriodCosts,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InternalRevenueLineItem {
    pub component: ContractComponent,
    pub period_key: String,
    pub gl_code: Option<String>,
    pub description: String,
    pub amount: f64,
    pub invoice_group: u32,
}

impl InternalRevenueLineItem {
    pub fn new(
        component: ContractComponent,
        period: &BillingPeriod<'_>,
        gl_code: Option<String>,
        description: impl Into<String>,
        amount: f64,
        invoice_group: u32,
    ) -> Self {
        Self {
            component,
            period_key: period.period_key.to_string(),
            gl_code,
            description: description.into(),
            amount,
            invoice_group: invoice_group.max(1),
        }
    }
}

pub trait ContractCalculator: Send + Sync {
    fn component(&self) -> ContractComponent;

    fn is_enabled(&self, terms: &ContractTerms) -> bool;

    fn compute(
        &self,
        terms: &ContractTerms,
        period: &BillingPeriod<'_>,
        catalog: &GlCodeCatalog,
    ) -> Vec<InternalRevenueLineItem>;
}

pub struct CalculatorRegistry {
    calculators: BTreeMap<ContractComponent, Box<dyn ContractCalculator>>,
}

impl CalculatorRegistry {
    pub fn empty() -> Self {
        Self {
            calculators: BTreeMap::new(),
        }
    }

    pub fn with_default_calculators() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(FixedFeeCalculator));
        registry.register(Box::new(PerOccupiedRoomCalculator));
        registry.register(Box::new(PerLaborHourCalculator));
        registry.register(Box::new(RevenueShareCalculator));
        registry.register(Box::new(ManagementFeeCalculator));
        registry.register(Box::new(AdditionalPayrollAmountCalculator));
        registry.register(Box::new(BillablePtebCalculator));
        registry.register(Box::new(SupportServicesCalculator));
        registry.register(Box::new(ExpenseAccountCalculator));
        registry.register(Box::new(BellServiceCalculator));
        registry.register(Box::new(MidMonthAdvanceCalculator));
        registry.register(Box::new(DepositedRevenueCalculator));
        registry
    }

    /// Registers a calculator, replacing any previous one for the same component.
    pub fn register(&mut self, calculator: Box<dyn ContractCalculator>) {
        self.calculators.insert(calculator.component(), calculator);
    }

    pub fn len(&self) -> usize {
        self.calculators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calculators.is_empty()
    }

    pub fn enabled_components(&self, terms: &ContractTerms) -> Vec<ContractComponent> {
        self.calculators
            .values()
            .filter(|c| c.is_enabled(terms))
            .map(|c| c.component())
            .collect()
    }

    pub fn compute(
        &self,
        terms: &ContractTerms,
        period: &BillingPeriod<'_>,
        catalog: &GlCodeCatalog,
    ) -> Vec<InternalRevenueLineItem> {
        self.calculators
            .values()
            .filter(|c| c.is_enabled(terms))
            .flat_map(|c| c.compute(terms, period, catalog))
            .collect()
    }
}

impl Default for CalculatorRegistry {
    fn default() -> Self {
        Self::with_default_calculators()
    }
}

pub fn total_amount(items: &[InternalRevenueLineItem]) -> f64 {
    items.iter().map(|i| i.amount).sum()
}
