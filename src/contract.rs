use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A site's billing configuration. Every component carries its own enabled flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ContractTerms {
    pub contract_id: String,
    pub customer_site_id: String,

    pub fixed_fee: FixedFeeTerms,
    pub per_labor_hour: PerLaborHourTerms,
    pub per_occupied_room: PerOccupiedRoomTerms,
    pub revenue_share: RevenueShareTerms,
    pub management_agreement: ManagementAgreementTerms,
    pub bell_service: BellServiceTerms,
    pub mid_month_advance: MidMonthAdvanceTerms,
    pub deposited_revenue: DepositedRevenueTerms,

    #[schemars(description = "When false every line item is billed on invoice 1")]
    pub invoice_grouping_enabled: bool,
    pub invoice_groups: Vec<InvoiceGroup>,
}

impl ContractTerms {
    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = schemars::schema_for!(ContractTerms);
        serde_json::to_string_pretty(&schema)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceGroup {
    pub group_number: u32,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct FixedFeeTerms {
    pub enabled: bool,
    pub service_rates: Vec<FixedFeeServiceRate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct FixedFeeServiceRate {
    pub id: String,
    pub name: String,
    pub display_name: String,
    #[schemars(description = "Service-type GL code; must exist in the catalog")]
    pub code: String,
    pub fee: f64,
    pub invoice_group: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PerLaborHourTerms {
    pub enabled: bool,
    pub job_rates: Vec<JobRate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct JobRate {
    pub id: String,
    #[schemars(description = "Job name; the job code is always looked up from it")]
    pub name: String,
    pub display_name: String,
    pub rate: f64,
    pub overtime_rate: f64,
    pub job_code: Option<String>,
    pub invoice_group: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PerOccupiedRoomTerms {
    pub enabled: bool,
    pub room_rate: f64,
    pub code: Option<String>,
    pub invoice_group: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RevenueShareTerms {
    pub enabled: bool,
    pub thresholds: Vec<RevenueShareThreshold>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RevenueShareThreshold {
    pub id: String,
    pub name: String,
    pub code: Option<String>,
    pub invoice_group: u32,
    pub tiers: Vec<RevenueShareTier>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RevenueShareTier {
    #[schemars(description = "Upper revenue bound of the tier; absent for the open-ended top tier")]
    pub up_to: Option<f64>,
    #[schemars(description = "Share of revenue inside the tier as a 0-1 fraction")]
    pub share_percentage: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagementAgreementTerms {
    pub enabled: bool,
    pub fixed_fee: f64,
    pub revenue_percentage: f64,
    pub code: Option<String>,
    pub invoice_group: u32,

    pub additional_payroll: AdditionalPayrollTerms,
    pub billable_pteb: BillablePtebTerms,
    pub support_services: SupportServicesTerms,
    pub billable_accounts: BillableAccountTerms,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AdditionalPayrollTerms {
    pub enabled: bool,
    pub amount: f64,
    pub invoice_group: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum PtebType {
    #[default]
    Actual,
    Calculated,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct BillablePtebTerms {
    pub enabled: bool,
    pub pteb_type: PtebType,
    #[schemars(description = "Share of payroll billed as PTEB when pteb_type is Calculated (0-1)")]
    pub percentage: f64,
    pub invoice_group: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "PascalCase", tag = "type")]
pub enum SupportServicesKind {
    Fixed { amount: f64 },
    PercentageOfPayroll { percentage: f64 },
}

impl Default for SupportServicesKind {
    fn default() -> Self {
        Self::Fixed { amount: 0.0 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SupportServicesTerms {
    pub enabled: bool,
    pub kind: SupportServicesKind,
    pub invoice_group: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct BillableAccountTerms {
    pub enabled: bool,
    pub accounts: Vec<BillableAccount>,
    pub invoice_group: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct BillableAccount {
    pub code: String,
    pub title: Option<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct BellServiceTerms {
    pub enabled: bool,
    pub services: Vec<BellService>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct BellService {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub code: Option<String>,
    pub invoice_group: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct MidMonthAdvanceTerms {
    pub enabled: bool,
    pub advances: Vec<MidMonthAdvance>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum MidMonthLineTitle {
    #[default]
    Advance,
    Deduction,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct MidMonthAdvance {
    pub id: String,
    pub line_title: MidMonthLineTitle,
    pub amount: f64,
    #[schemars(description = "MidMonthAdvance GL code; defaulted when the catalog has exactly one")]
    pub code: Option<String>,
    pub invoice_group: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DepositedRevenueTerms {
    pub enabled: bool,
    #[schemars(description = "Towne Park deposits the parking revenue and credits it back on the invoice")]
    pub towne_park_deposits: bool,
    #[schemars(description = "DepositedRevenue GL code; defaulted when the catalog has exactly one")]
    pub code: Option<String>,
    pub invoice_group: u32,
}
