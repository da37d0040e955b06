//! General-ledger code catalog and the validation gate every contract mutation passes through.

use crate::contract::ContractTerms;
use crate::error::{BillingEngineError, Result};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum GlCodeType {
    Service,
    SalariedJob,
    NonSalariedJob,
    PerOccupiedRoom,
    RevenueShare,
    ManagementAgreement,
    BellServiceFee,
    MidMonthAdvance,
    DepositedRevenue,
    ExpenseAccount,
}

impl GlCodeType {
    pub const ALL: [GlCodeType; 10] = [
        GlCodeType::Service,
        GlCodeType::SalariedJob,
        GlCodeType::NonSalariedJob,
        GlCodeType::PerOccupiedRoom,
        GlCodeType::RevenueShare,
        GlCodeType::ManagementAgreement,
        GlCodeType::BellServiceFee,
        GlCodeType::MidMonthAdvance,
        GlCodeType::DepositedRevenue,
        GlCodeType::ExpenseAccount,
    ];
}

impl fmt::Display for GlCodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GlCodeEntry {
    pub code: String,
    pub name: String,
    pub code_type: GlCodeType,
}

impl GlCodeEntry {
    pub fn new(code: &str, name: &str, code_type: GlCodeType) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            code_type,
        }
    }
}

/// Read-only catalog snapshot. Lookups by (type, code) and (type, name) resolve to the
/// first entry in catalog order; later duplicates are ignored.
#[derive(Debug, Clone, Default)]
pub struct GlCodeCatalog {
    entries: Vec<GlCodeEntry>,
    by_code: HashMap<(GlCodeType, String), usize>,
    by_name: HashMap<(GlCodeType, String), usize>,
}

impl GlCodeCatalog {
    pub fn new(entries: Vec<GlCodeEntry>) -> Self {
        let mut by_code = HashMap::new();
        let mut by_name = HashMap::new();

        for (idx, entry) in entries.iter().enumerate() {
            by_code
                .entry((entry.code_type, entry.code.trim().to_string()))
                .or_insert(idx);
            by_name
                .entry((entry.code_type, entry.name.trim().to_string()))
                .or_insert(idx);
        }

        Self {
            entries,
            by_code,
            by_name,
        }
    }

    pub fn entries(&self) -> &[GlCodeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn filtered(&self, types: &BTreeSet<GlCodeType>) -> Self {
        Self::new(
            self.entries
                .iter()
                .filter(|e| types.contains(&e.code_type))
                .cloned()
                .collect(),
        )
    }

    pub fn find_by_code(&self, code_type: GlCodeType, code: &str) -> Option<&GlCodeEntry> {
        self.by_code
            .get(&(code_type, code.trim().to_string()))
            .map(|&idx| &self.entries[idx])
    }

    pub fn find_by_name(&self, code_type: GlCodeType, name: &str) -> Option<&GlCodeEntry> {
        self.by_name
            .get(&(code_type, name.trim().to_string()))
            .map(|&idx| &self.entries[idx])
    }

    pub fn first_of_type(&self, code_type: GlCodeType) -> Option<&GlCodeEntry> {
        self.entries.iter().find(|e| e.code_type == code_type)
    }

    /// Display name for a code of any type, first occurrence wins.
    pub fn name_for_code(&self, code: &str) -> Option<&str> {
        let code = code.trim();
        self.entries
            .iter()
            .find(|e| e.code.trim() == code)
            .map(|e| e.name.as_str())
    }
}

/// Catalog types a contract needs, derived from its enabled components.
pub fn required_code_types(terms: &ContractTerms) -> BTreeSet<GlCodeType> {
    let mut types = BTreeSet::new();

    if terms.fixed_fee.enabled {
        types.insert(GlCodeType::Service);
    }
    if terms.per_labor_hour.enabled {
        types.insert(GlCodeType::SalariedJob);
        types.insert(GlCodeType::NonSalariedJob);
    }
    if terms.per_occupied_room.enabled {
        types.insert(GlCodeType::PerOccupiedRoom);
    }
    if terms.revenue_share.enabled {
        types.insert(GlCodeType::RevenueShare);
    }
    if terms.management_agreement.enabled {
        types.insert(GlCodeType::ManagementAgreement);
        if terms.management_agreement.billable_accounts.enabled {
            types.insert(GlCodeType::ExpenseAccount);
        }
    }
    if terms.bell_service.enabled {
        types.insert(GlCodeType::BellServiceFee);
    }
    if terms.mid_month_advance.enabled {
        types.insert(GlCodeType::MidMonthAdvance);
    }
    if terms.deposited_revenue.enabled {
        types.insert(GlCodeType::DepositedRevenue);
    }

    types
}

pub struct GlCodeValidator<'a> {
    catalog: &'a GlCodeCatalog,
}

impl<'a> GlCodeValidator<'a> {
    pub fn new(catalog: &'a GlCodeCatalog) -> Self {
        Self { catalog }
    }

    /// Validates every GL reference of `terms` and fills in the codes the caller never supplies.
    ///
    /// Works on a copy: on error the caller's contract is untouched and nothing is populated.
    pub fn validate_and_populate(&self, terms: &ContractTerms) -> Result<ContractTerms> {
        let mut validated = terms.clone();

        // 1. Fixed-fee service codes must already exist
        if validated.fixed_fee.enabled {
            for rate in &validated.fixed_fee.service_rates {
                self.require_code(GlCodeType::Service, &rate.code)?;
            }
        }

        // 2. Job codes are always recomputed from the job name
        if validated.per_labor_hour.enabled {
            for job in &mut validated.per_labor_hour.job_rates {
                let entry = self
                    .catalog
                    .find_by_name(GlCodeType::SalariedJob, &job.name)
                    .or_else(|| self.catalog.find_by_name(GlCodeType::NonSalariedJob, &job.name))
                    .ok_or_else(|| BillingEngineError::InvalidJobName(job.name.clone()))?;
                job.job_code = Some(entry.code.clone());
            }
        }

        // 3. Occupied-room code comes from the single catalog entry, when there is one
        if validated.per_occupied_room.enabled {
            validated.per_occupied_room.code = self
                .catalog
                .first_of_type(GlCodeType::PerOccupiedRoom)
                .map(|e| e.code.clone());
            if validated.per_occupied_room.code.is_none() {
                debug!(
                    "No PerOccupiedRoom GL code in catalog for contract {}",
                    validated.contract_id
                );
            }
        }

        // 4. Optional references: verify when supplied, default when unambiguous
        if validated.revenue_share.enabled {
            for threshold in &mut validated.revenue_share.thresholds {
                threshold.code = self.resolve_optional(GlCodeType::RevenueShare, &threshold.code)?;
            }
        }
        if validated.management_agreement.enabled {
            let agreement = &mut validated.management_agreement;
            agreement.code = self.resolve_optional(GlCodeType::ManagementAgreement, &agreement.code)?;
        }
        if validated.bell_service.enabled {
            for service in &mut validated.bell_service.services {
                service.code = self.resolve_optional(GlCodeType::BellServiceFee, &service.code)?;
            }
        }
        if validated.mid_month_advance.enabled {
            for advance in &mut validated.mid_month_advance.advances {
                advance.code = self.resolve_optional(GlCodeType::MidMonthAdvance, &advance.code)?;
            }
        }
        if validated.deposited_revenue.enabled {
            let deposited = &mut validated.deposited_revenue;
            deposited.code = self.resolve_optional(GlCodeType::DepositedRevenue, &deposited.code)?;
        }

        Ok(validated)
    }

    fn require_code(&self, code_type: GlCodeType, code: &str) -> Result<()> {
        match self.catalog.find_by_code(code_type, code) {
            Some(_) => Ok(()),
            None => Err(BillingEngineError::GlCodeNotFound {
                code: code.to_string(),
                code_type: code_type.to_string(),
            }),
        }
    }

    fn resolve_optional(&self, code_type: GlCodeType, supplied: &Option<String>) -> Result<Option<String>> {
        match supplied.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => {
                self.require_code(code_type, code)?;
                Ok(Some(code.to_string()))
            }
            None => {
                let mut of_type = self
                    .catalog
                    .entries()
                    .iter()
                    .filter(|e| e.code_type == code_type);
                match (of_type.next(), of_type.next()) {
                    (Some(only), None) => Ok(Some(only.code.clone())),
                    _ => Ok(None),
                }
            }
        }
    }
}
