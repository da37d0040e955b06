//! Management-agreement billing. The fee itself plus four sub-components, each gated by
//! both its own flag and the agreement's flag.

use super::{BillingPeriod, ContractCalculator, ContractComponent, InternalRevenueLineItem};
use crate::contract::{ContractTerms, PtebType, SupportServicesKind};
use crate::gl_codes::GlCodeCatalog;

pub struct ManagementFeeCalculator;

impl ContractCalculator for ManagementFeeCalculator {
    fn component(&self) -> ContractComponent {
        ContractComponent::ManagementAgreement
    }

    fn is_enabled(&self, terms: &ContractTerms) -> bool {
        terms.management_agreement.enabled
    }

    fn compute(
        &self,
        terms: &ContractTerms,
        period: &BillingPeriod<'_>,
        _catalog: &GlCodeCatalog,
    ) -> Vec<InternalRevenueLineItem> {
        let agreement = &terms.management_agreement;

        vec![InternalRevenueLineItem::new(
            ContractComponent::ManagementAgreement,
            period,
            agreement.code.clone(),
            "Management Fee",
            agreement.fixed_fee + agreement.revenue_percentage * period.external_revenue,
            agreement.invoice_group,
        )]
    }
}

pub struct AdditionalPayrollAmountCalculator;

impl ContractCalculator for AdditionalPayrollAmountCalculator {
    fn component(&self) -> ContractComponent {
        ContractComponent::AdditionalPayrollAmount
    }

    fn is_enabled(&self, terms: &ContractTerms) -> bool {
        terms.management_agreement.enabled && terms.management_agreement.additional_payroll.enabled
    }

    fn compute(
        &self,
        terms: &ContractTerms,
        period: &BillingPeriod<'_>,
        _catalog: &GlCodeCatalog,
    ) -> Vec<InternalRevenueLineItem> {
        let additional = &terms.management_agreement.additional_payroll;

        vec![InternalRevenueLineItem::new(
            ContractComponent::AdditionalPayrollAmount,
            period,
            None,
            "Additional Payroll",
            additional.amount,
            additional.invoice_group,
        )]
    }
}

pub struct BillablePtebCalculator;

impl ContractCalculator for BillablePtebCalculator {
    fn component(&self) -> ContractComponent {
        ContractComponent::BillablePteb
    }

    fn is_enabled(&self, terms: &ContractTerms) -> bool {
        terms.management_agreement.enabled && terms.management_agreement.billable_pteb.enabled
    }

    fn compute(
        &self,
        terms: &ContractTerms,
        period: &BillingPeriod<'_>,
        _catalog: &GlCodeCatalog,
    ) -> Vec<InternalRevenueLineItem> {
        let pteb = &terms.management_agreement.billable_pteb;
        let amount = match pteb.pteb_type {
            PtebType::Actual => period.costs.pteb,
            PtebType::Calculated => period.costs.payroll * pteb.percentage,
        };

        vec![InternalRevenueLineItem::new(
            ContractComponent::BillablePteb,
            period,
            None,
            "Payroll Taxes & Benefits",
            amount,
            pteb.invoice_group,
        )]
    }
}

pub struct SupportServicesCalculator;

impl ContractCalculator for SupportServicesCalculator {
    fn component(&self) -> ContractComponent {
        ContractComponent::SupportServices
    }

    fn is_enabled(&self, terms: &ContractTerms) -> bool {
        terms.management_agreement.enabled && terms.management_agreement.support_services.enabled
    }

    fn compute(
        &self,
        terms: &ContractTerms,
        period: &BillingPeriod<'_>,
        _catalog: &GlCodeCatalog,
    ) -> Vec<InternalRevenueLineItem> {
        let support = &terms.management_agreement.support_services;
        let amount = match support.kind {
            SupportServicesKind::Fixed { amount } => amount,
            SupportServicesKind::PercentageOfPayroll { percentage } => {
                period.costs.payroll * percentage
            }
        };

        vec![InternalRevenueLineItem::new(
            ContractComponent::SupportServices,
            period,
            None,
            "Support Services",
            amount,
            support.invoice_group,
        )]
    }
}

/// Re-bills recorded expenses for each enabled billable GL account.
pub struct ExpenseAccountCalculator;

impl ContractCalculator for ExpenseAccountCalculator {
    fn component(&self) -> ContractComponent {
        ContractComponent::ExpenseAccount
    }

    fn is_enabled(&self, terms: &ContractTerms) -> bool {
        terms.management_agreement.enabled && terms.management_agreement.billable_accounts.enabled
    }

    fn compute(
        &self,
        terms: &ContractTerms,
        period: &BillingPeriod<'_>,
        catalog: &GlCodeCatalog,
    ) -> Vec<InternalRevenueLineItem> {
        let billable = &terms.management_agreement.billable_accounts;

        billable
            .accounts
            .iter()
            .filter(|account| account.enabled)
            .filter_map(|account| {
                let amount = *period.costs.expenses.get(account.code.trim())?;
                let description = account
                    .title
                    .clone()
                    .or_else(|| catalog.name_for_code(&account.code).map(str::to_string))
                    .unwrap_or_else(|| account.code.clone());

                Some(InternalRevenueLineItem::new(
                    ContractComponent::ExpenseAccount,
                    period,
                    Some(account.code.clone()),
                    description,
                    amount,
                    billable.invoice_group,
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculators::test_support::{period, statistics};
    use crate::calculators::PeriodCosts;
    use crate::contract::BillableAccount;
    use crate::gl_codes::{GlCodeEntry, GlCodeType};

    fn agreement_terms() -> ContractTerms {
        let mut terms = ContractTerms::default();
        terms.management_agreement.enabled = true;
        terms.management_agreement.fixed_fee = 2_000.0;
        terms.management_agreement.revenue_percentage = 0.05;
        terms
    }

    fn costs() -> PeriodCosts {
        PeriodCosts {
            payroll: 40_000.0,
            pteb: 9_000.0,
            ..PeriodCosts::default()
        }
    }

    #[test]
    fn test_management_fee() {
        let terms = agreement_terms();
        let stats = statistics(0.0);
        let costs = costs();
        let items = ManagementFeeCalculator.compute(
            &terms,
            &period(&stats, 100_000.0, &costs),
            &GlCodeCatalog::default(),
        );
        assert!((items[0].amount - 7_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_sub_components_need_agreement_enabled() {
        let mut terms = agreement_terms();
        terms.management_agreement.billable_pteb.enabled = true;
        terms.management_agreement.support_services.enabled = true;
        assert!(BillablePtebCalculator.is_enabled(&terms));
        assert!(SupportServicesCalculator.is_enabled(&terms));
        assert!(!AdditionalPayrollAmountCalculator.is_enabled(&terms));

        terms.management_agreement.enabled = false;
        assert!(!BillablePtebCalculator.is_enabled(&terms));
        assert!(!SupportServicesCalculator.is_enabled(&terms));
    }

    #[test]
    fn test_billable_pteb_actual_and_calculated() {
        let mut terms = agreement_terms();
        terms.management_agreement.billable_pteb.enabled = true;
        let stats = statistics(0.0);
        let costs = costs();
        let p = period(&stats, 0.0, &costs);

        let items = BillablePtebCalculator.compute(&terms, &p, &GlCodeCatalog::default());
        assert_eq!(items[0].amount, 9_000.0);

        terms.management_agreement.billable_pteb.pteb_type = PtebType::Calculated;
        terms.management_agreement.billable_pteb.percentage = 0.25;
        let items = BillablePtebCalculator.compute(&terms, &p, &GlCodeCatalog::default());
        assert!((items[0].amount - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_support_services_kinds() {
        let mut terms = agreement_terms();
        terms.management_agreement.support_services.enabled = true;
        terms.management_agreement.support_services.kind = SupportServicesKind::Fixed { amount: 750.0 };
        let stats = statistics(0.0);
        let costs = costs();
        let p = period(&stats, 0.0, &costs);

        let items = SupportServicesCalculator.compute(&terms, &p, &GlCodeCatalog::default());
        assert_eq!(items[0].amount, 750.0);

        terms.management_agreement.support_services.kind =
            SupportServicesKind::PercentageOfPayroll { percentage: 0.02 };
        let items = SupportServicesCalculator.compute(&terms, &p, &GlCodeCatalog::default());
        assert!((items[0].amount - 800.0).abs() < 1e-9);
    }

    #[test]
    fn test_additional_payroll() {
        let mut terms = agreement_terms();
        terms.management_agreement.additional_payroll.enabled = true;
        terms.management_agreement.additional_payroll.amount = 1_250.0;
        let stats = statistics(0.0);
        let costs = costs();

        let items = AdditionalPayrollAmountCalculator.compute(
            &terms,
            &period(&stats, 0.0, &costs),
            &GlCodeCatalog::default(),
        );
        assert_eq!(items[0].amount, 1_250.0);
    }

    #[test]
    fn test_expense_accounts_only_with_recorded_expense() {
        let mut terms = agreement_terms();
        let billable = &mut terms.management_agreement.billable_accounts;
        billable.enabled = true;
        billable.accounts = vec![
            BillableAccount {
                code: "7010".to_string(),
                title: None,
                enabled: true,
            },
            BillableAccount {
                code: "7020".to_string(),
                title: Some("Uniforms".to_string()),
                enabled: false,
            },
            BillableAccount {
                code: "7030".to_string(),
                title: None,
                enabled: true,
            },
        ];

        let mut costs = costs();
        costs.expenses.insert("7010".to_string(), 320.0);
        costs.expenses.insert("7020".to_string(), 99.0);
        let catalog = GlCodeCatalog::new(vec![GlCodeEntry::new(
            "7010",
            "Cleaning Supplies",
            GlCodeType::ExpenseAccount,
        )]);

        let stats = statistics(0.0);
        let items = ExpenseAccountCalculator.compute(&terms, &period(&stats, 0.0, &costs), &catalog);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Cleaning Supplies");
        assert_eq!(items[0].amount, 320.0);
    }
}
