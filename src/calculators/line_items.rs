use super::{BillingPeriod, ContractCalculator, ContractComponent, InternalRevenueLineItem};
use crate::contract::{ContractTerms, MidMonthLineTitle};
use crate::gl_codes::GlCodeCatalog;

pub struct BellServiceCalculator;

impl ContractCalculator for BellServiceCalculator {
    fn component(&self) -> ContractComponent {
        ContractComponent::BellService
    }

    fn is_enabled(&self, terms: &ContractTerms) -> bool {
        terms.bell_service.enabled
    }

    fn compute(
        &self,
        terms: &ContractTerms,
        period: &BillingPeriod<'_>,
        _catalog: &GlCodeCatalog,
    ) -> Vec<InternalRevenueLineItem> {
        terms
            .bell_service
            .services
            .iter()
            .map(|service| {
                InternalRevenueLineItem::new(
                    ContractComponent::BellService,
                    period,
                    service.code.clone(),
                    format!("Bell Service - {}", service.name),
                    service.amount,
                    service.invoice_group,
                )
            })
            .collect()
    }
}

/// Advances are billed mid-month; deductions credit an earlier advance back.
pub struct MidMonthAdvanceCalculator;

impl ContractCalculator for MidMonthAdvanceCalculator {
    fn component(&self) -> ContractComponent {
        ContractComponent::MidMonthAdvance
    }

    fn is_enabled(&self, terms: &ContractTerms) -> bool {
        terms.mid_month_advance.enabled
    }

    fn compute(
        &self,
        terms: &ContractTerms,
        period: &BillingPeriod<'_>,
        _catalog: &GlCodeCatalog,
    ) -> Vec<InternalRevenueLineItem> {
        terms
            .mid_month_advance
            .advances
            .iter()
            .map(|advance| {
                let (description, amount) = match advance.line_title {
                    MidMonthLineTitle::Advance => ("Mid-Month Advance", advance.amount.abs()),
                    MidMonthLineTitle::Deduction => ("Mid-Month Deduction", -advance.amount.abs()),
                };

                InternalRevenueLineItem::new(
                    ContractComponent::MidMonthAdvance,
                    period,
                    advance.code.clone(),
                    description,
                    amount,
                    advance.invoice_group,
                )
            })
            .collect()
    }
}

pub struct DepositedRevenueCalculator;

impl ContractCalculator for DepositedRevenueCalculator {
    fn component(&self) -> ContractComponent {
        ContractComponent::DepositedRevenue
    }

    fn is_enabled(&self, terms: &ContractTerms) -> bool {
        terms.deposited_revenue.enabled
    }

    fn compute(
        &self,
        terms: &ContractTerms,
        period: &BillingPeriod<'_>,
        _catalog: &GlCodeCatalog,
    ) -> Vec<InternalRevenueLineItem> {
        let deposited = &terms.deposited_revenue;
        if !deposited.towne_park_deposits {
            return Vec::new();
        }

        vec![InternalRevenueLineItem::new(
            ContractComponent::DepositedRevenue,
            period,
            deposited.code.clone(),
            "Deposited Revenue Credit",
            -period.external_revenue,
            deposited.invoice_group,
        )]
    }
}
