use super::{BillingPeriod, ContractCalculator, ContractComponent, InternalRevenueLineItem};
use crate::contract::{ContractTerms, RevenueShareTier};
use crate::gl_codes::GlCodeCatalog;

/// Marginal tiered share: each tier's percentage applies only to the revenue inside it.
pub fn tiered_share(revenue: f64, tiers: &[RevenueShareTier]) -> f64 {
    let mut ordered: Vec<&RevenueShareTier> = tiers.iter().collect();
    ordered.sort_by(|a, b| {
        a.up_to
            .unwrap_or(f64::INFINITY)
            .total_cmp(&b.up_to.unwrap_or(f64::INFINITY))
    });

    let mut share = 0.0;
    let mut lower = 0.0;
    for tier in ordered {
        let upper = tier.up_to.unwrap_or(f64::INFINITY);
        let portion = (revenue.min(upper) - lower).max(0.0);
        share += portion * tier.share_percentage;

        if revenue <= upper {
            break;
        }
        lower = upper;
    }

    share
}

pub struct RevenueShareCalculator;

impl ContractCalculator for RevenueShareCalculator {
    fn component(&self) -> ContractComponent {
        ContractComponent::RevenueShare
    }

    fn is_enabled(&self, terms: &ContractTerms) -> bool {
        terms.revenue_share.enabled
    }

    fn compute(
        &self,
        terms: &ContractTerms,
        period: &BillingPeriod<'_>,
        _catalog: &GlCodeCatalog,
    ) -> Vec<InternalRevenueLineItem> {
        terms
            .revenue_share
            .thresholds
            .iter()
            .map(|threshold| {
                InternalRevenueLineItem::new(
                    ContractComponent::RevenueShare,
                    period,
                    threshold.code.clone(),
                    format!("Revenue Share - {}", threshold.name),
                    tiered_share(period.external_revenue, &threshold.tiers),
                    threshold.invoice_group,
                )
            })
            .collect()
    }
}
