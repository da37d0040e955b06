use super::{BillingPeriod, ContractCalculator, ContractComponent, InternalRevenueLineItem};
use crate::contract::ContractTerms;
use crate::gl_codes::GlCodeCatalog;

/// One line per service rate, billed at its flat fee.
pub struct FixedFeeCalculator;

impl ContractCalculator for FixedFeeCalculator {
    fn component(&self) -> ContractComponent {
        ContractComponent::FixedFee
    }

    fn is_enabled(&self, terms: &ContractTerms) -> bool {
        terms.fixed_fee.enabled
    }

    fn compute(
        &self,
        terms: &ContractTerms,
        period: &BillingPeriod<'_>,
        catalog: &GlCodeCatalog,
    ) -> Vec<InternalRevenueLineItem> {
        terms
            .fixed_fee
            .service_rates
            .iter()
            .map(|rate| {
                let description = if rate.display_name.is_empty() {
                    catalog
                        .name_for_code(&rate.code)
                        .unwrap_or(&rate.name)
                        .to_string()
                } else {
                    rate.display_name.clone()
                };

                InternalRevenueLineItem::new(
                    ContractComponent::FixedFee,
                    period,
                    Some(rate.code.clone()),
                    description,
                    rate.fee,
                    rate.invoice_group,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculators::test_support::{period, statistics};
    use crate::calculators::PeriodCosts;
    use crate::contract::FixedFeeServiceRate;
    use crate::gl_codes::{GlCodeEntry, GlCodeType};

    #[test]
    fn test_fee_per_service_rate() {
        let mut terms = ContractTerms::default();
        terms.fixed_fee.enabled = true;
        terms.fixed_fee.service_rates = vec![
            FixedFeeServiceRate {
                name: "valet".to_string(),
                code: "4010".to_string(),
                fee: 1500.0,
                invoice_group: 1,
                ..FixedFeeServiceRate::default()
            },
            FixedFeeServiceRate {
                name: "shuttle".to_string(),
                display_name: "Shuttle Service".to_string(),
                code: "4020".to_string(),
                fee: 800.0,
                invoice_group: 2,
                ..FixedFeeServiceRate::default()
            },
        ];
        let catalog = GlCodeCatalog::new(vec![GlCodeEntry::new(
            "4010",
            "Valet Services",
            GlCodeType::Service,
        )]);

        let stats = statistics(0.0);
        let costs = PeriodCosts::default();
        let items = FixedFeeCalculator.compute(&terms, &period(&stats, 0.0, &costs), &catalog);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description, "Valet Services");
        assert_eq!(items[0].amount, 1500.0);
        assert_eq!(items[1].description, "Shuttle Service");
        assert_eq!(items[1].gl_code.as_deref(), Some("4020"));
        assert_eq!(items[1].invoice_group, 2);
    }
}
