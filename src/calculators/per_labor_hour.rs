use super::{BillingPeriod, ContractCalculator, ContractComponent, InternalRevenueLineItem};
use crate::contract::ContractTerms;
use crate::gl_codes::GlCodeCatalog;

/// Bills worked hours per job: regular hours at the job rate, overtime at the overtime rate.
///
/// Hours are looked up by the job code populated during GL validation.
pub struct PerLaborHourCalculator;

impl ContractCalculator for PerLaborHourCalculator {
    fn component(&self) -> ContractComponent {
        ContractComponent::PerLaborHour
    }

    fn is_enabled(&self, terms: &ContractTerms) -> bool {
        terms.per_labor_hour.enabled
    }

    fn compute(
        &self,
        terms: &ContractTerms,
        period: &BillingPeriod<'_>,
        catalog: &GlCodeCatalog,
    ) -> Vec<InternalRevenueLineItem> {
        terms
            .per_labor_hour
            .job_rates
            .iter()
            .map(|job| {
                let hours = job
                    .job_code
                    .as_deref()
                    .and_then(|code| period.costs.labor_hours.get(code))
                    .copied()
                    .unwrap_or_default();

                let description = if job.display_name.is_empty() {
                    job.job_code
                        .as_deref()
                        .and_then(|code| catalog.name_for_code(code))
                        .unwrap_or(&job.name)
                        .to_string()
                } else {
                    job.display_name.clone()
                };

                InternalRevenueLineItem::new(
                    ContractComponent::PerLaborHour,
                    period,
                    job.job_code.clone(),
                    description,
                    hours.regular * job.rate + hours.overtime * job.overtime_rate,
                    job.invoice_group,
                )
            })
            .collect()
    }
}
