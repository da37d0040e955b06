use crate::calculators::InternalRevenueLineItem;
use crate::contract::ContractTerms;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceGroupTotal {
    pub group_number: u32,
    pub title: String,
    pub description: Option<String>,
    pub total: f64,
    pub line_items: Vec<InternalRevenueLineItem>,
}

/// Totals line items per invoice group.
///
/// With grouping disabled every item lands on invoice 1. Items pointing at a group the
/// contract does not define keep their number under a synthesized title.
pub fn group_line_items(
    terms: &ContractTerms,
    items: &[InternalRevenueLineItem],
) -> Vec<InvoiceGroupTotal> {
    let mut groups: BTreeMap<u32, InvoiceGroupTotal> = BTreeMap::new();

    for item in items {
        let number = if terms.invoice_grouping_enabled {
            item.invoice_group.max(1)
        } else {
            1
        };

        let group = groups.entry(number).or_insert_with(|| {
            let defined = terms
                .invoice_groups
                .iter()
                .find(|g| g.group_number == number);

            InvoiceGroupTotal {
                group_number: number,
                title: defined
                    .map(|g| g.title.clone())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| format!("Invoice {}", number)),
                description: defined.and_then(|g| g.description.clone()),
                total: 0.0,
                line_items: Vec::new(),
            }
        });

        group.total += item.amount;
        group.line_items.push(item.clone());
    }

    groups.into_values().collect()
}
