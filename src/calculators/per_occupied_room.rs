use super::{BillingPeriod, ContractCalculator, ContractComponent, InternalRevenueLineItem};
use crate::contract::ContractTerms;
use crate::gl_codes::GlCodeCatalog;

pub struct PerOccupiedRoomCalculator;

impl ContractCalculator for PerOccupiedRoomCalculator {
    fn component(&self) -> ContractComponent {
        ContractComponent::PerOccupiedRoom
    }

    fn is_enabled(&self, terms: &ContractTerms) -> bool {
        terms.per_occupied_room.enabled
    }

    fn compute(
        &self,
        terms: &ContractTerms,
        period: &BillingPeriod<'_>,
        catalog: &GlCodeCatalog,
    ) -> Vec<InternalRevenueLineItem> {
        let room = &terms.per_occupied_room;
        let occupied_rooms = period.statistics.occupied_rooms_value();
        let description = room
            .code
            .as_deref()
            .and_then(|code| catalog.name_for_code(code))
            .unwrap_or("Per Occupied Room");

        vec![InternalRevenueLineItem::new(
            ContractComponent::PerOccupiedRoom,
            period,
            room.code.clone(),
            description,
            occupied_rooms * room.room_rate,
            room.invoice_group,
        )]
    }
}
