use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::disputes::models::RaiseItemDispute;
use crate::features::inspections::models::ItemCondition;

/// A tenant's objection to one item's rating
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ItemDisputeDto {
    pub item_id: Uuid,
    #[validate(length(min = 1, max = 2000, message = "reason is required"))]
    pub reason: String,
}

impl From<ItemDisputeDto> for RaiseItemDispute {
    fn from(dto: ItemDisputeDto) -> Self {
        Self {
            item_id: dto.item_id,
            reason: dto.reason,
        }
    }
}

/// Owner response. Supplying `resolved_condition` resolves the dispute and re-rates the item.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RespondDisputeDto {
    #[validate(length(min = 1, max = 2000, message = "response is required"))]
    pub response: String,
    pub resolved_condition: Option<ItemCondition>,
}
