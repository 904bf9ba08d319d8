mod inspection_service;
mod lifecycle_service;
mod template_service;

pub use inspection_service::{InspectionDetail, InspectionService};
pub use lifecycle_service::{CompleteInspection, LifecycleService, SignatureRole};
pub use template_service::TemplateService;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::inspections::models::{Inspection, InspectionStatus};
use crate::modules::store::InspectionStore;

pub(crate) async fn find_inspection(store: &dyn InspectionStore, id: Uuid) -> Result<Inspection> {
    store
        .get_inspection(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Inspection {} not found", id)))
}

/// Persist `inspection` if nobody changed its status since it was read
pub(crate) async fn save_if_status(
    store: &dyn InspectionStore,
    inspection: &Inspection,
    expected: InspectionStatus,
) -> Result<()> {
    if store
        .update_inspection_if_status(inspection, expected)
        .await?
    {
        return Ok(());
    }
    tracing::warn!(
        "Stale write rejected for inspection {}: status is no longer {}",
        inspection.id,
        expected
    );
    Err(AppError::ConcurrencyAnomaly(format!(
        "Inspection {} changed while it was being updated; reload and retry",
        inspection.id
    )))
}
