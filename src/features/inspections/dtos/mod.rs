mod evidence_dto;
mod inspection_dto;

pub use evidence_dto::{EvidenceForm, UploadEvidenceDto};
pub use inspection_dto::*;
