mod evidence;
mod inspection;
mod room;
mod template;

pub use evidence::{ImageMetadata, InspectionImage, VoiceNote, VoiceNoteMetadata};
pub use inspection::{
    Inspection, InspectionStatus, InspectionType, OutsourceMode, OverallCondition,
    ScheduleInspection,
};
pub use room::{Item, ItemCondition, RateItem, Room, RoomWithItems};
pub use template::{default_template, RoomBlueprint, Template, TemplateRoom, TemplateWithRooms};
