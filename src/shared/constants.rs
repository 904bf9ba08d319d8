/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// ACCESS TOKENS
// =============================================================================

/// Number of random bytes in an external inspector access token
pub const ACCESS_TOKEN_BYTES: usize = 16;

/// Lifetime of an access token from issuance
pub const ACCESS_TOKEN_TTL_HOURS: i64 = 48;

// =============================================================================
// COMPARISON ENGINE
// =============================================================================

/// Confidence multiplier when neither side of a comparison has photos
pub const LABEL_ONLY_CONFIDENCE_FACTOR: f64 = 0.6;

/// Confidence multiplier when only one side of a comparison has photos
pub const ONE_SIDED_EVIDENCE_CONFIDENCE_FACTOR: f64 = 0.8;

/// A processing comparison older than this may be taken over by a new run
pub const COMPARISON_STALE_AFTER_MINUTES: i64 = 15;

// =============================================================================
// EVIDENCE
// =============================================================================

/// Maximum upload size for a single photo or voice note
pub const MAX_EVIDENCE_SIZE: usize = 20 * 1024 * 1024;

/// Request body limit on upload routes: one file plus multipart overhead
pub const EVIDENCE_BODY_LIMIT: usize = MAX_EVIDENCE_SIZE + 1024 * 1024;

pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/heic"];

pub const ALLOWED_AUDIO_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/mp4",
    "audio/aac",
    "audio/wav",
    "audio/webm",
    "audio/ogg",
];

/// Name of the template seeded into every store
pub const DEFAULT_TEMPLATE_NAME: &str = "Standard residential";
