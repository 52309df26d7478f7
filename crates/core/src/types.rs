/// Per-request session identifier. Always a freshly generated UUID v4.
pub type SessionId = uuid::Uuid;
