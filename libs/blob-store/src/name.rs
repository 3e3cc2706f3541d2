use std::path::{Component, Path};

use uuid::Uuid;

/// Generate a blob name from a millisecond timestamp and a random v4 UUID.
/// Format: {millis}-{uuid as 32 lowercase hex}.{extension}
pub fn generate_name(millis: i64, extension: &str) -> String {
    format!("{}-{}.{}", millis, Uuid::new_v4().simple(), extension)
}

/// Generate a blob name stamped with the current time
pub fn generate_name_now(extension: &str) -> String {
    generate_name(chrono::Utc::now().timestamp_millis(), extension)
}

/// Split a generated name back into its timestamp and UUID parts
pub fn parse_name(name: &str) -> Option<(i64, Uuid)> {
    let (stem, _extension) = name.rsplit_once('.')?;
    let (millis, suffix) = stem.split_once('-')?;
    if suffix.len() != 32 {
        return None;
    }
    Some((millis.parse().ok()?, Uuid::parse_str(suffix).ok()?))
}

/// A blob key must be a plain relative path without any parent traversal
pub fn validate_key(key: &str) -> bool {
    !key.is_empty()
        && Path::new(key)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}
