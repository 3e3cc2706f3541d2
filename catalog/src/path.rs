pub const RECORDINGS: &str = "/api/recordings";
pub const RECORDING: &str = "/api/recordings/{id}";

/// Multipart field carrying the upload
pub const VIDEO_FIELD: &str = "video";

pub fn recording(id: impl std::fmt::Display) -> String {
    format!("{RECORDINGS}/{id}")
}
