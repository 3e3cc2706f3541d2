use std::sync::Arc;

use crate::service::coordinator::RecordingCoordinator;

pub mod recordings;

#[derive(Clone)]
pub struct AppState {
    pub recordings: Arc<RecordingCoordinator>,
}
