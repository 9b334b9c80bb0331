pub mod data;
pub mod instrument;
pub mod measurement;

use app_core::backend::BackendState;

use self::instrument::Instrument;

/// State owned by the backend worker thread. File parsing requests carry
/// their paths with them, so the only long-lived state is the instrument
/// handle.
pub struct BackendAppState {
    pub instrument: Box<dyn Instrument>,
}

impl BackendState for BackendAppState {}

impl BackendAppState {
    pub fn new(instrument: Box<dyn Instrument>) -> Self {
        Self { instrument }
    }
}
