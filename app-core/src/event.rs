/// Contract for events queued by the frontend and applied once per frame.
///
/// An event that waits on something (a file dialog thread, a backend reply)
/// returns `Busy` and is re-queued for the next frame.
pub trait AppEvent {
    type App;
    fn apply(&mut self, app: &mut Self::App) -> Result<EventState, String>;
}

pub enum EventState {
    Finished,
    Busy,
}
