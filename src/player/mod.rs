pub mod coordinator;
pub mod queue;
pub mod state;
pub mod track;

pub use coordinator::PlaybackCoordinator;
pub use queue::TrackEndSignal;
pub use state::{Enqueued, PlaybackStatus, QueueView};
pub use track::Track;
