//! Frame-in-flight slots and the per-frame synchronization protocol.

mod backend;
mod executor;
mod slot;
mod state;

pub use backend::{AcquireOutcome, FrameBackend, PresentOutcome};
pub use executor::FrameExecutor;
pub use slot::{FrameSlot, create_slots};
pub(crate) use slot::destroy_slots;
pub use state::{FrameOutcome, FrameState};
