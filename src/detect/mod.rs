//! Detector/tracker backends.
//!
//! Detection, tracking, and model inference are external collaborators:
//! they live behind the `TrackerBackend` trait, and the rest of the crate
//! only consumes their tracked boxes. Track IDs are assigned and owned by
//! the backend; the dwell core never generates one.

mod backend;
mod backends;
mod registry;

pub use backend::{ObjectClass, TrackedBox, TrackerBackend};
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use registry::BackendRegistry;
