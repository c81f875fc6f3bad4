pub mod envelope;
pub mod merge;
pub mod severity;
pub mod status;

pub use envelope::{Envelope, HttpHeaders, HttpSummary};
pub use severity::SeverityTier;
pub use status::StatusDescriptor;
