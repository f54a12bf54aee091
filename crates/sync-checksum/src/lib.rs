pub mod detect;
pub mod digest;
pub mod transition;

pub use detect::{detect_change, ChangeDecision, PriorEntry};
pub use digest::{compute_digest, DigestError, SAMPLE_THRESHOLD_BYTES};
pub use transition::FileTransition;
