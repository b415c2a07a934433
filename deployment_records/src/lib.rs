pub mod error;
pub mod naming;
pub mod record;
pub mod recorder;

pub use error::RecordError;
pub use record::{DeploymentRecord, RESERVED_KEYS};
pub use recorder::DeploymentRecorder;
