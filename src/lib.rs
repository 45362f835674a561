pub mod backend;
pub mod catalog;
pub mod gallery;
pub mod jobs;
pub mod mcp;
pub mod request;
pub mod session;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::types::{GalleryEntry, JobStatus, StyleOption, VideoJob};
pub use backend::{BackendClient, VideoBackend};
pub use jobs::{JobOutcome, JobState, PollEngine, PollPolicy};
pub use request::{build, FormState, GenerationMode, GenerationRequest, ImageUpload, ValidationError};
pub use session::{GeneratorSession, SessionError};
