// Application Layer - Use cases driving jobs through dialogs

pub mod dialog;
pub mod job_factory;
pub mod jobs;
pub mod security;
pub mod sepa;
pub mod settings;

// Re-exports
pub use dialog::{DialogReport, DialogRunner};
pub use job_factory::JobFactory;
pub use security::SecurityVerifier;
pub use sepa::SepaProfileService;
pub use settings::{EngineSettings, UnsignedResponsePolicy};
