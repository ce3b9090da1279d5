// Port Layer - Interfaces for external collaborators

pub mod crypto;
pub mod grammar;
pub mod profile_registry;
pub mod time_provider; // For deterministic testing
pub mod transport;
pub mod trust_prompt;
pub mod user_directory;

// Re-exports
pub use crypto::CryptoService;
pub use grammar::{MessageCodec, ProtocolGrammar};
pub use profile_registry::ProfileRegistry;
pub use time_provider::{FixedTimeProvider, SystemTimeProvider, TimeProvider};
pub use transport::Transport;
pub use trust_prompt::TrustPrompt;
pub use user_directory::UserDirectory;
