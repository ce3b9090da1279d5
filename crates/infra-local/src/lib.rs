// HBCI Infrastructure - Local Adapters
// Implements: ProtocolGrammar, MessageCodec, UserDirectory, ProfileRegistry

pub mod json_codec;
pub mod json_grammar;
pub mod profile_registry;
pub mod settings;
pub mod telemetry;
pub mod user_store;

pub use json_codec::JsonCodec;
pub use json_grammar::JsonGrammar;
pub use profile_registry::StaticProfileRegistry;
pub use settings::{default_settings_path, load_settings};
pub use telemetry::{init_tracing, LogFormat};
pub use user_store::JsonUserDirectory;
