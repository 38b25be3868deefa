//! slipscan: extract transactions from bank and receipt screenshots through
//! a chain of vision-model providers.

pub mod config;
pub mod error;
pub mod image;
pub mod llm;
pub mod logging;
pub mod prompt;
pub mod server;

pub use config::{Config, load_config};
pub use llm::{HttpTransport, ProviderDescriptor, ProviderKind, VisionTransport};
pub use server::{AppState, ExtractRequest, ExtractResponse, app_router};
