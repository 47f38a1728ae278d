pub mod config;
pub mod engine;
pub mod errors;
pub mod http;
pub mod logging;

pub use config::AppConfig;
pub use engine::Engine;
pub use errors::EngineError;
