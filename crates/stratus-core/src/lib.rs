pub mod config;
pub mod env;
pub mod error;
pub mod queues;

pub use config::StratusConfig;
pub use env::Environment;
pub use error::{ConfigError, ConfigResult};
pub use queues::QueueMap;
