// Configuration loading

pub mod settings;

pub use settings::{BotConfig, ConfigError, Source};
