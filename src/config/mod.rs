//! Configuration: TOML settings file with built-in defaults.
pub mod settings;
pub mod toml_loader;

pub use settings::Settings;
