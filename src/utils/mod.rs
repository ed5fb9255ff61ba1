/// Tracing subscriber initialisation.
pub mod logging;
/// TOML configuration (`research.toml`).
pub mod toml_config;
