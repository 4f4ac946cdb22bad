/// Database configuration and connection management
pub mod database;

/// Product tier configuration from config.toml and the environment
pub mod tier;
