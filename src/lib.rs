pub mod config;
pub mod db;
pub mod import;
pub mod reconcile;
pub mod settings;

/// Application name for XDG paths
pub const APP_NAME: &str = "backtrack";
