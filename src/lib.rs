pub mod app;
pub mod bulk;
pub mod cli;
pub mod config;
pub mod folders;
pub mod model;
pub mod prefs;
pub mod search;
pub mod storage;
pub mod ui;
pub mod view;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use model::{CheckId, CheckRecord, CheckStatus};
