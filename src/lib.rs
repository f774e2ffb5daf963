pub mod app;
pub mod cli;
pub mod collection;
pub mod config;
pub mod drawing;
pub mod highlight;
pub mod model;
pub mod session;
pub mod storage;
pub mod ui;
pub mod view;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
