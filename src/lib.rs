//! Cached order and reference-data backend over a spreadsheet web app.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod notify;
pub mod orders;
pub mod report;
pub mod service;
pub mod sheets;
pub mod tasks;
pub mod upload;

pub use error::{Error, Result};
pub use service::SheetService;
