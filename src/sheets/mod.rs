//! Remote spreadsheet store: wire protocol, client, and typed rows.

mod api_types;
mod client;
mod error;
mod types;

#[cfg(test)]
pub mod testing;

pub use api_types::{
  classify_response, de_number, de_text, AppsScriptRequest, AppsScriptResponse, FileUpload, SheetWrite, WriteAck,
};
pub use client::{AppsScriptClient, RemoteStore};
pub use error::StoreError;
pub use types::*;
