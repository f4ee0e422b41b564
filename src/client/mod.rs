//! Headless dashboard client: a typed HTTP client plus one view-model per
//! page. View-models hold the page state and perform the same requests a
//! rendered page would.

pub mod api;
pub mod categories;
pub mod chat;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod lifecycle;
pub mod pagination;
pub mod projections;
pub mod session;
pub mod settings;
pub mod shell;
pub mod transactions;
pub mod ui;
pub mod upload;

pub use api::ApiClient;
pub use error::{ClientError, ClientResult};
pub use session::{Session, SessionHandle, SessionStore};
