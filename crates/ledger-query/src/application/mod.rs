//! # Application Module
//!
//! Session cache and the query facade orchestrating domain and ports.

pub mod service;
pub mod session;

pub use service::{LedgerQueryService, DURATION_SECONDS, ERRORS_TOTAL, REQUESTS_TOTAL};
pub use session::{ChannelHandle, ClientHandle, SessionCache};
