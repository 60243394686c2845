//! # Domain Module
//!
//! Core domain types for ledger queries and block crawling.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod proposal;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use proposal::*;
pub use value_objects::*;
