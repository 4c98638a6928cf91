//! Request and Response models for the catalog API
//!
//! The product record with its request-body validation, plus the auxiliary
//! response bodies.

pub mod product;
pub mod responses;

// Re-export commonly used types
pub use product::{PriceInput, Product, ProductFields, ProductInput, REQUIRED_FIELDS_MESSAGE};
pub use responses::{ErrorResponse, StatsResponse};
