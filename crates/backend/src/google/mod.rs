//! Clients for the Google provider boundary.
//!
//! Each client wraps the relevant REST API with typed request/response
//! structs validated at the boundary, so malformed upstream data fails
//! during deserialization instead of propagating empty-string sentinels.

pub mod calendar;
pub mod drive;
pub mod oauth;
