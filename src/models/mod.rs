//! Request and Response models for the cache server API
//!
//! DTOs serialized to and from HTTP request and response bodies.

pub mod requests;
pub mod responses;

pub use requests::{IncrRequest, MgetRequest, MsetItem, MsetRequest, SetRequest};
pub use responses::{
    ClearResponse, DeleteResponse, ExistsResponse, GetResponse, HealthResponse, IncrResponse,
    MgetResponse, MsetResponse, SetResponse, StatsResponse,
};
