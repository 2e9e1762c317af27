//! API Module
//!
//! HTTP handlers and routing for the cache administration API.
//!
//! # Endpoints
//! - `PUT /set` - Store a JSON value
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key
//! - `GET /exists/:key` - Check a key without reading it
//! - `POST /incr/:key` - Increment a counter
//! - `POST /mset` / `POST /mget` - Batch write and read
//! - `DELETE /clear` - Remove every entry
//! - `DELETE /invalidate/product/:id` - Drop a product and all product lists
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Durable backend health

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
