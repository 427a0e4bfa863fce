//! HTTP admin endpoint.
//!
//! The mutating routes manage the allow-list and are only honored from the
//! loopback address; the public routes tell misdirected HTTP-tracker
//! clients where they went wrong.

pub mod handlers;
pub mod middlewares;
pub mod resources;
pub mod routes;
pub mod server;
