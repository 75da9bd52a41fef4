//! HTTP subsystem: server glue and request identification.
//!
//! The server owns no routing logic; it normalizes request metadata
//! (host, protocol, request ID) and hands the path to [`crate::Site`].

pub mod request;
pub mod server;

pub use server::{DirectiveRenderer, HttpServer, Renderer};
