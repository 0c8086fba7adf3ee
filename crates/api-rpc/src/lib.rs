//! JSON-RPC API Layer
//!
//! Exposes the batch engine as JSON-RPC 2.0 methods. Every method passes the
//! access gate before it touches job state.

pub mod error;
pub mod gate;
pub mod handler;
pub mod rate_limiter;
pub mod server;
pub mod types;

pub use gate::TokenAccessGate;
pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig, ServerError};
