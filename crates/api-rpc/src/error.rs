//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use chunkwise_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const THROTTLED: i32 = 4003;
    pub const NOT_FOUND: i32 = 4004;
    pub const NOT_IMPLEMENTED: i32 = 4010;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const STORE_ERROR: i32 = 5001;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match err {
        AppError::Validation(msg) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, msg, None::<()>)
        }
        AppError::Domain(e) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, e.to_string(), None::<()>)
        }
        AppError::Serialization(e) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, e.to_string(), None::<()>)
        }
        // Denied callers get the same answer as a missing resource
        AppError::AccessDenied(_) => not_found(),
        AppError::NotFound(msg) => ErrorObjectOwned::owned(code::NOT_FOUND, msg, None::<()>),
        AppError::NotImplemented(msg) => {
            ErrorObjectOwned::owned(code::NOT_IMPLEMENTED, msg, None::<()>)
        }
        err @ (AppError::Store(_) | AppError::CorruptCheckpoint { .. }) => {
            ErrorObjectOwned::owned(code::STORE_ERROR, err.to_string(), None::<()>)
        }
        AppError::Io(e) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, e.to_string(), None::<()>),
        AppError::Config(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
        AppError::Internal(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
    }
}

pub fn not_found() -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code::NOT_FOUND, "Not found", None::<()>)
}

pub fn throttled() -> ErrorObjectOwned {
    ErrorObjectOwned::owned(
        code::THROTTLED,
        "Rate limit exceeded. Please slow down.",
        None::<()>,
    )
}
