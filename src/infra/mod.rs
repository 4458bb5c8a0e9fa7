//! Infrastructure adapters: the C boundary and runtime bootstrap.

pub mod error;
pub mod ffi;
pub mod telemetry;
