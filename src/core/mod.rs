//! Core engine module
//!
//! Contains the main Engine struct, configuration, timing and errors

mod engine;
pub mod error;
mod time;

pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, ErrorKind, Result};
pub use time::Time;
