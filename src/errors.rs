//! Host-level errors.
//!
//! These cover the machinery around the interpreter: reading and decoding
//! `.emc` artifacts, resolving entry modules, machine configuration.
//! Language-level failures never surface here; they are Exception objects
//! that travel through the interpreter's own result channel.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed bytecode in '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no such module: {0}")]
    ModuleNotFound(String),
}
