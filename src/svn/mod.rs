//! Adapters for the external Subversion toolchain.
//!
//! Two executables are wrapped: `svn` (read-oriented inspection, XML output)
//! and `svnadmin` (repository management). Both go through the same
//! executor ([`exec`]) and never panic across the subprocess boundary:
//! every failure mode is a typed [`SvnError`] variant so callers can tell
//! "the tool failed" apart from "the tool produced garbage".

pub mod admin;
pub mod client;
pub mod exec;
pub mod xml;

pub use admin::SvnAdmin;
pub use client::SvnClient;

use serde::Serialize;
use std::io;
use thiserror::Error;

/// Sentinel revision for entries whose commit revision is absent or unparsable.
pub const UNKNOWN_REVISION: i64 = -1;

/// One decoded entry from `svn info --xml` or `svn list --xml`.
///
/// The date is kept verbatim as emitted by the toolchain (ISO 8601);
/// it is display data, not something this engine computes with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SvnEntry {
    /// Node kind as reported by the tool ("dir" or "file").
    pub kind: String,
    /// Entry name (list) or path (info).
    pub name: String,
    /// Last-changed revision, or [`UNKNOWN_REVISION`].
    pub revision: i64,
    /// Last-changed author; empty when the tool omits it.
    pub author: String,
    /// Last-changed date, verbatim.
    pub date: String,
}

/// Failure taxonomy for toolchain invocations.
///
/// `Spawn`/`Io`/`Exit`/`Timeout` are execution failures; `Decode` means the
/// tool exited cleanly but its output was not the expected XML. The service
/// layer may flatten all of these to "no result", but the distinction is
/// preserved here for logging and tests.
#[derive(Error, Debug)]
pub enum SvnError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn { command: String, source: io::Error },
    #[error("I/O failure while running '{command}': {source}")]
    Io { command: String, source: io::Error },
    #[error("'{command}' exited with status {code}: {stderr}")]
    Exit {
        command: String,
        code: i32,
        stderr: String,
    },
    #[error("'{command}' timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },
    #[error("failed to decode tool output: {0}")]
    Decode(String),
    #[error("cannot build repository URI for '{0}'")]
    BadPath(String),
}
