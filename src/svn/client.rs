//! Read adapter around the `svn` executable.
//!
//! Every invocation carries the unattended-operation argument set:
//! no interactive prompts, trust the server certificate, no credential
//! cache. These are fixed policy for server-side use, not per-call knobs.

use crate::svn::exec::{self, CommandSpec};
use crate::svn::{SvnEntry, SvnError, xml};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Global arguments applied to every `svn` call, in render order.
const GLOBAL_ARGS: [&str; 3] = ["--non-interactive", "--trust-server-cert", "--no-auth-cache"];

pub struct SvnClient {
    executable: PathBuf,
    parent_url: Url,
    timeout: Duration,
}

impl SvnClient {
    pub fn new(executable: &Path, parent_url: Url, timeout: Duration) -> Self {
        Self {
            executable: executable.to_path_buf(),
            parent_url,
            timeout,
        }
    }

    fn spec(&self, subcommand: &str) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.executable, subcommand);
        for arg in GLOBAL_ARGS {
            spec = spec.flag(arg);
        }
        spec
    }

    /// Resolve a caller-supplied path to a fully qualified repository URI.
    ///
    /// Absolute URIs pass through untouched; plain paths are appended to the
    /// configured parent URL segment by segment, which percent-encodes them.
    pub fn repository_uri(&self, path: &str) -> Result<Url, SvnError> {
        if path.contains("://") {
            return Url::parse(path).map_err(|_| SvnError::BadPath(path.to_string()));
        }
        let mut url = self.parent_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| SvnError::BadPath(path.to_string()))?;
            segments.pop_if_empty();
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
            }
        }
        Ok(url)
    }

    /// Structured metadata for one path: `svn info --xml`.
    ///
    /// `Ok(None)` means the tool answered but had no entry to report.
    pub fn info(&self, path: &str) -> Result<Option<SvnEntry>, SvnError> {
        let uri = self.repository_uri(path)?;
        let spec = self.spec("info").flag("--xml").target(uri.as_str());
        let result = exec::execute_checked(&spec, self.timeout)?;
        xml::decode_info(&result.stdout_str())
    }

    /// Directory listing for one path: `svn list --xml`. Zero entries is a
    /// successful empty listing, not a failure.
    pub fn list(&self, path: &str) -> Result<Vec<SvnEntry>, SvnError> {
        let uri = self.repository_uri(path)?;
        let spec = self.spec("list").flag("--xml").target(uri.as_str());
        let result = exec::execute_checked(&spec, self.timeout)?;
        xml::decode_list(&result.stdout_str())
    }
}
