//! Management adapter around the `svnadmin` executable.
//!
//! `svnadmin` operates on local repository paths and has no network or
//! authentication surface, so unlike [`crate::svn::SvnClient`] it carries
//! no global argument set.

use crate::svn::SvnError;
use crate::svn::exec::{self, CommandSpec};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct SvnAdmin {
    executable: PathBuf,
    timeout: Duration,
}

impl SvnAdmin {
    pub fn new(executable: &Path, timeout: Duration) -> Self {
        Self {
            executable: executable.to_path_buf(),
            timeout,
        }
    }

    /// Create a new repository at `repo_path`: `svnadmin create`.
    pub fn create(&self, repo_path: &Path, fs_type: Option<&str>) -> Result<(), SvnError> {
        let mut spec = CommandSpec::new(&self.executable, "create");
        if let Some(fs_type) = fs_type {
            spec = spec.option("--fs-type", fs_type);
        }
        let spec = spec.target(&repo_path.to_string_lossy());
        exec::execute_checked(&spec, self.timeout)?;
        Ok(())
    }

    /// Verify repository integrity: `svnadmin verify --quiet`.
    pub fn verify(&self, repo_path: &Path) -> Result<(), SvnError> {
        let spec = CommandSpec::new(&self.executable, "verify")
            .flag("--quiet")
            .target(&repo_path.to_string_lossy());
        exec::execute_checked(&spec, self.timeout)?;
        Ok(())
    }
}
