//! Path-based access-control file (mod_authz_svn format subset).
//!
//! The engine consumes this through a narrow contract: load, query paths
//! and permissions, add/remove a path rule, write back. Group definitions
//! (`[groups]`) are also exposed so the authz-backed group and association
//! providers can share the same file handle.
//!
//! Comments in the source file are not preserved across a write-back; the
//! file is rendered in canonical form.

use crate::core::error::SvnHubError;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, OnceLock};

/// Permission level of one member on one path rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PermissionLevel {
    /// Explicit denial (`member =`).
    None,
    /// Read only (`member = r`).
    Read,
    /// Read and write (`member = rw`).
    ReadWrite,
}

impl PermissionLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionLevel::None => "",
            PermissionLevel::Read => "r",
            PermissionLevel::ReadWrite => "rw",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "" => Some(PermissionLevel::None),
            "r" => Some(PermissionLevel::Read),
            "rw" => Some(PermissionLevel::ReadWrite),
            _ => None,
        }
    }
}

/// Key of one path rule section: `[/path]` or `[repository:/path]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthzPathRule {
    /// Repository the rule is scoped to; `None` for repository-independent
    /// rules.
    pub repository: Option<String>,
    /// Path inside the repository, always starting with `/`.
    pub path: String,
}

impl AuthzPathRule {
    pub fn new(repository: Option<&str>, path: &str) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Self {
            repository: repository.map(str::to_string),
            path,
        }
    }

    fn section_header(&self) -> String {
        match &self.repository {
            Some(repo) => format!("[{}:{}]", repo, self.path),
            None => format!("[{}]", self.path),
        }
    }
}

/// One member/permission pair inside a path rule section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthzPermission {
    /// Member spec: a user name, `@group`, or `*`.
    pub member: String,
    pub level: PermissionLevel,
}

#[derive(Debug, Clone)]
struct AuthzSection {
    rule: AuthzPathRule,
    permissions: Vec<AuthzPermission>,
}

fn section_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[\s*(.+?)\s*\]$").expect("static regex"))
}

/// In-memory model of one authz file. Rule and group order is preserved.
#[derive(Debug, Clone)]
pub struct AuthzFile {
    path: PathBuf,
    groups: Vec<(String, Vec<String>)>,
    sections: Vec<AuthzSection>,
}

#[derive(Clone, Copy)]
enum ParseState {
    Preamble,
    Groups,
    Section(usize),
}

impl AuthzFile {
    /// Load and parse the file at `path`. A malformed file is an
    /// [`SvnHubError::AuthzError`]; the caller must not cache the attempt.
    pub fn load(path: &Path) -> Result<Self, SvnHubError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, SvnHubError> {
        let mut file = Self {
            path: path.to_path_buf(),
            groups: Vec::new(),
            sections: Vec::new(),
        };
        let mut state = ParseState::Preamble;

        for (lineno, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(captures) = section_header_re().captures(line) {
                let name = &captures[1];
                if name == "groups" {
                    state = ParseState::Groups;
                    continue;
                }
                let rule = Self::parse_section_name(name).ok_or_else(|| {
                    SvnHubError::AuthzError(format!(
                        "{}:{}: invalid section '[{}]'",
                        path.display(),
                        lineno + 1,
                        name
                    ))
                })?;
                file.sections.push(AuthzSection {
                    rule,
                    permissions: Vec::new(),
                });
                state = ParseState::Section(file.sections.len() - 1);
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(SvnHubError::AuthzError(format!(
                    "{}:{}: expected 'name = value'",
                    path.display(),
                    lineno + 1
                )));
            };
            let key = key.trim();
            let value = value.trim();
            match state {
                ParseState::Preamble => {
                    return Err(SvnHubError::AuthzError(format!(
                        "{}:{}: assignment outside any section",
                        path.display(),
                        lineno + 1
                    )));
                }
                ParseState::Groups => {
                    let members = value
                        .split(',')
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(str::to_string)
                        .collect();
                    file.groups.push((key.to_string(), members));
                }
                ParseState::Section(index) => {
                    let level = PermissionLevel::parse(value).ok_or_else(|| {
                        SvnHubError::AuthzError(format!(
                            "{}:{}: invalid permission '{}'",
                            path.display(),
                            lineno + 1,
                            value
                        ))
                    })?;
                    file.sections[index].permissions.push(AuthzPermission {
                        member: key.to_string(),
                        level,
                    });
                }
            }
        }
        Ok(file)
    }

    /// Split `repo:/path` / `/path` section names. Returns `None` when the
    /// path part does not start with `/`.
    fn parse_section_name(name: &str) -> Option<AuthzPathRule> {
        if name.starts_with('/') {
            return Some(AuthzPathRule::new(None, name));
        }
        let (repo, path) = name.split_once(':')?;
        if repo.is_empty() || !path.starts_with('/') {
            return None;
        }
        Some(AuthzPathRule::new(Some(repo), path))
    }

    pub fn source_path(&self) -> &Path {
        &self.path
    }

    /// Path rules scoped to `repository`, in file order.
    pub fn paths(&self, repository: &str) -> Vec<AuthzPathRule> {
        self.sections
            .iter()
            .filter(|s| s.rule.repository.as_deref() == Some(repository))
            .map(|s| s.rule.clone())
            .collect()
    }

    /// Add a path rule section if not already present.
    pub fn add_path(&mut self, rule: AuthzPathRule) {
        if self.sections.iter().any(|s| s.rule == rule) {
            return;
        }
        self.sections.push(AuthzSection {
            rule,
            permissions: Vec::new(),
        });
    }

    /// Remove a path rule section and its permissions. Returns whether a
    /// section was removed.
    pub fn remove_path(&mut self, rule: &AuthzPathRule) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| &s.rule != rule);
        self.sections.len() != before
    }

    /// Member/permission pairs of one path rule, in file order.
    pub fn permissions_of(&self, rule: &AuthzPathRule) -> Vec<AuthzPermission> {
        self.sections
            .iter()
            .find(|s| &s.rule == rule)
            .map(|s| s.permissions.clone())
            .unwrap_or_default()
    }

    /// Group definitions from the `[groups]` section.
    pub fn groups(&self) -> &[(String, Vec<String>)] {
        &self.groups
    }

    pub fn members_of(&self, group: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|(name, _)| name == group)
            .map(|(_, members)| members.as_slice())
    }

    /// Canonical rendering of the whole file.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.groups.is_empty() {
            out.push_str("[groups]\n");
            for (name, members) in &self.groups {
                out.push_str(&format!("{} = {}\n", name, members.join(", ")));
            }
            out.push('\n');
        }
        for section in &self.sections {
            out.push_str(&section.rule.section_header());
            out.push('\n');
            for permission in &section.permissions {
                out.push_str(&format!(
                    "{} = {}\n",
                    permission.member,
                    permission.level.as_str()
                ));
            }
            out.push('\n');
        }
        out
    }

    /// Write the file back to its source location.
    ///
    /// The previous content is copied to a `.bak` sibling first; a failed
    /// backup fails the commit, since it is part of the durability story.
    pub fn write_to_file(&self) -> Result<(), SvnHubError> {
        if self.path.exists() {
            let mut backup = self.path.as_os_str().to_owned();
            backup.push(".bak");
            fs::copy(&self.path, PathBuf::from(backup)).map_err(|e| SvnHubError::CommitError {
                path: self.path.display().to_string(),
                reason: format!("backup failed: {e}"),
            })?;
        }
        fs::write(&self.path, self.render()).map_err(|e| SvnHubError::CommitError {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Shared handle to one loaded authz file.
///
/// The engine guarantees at most one handle per normalized path, so every
/// caller sees every mutation. The inner mutex serializes whole
/// read-modify-write-commit sequences via [`AuthzHandle::update`].
#[derive(Debug)]
pub struct AuthzHandle {
    path: PathBuf,
    inner: Mutex<AuthzFile>,
}

impl AuthzHandle {
    pub fn new(path: PathBuf, file: AuthzFile) -> Self {
        Self {
            path,
            inner: Mutex::new(file),
        }
    }

    /// Normalized path this handle is keyed by.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read access under the handle lock.
    pub fn read<R>(&self, f: impl FnOnce(&AuthzFile) -> R) -> R {
        let file = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&file)
    }

    /// Mutate and write back as one critical section. Two concurrent path
    /// additions on the same file cannot lose each other's edit.
    pub fn update<R>(
        &self,
        f: impl FnOnce(&mut AuthzFile) -> Result<R, SvnHubError>,
    ) -> Result<R, SvnHubError> {
        let mut file = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let result = f(&mut file)?;
        file.write_to_file()?;
        Ok(result)
    }

    /// Write the current in-memory state back without mutating it.
    pub fn commit(&self) -> Result<(), SvnHubError> {
        let file = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        file.write_to_file()
    }
}

/// Canonicalize a path lexically: absolute, no `.` or `..` components.
///
/// Purely lexical on purpose — the cache key must be stable whether or not
/// the file exists yet.
pub fn normalize_absolute_path(path: &Path) -> Result<PathBuf, SvnHubError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}
