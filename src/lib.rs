//! svnhub: an administration engine for Subversion infrastructure.
//!
//! svnhub manages repositories, users, groups, and path-based access rules
//! by delegating to the `svn`/`svnadmin` toolchain and to an authz file.
//! The HTTP front end is out of scope; the `svnhub` binary exposes the same
//! operations on the command line.
//!
//! # Architecture
//!
//! - [`core::engine::Engine`]: the composition root. Constructed once from
//!   a TOML configuration, it lazily instantiates and caches providers,
//!   toolchain adapters, and authz file handles, and resolves which
//!   association provider fronts a given identity provider.
//! - [`providers`]: one capability trait per provider type (user, group,
//!   usergroup association, repository) plus the built-in backends,
//!   selected by symbolic name through a compile-time factory table.
//! - [`svn`]: subprocess adapters for `svn` and `svnadmin` — argument
//!   assembly, bounded-timeout execution, XML decoding. Failures cross the
//!   boundary as typed errors, never as panics.
//!
//! # Example
//!
//! ```no_run
//! use svnhub::core::{config::EngineConfig, engine::Engine};
//!
//! # fn main() -> Result<(), svnhub::core::error::SvnHubError> {
//! let config = EngineConfig::from_file("/etc/svnhub/svnhub.toml".as_ref())?;
//! let engine = Engine::new(config);
//! let provider = engine.repository_provider("local")?;
//! for repo in provider.repositories(0, 10)?.items {
//!     println!("{}", repo.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod core;
pub mod providers;
pub mod svn;
