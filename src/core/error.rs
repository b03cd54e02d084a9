use crate::providers::ProviderType;
use crate::svn::SvnError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SvnHubError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Unknown provider: {0}/{1}")]
    UnknownProvider(ProviderType, String),
    #[error("Provider '{id}' failed to initialize: {reason}")]
    ProviderInit { id: String, reason: String },
    #[error("Authz file error: {0}")]
    AuthzError(String),
    #[error("Authz commit failed for {path}: {reason}")]
    CommitError { path: String, reason: String },
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Svn(#[from] SvnError),
}
