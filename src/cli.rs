//! CLI surface for the svnhub engine.
//!
//! Stands in for the excluded web service layer: every subcommand maps to
//! one administrative request, loads the engine from configuration, and
//! renders results as text or JSON.

use crate::core::authz::AuthzPathRule;
use crate::core::config::EngineConfig;
use crate::core::engine::Engine;
use crate::core::error::SvnHubError;
use crate::providers::{ProviderType, RepositoryCreateOptions};
use crate::svn::SvnEntry;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[clap(
    name = "svnhub",
    version = env!("CARGO_PKG_VERSION"),
    about = "Administration engine for Subversion infrastructure"
)]
pub struct Cli {
    /// Path to the svnhub configuration file.
    #[clap(
        long,
        global = true,
        env = "SVNHUB_CONFIG",
        default_value = "/etc/svnhub/svnhub.toml"
    )]
    pub config: PathBuf,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(clap::Args, Debug)]
pub struct ProvidersCli {
    /// Capability type: 'user', 'group', 'usergroup' or 'repository'.
    #[clap(long = "type", default_value = "repository")]
    pub type_name: String,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    pub format: String,
}

#[derive(clap::Args, Debug)]
pub struct RepoCli {
    #[clap(subcommand)]
    pub command: RepoCommand,
}

#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    /// List repositories of a provider
    List {
        #[clap(long)]
        provider: String,
        #[clap(long, default_value = "0")]
        offset: usize,
        #[clap(long, default_value = "10")]
        num: usize,
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Create a repository
    Create {
        #[clap(long)]
        provider: String,
        #[clap(long)]
        name: String,
        /// Repository filesystem type (passed to svnadmin create).
        #[clap(long)]
        fs_type: Option<String>,
    },
    /// Delete a repository
    Delete {
        #[clap(long)]
        provider: String,
        #[clap(long)]
        repository: String,
    },
    /// Verify repository integrity through the management adapter
    Verify {
        #[clap(long)]
        provider: String,
        #[clap(long)]
        repository: String,
    },
    /// Show toolchain metadata for a repository
    Info {
        #[clap(long)]
        provider: String,
        #[clap(long)]
        repository: String,
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// List a directory inside a repository
    Browse {
        #[clap(long)]
        provider: String,
        #[clap(long)]
        repository: String,
        /// Path inside the repository.
        #[clap(long, default_value = "/")]
        path: String,
        #[clap(long, default_value = "text")]
        format: String,
    },
}

#[derive(clap::Args, Debug)]
pub struct AuthzCli {
    #[clap(subcommand)]
    pub command: AuthzCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthzCommand {
    /// List path rules of a repository
    Paths {
        #[clap(long)]
        provider: String,
        #[clap(long)]
        repository: String,
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Show member permissions of one path rule
    Permissions {
        #[clap(long)]
        provider: String,
        #[clap(long)]
        repository: String,
        #[clap(long)]
        path: String,
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Add a path rule and commit the authz file
    AddPath {
        #[clap(long)]
        provider: String,
        #[clap(long)]
        repository: String,
        #[clap(long)]
        path: String,
    },
    /// Remove a path rule and commit the authz file
    RemovePath {
        #[clap(long)]
        provider: String,
        #[clap(long)]
        repository: String,
        #[clap(long)]
        path: String,
    },
}

#[derive(clap::Args, Debug)]
pub struct UserCli {
    #[clap(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// List users of a provider
    List {
        #[clap(long)]
        provider: String,
        #[clap(long, default_value = "0")]
        offset: usize,
        #[clap(long, default_value = "10")]
        num: usize,
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Show the groups a user belongs to, via the provider's associator
    Groups {
        /// Identity provider the user comes from.
        #[clap(long)]
        provider: String,
        #[clap(long)]
        user: String,
        #[clap(long, default_value = "text")]
        format: String,
    },
}

#[derive(clap::Args, Debug)]
pub struct GroupCli {
    #[clap(subcommand)]
    pub command: GroupCommand,
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// List groups of a provider
    List {
        #[clap(long)]
        provider: String,
        #[clap(long, default_value = "0")]
        offset: usize,
        #[clap(long, default_value = "10")]
        num: usize,
        #[clap(long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List configured providers of a capability type
    Providers(ProvidersCli),
    /// Repository management
    Repo(RepoCli),
    /// Path-based access rules
    Authz(AuthzCli),
    /// Users
    User(UserCli),
    /// Groups
    Group(GroupCli),
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_entries(entries: &[SvnEntry], format: &str) -> Result<()> {
    if format == "json" {
        return print_json(&entries);
    }
    for entry in entries {
        println!(
            "{:>8}  {:<4}  {:<12}  {}",
            entry.revision, entry.kind, entry.author, entry.name
        );
    }
    Ok(())
}

/// Flatten adapter failures the way the web layer did: log the reason,
/// report "nothing available" to the caller. Everything else propagates.
fn flatten_svn<T>(result: Result<T, SvnHubError>, empty: T) -> Result<T, SvnHubError> {
    match result {
        Ok(value) => Ok(value),
        Err(SvnHubError::Svn(e)) => {
            tracing::warn!(error = %e, "toolchain request failed");
            Ok(empty)
        }
        Err(e) => Err(e),
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let config = EngineConfig::from_file(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    let engine = Engine::new(config);

    match cli.command {
        Command::Providers(args) => {
            let Some(type_name) = ProviderType::parse(&args.type_name) else {
                bail!("unknown provider type '{}'", args.type_name);
            };
            let providers = engine.known_providers(type_name);
            if args.format == "json" {
                return print_json(&providers);
            }
            for provider in providers {
                println!("{}/{}", provider.type_name, provider.id);
            }
        }
        Command::Repo(repo) => run_repo(&engine, repo.command)?,
        Command::Authz(authz) => run_authz(&engine, authz.command)?,
        Command::User(user) => run_user(&engine, user.command)?,
        Command::Group(group) => run_group(&engine, group.command)?,
    }
    Ok(())
}

fn run_repo(engine: &Arc<Engine>, command: RepoCommand) -> Result<()> {
    match command {
        RepoCommand::List {
            provider,
            offset,
            num,
            format,
        } => {
            let provider = engine.repository_provider(&provider)?;
            let list = provider.repositories(offset, num)?;
            if format == "json" {
                return print_json(&list);
            }
            for repo in &list.items {
                println!("{}", repo.name);
            }
            if list.has_more {
                println!("{}", "(more…)".dimmed());
            }
        }
        RepoCommand::Create {
            provider,
            name,
            fs_type,
        } => {
            let provider = engine.repository_provider(&provider)?;
            if !provider.is_editable() {
                bail!("provider '{}' is not editable", provider.id());
            }
            let repo = provider.create(&name, &RepositoryCreateOptions { fs_type })?;
            println!("{} created repository '{}'", "ok".green(), repo.name);
        }
        RepoCommand::Delete {
            provider,
            repository,
        } => {
            let provider = engine.repository_provider(&provider)?;
            if !provider.is_editable() {
                bail!("provider '{}' is not editable", provider.id());
            }
            provider.delete(&repository)?;
            println!("{} deleted repository '{}'", "ok".green(), repository);
        }
        RepoCommand::Verify {
            provider,
            repository,
        } => {
            let provider = engine.repository_provider(&provider)?;
            provider.verify(&repository)?;
            println!("{} repository '{}' verified", "ok".green(), repository);
        }
        RepoCommand::Info {
            provider,
            repository,
            format,
        } => {
            let provider = engine.repository_provider(&provider)?;
            let info = flatten_svn(provider.info(&repository), None)?;
            match info {
                Some(entry) => print_entries(std::slice::from_ref(&entry), &format)?,
                None => println!("{}", "no info available".yellow()),
            }
        }
        RepoCommand::Browse {
            provider,
            repository,
            path,
            format,
        } => {
            // The provider resolves the repository; listing goes through
            // the shared read adapter.
            let provider = engine.repository_provider(&provider)?;
            let Some(repo) = provider.find(&repository)? else {
                bail!("repository '{}' not found", repository);
            };
            let target = format!("{}/{}", repo.name, path.trim_start_matches('/'));
            let entries = flatten_svn(
                engine
                    .svn_client()?
                    .list(&target)
                    .map_err(SvnHubError::from),
                Vec::new(),
            )?;
            print_entries(&entries, &format)?;
        }
    }
    Ok(())
}

fn run_authz(engine: &Arc<Engine>, command: AuthzCommand) -> Result<()> {
    match command {
        AuthzCommand::Paths {
            provider,
            repository,
            format,
        } => {
            let provider = engine.repository_provider(&provider)?;
            let Some(repo) = provider.find(&repository)? else {
                bail!("repository '{}' not found", repository);
            };
            let handle = provider.authz(&repository)?;
            let paths = handle.read(|file| file.paths(&repo.name));
            if format == "json" {
                return print_json(&paths);
            }
            for rule in paths {
                println!("{}", rule.path);
            }
        }
        AuthzCommand::Permissions {
            provider,
            repository,
            path,
            format,
        } => {
            let provider = engine.repository_provider(&provider)?;
            let Some(repo) = provider.find(&repository)? else {
                bail!("repository '{}' not found", repository);
            };
            let handle = provider.authz(&repository)?;
            let rule = AuthzPathRule::new(Some(&repo.name), &path);
            let permissions = handle.read(|file| file.permissions_of(&rule));
            if format == "json" {
                return print_json(&permissions);
            }
            for permission in permissions {
                println!("{:<24} {}", permission.member, permission.level.as_str());
            }
        }
        AuthzCommand::AddPath {
            provider,
            repository,
            path,
        } => {
            let provider = engine.repository_provider(&provider)?;
            let Some(repo) = provider.find(&repository)? else {
                bail!("repository '{}' not found", repository);
            };
            let handle = provider.authz(&repository)?;
            // Mutation and commit happen under one handle lock.
            handle.update(|file| {
                file.add_path(AuthzPathRule::new(Some(&repo.name), &path));
                Ok(())
            })?;
            println!("{} added path rule {}:{}", "ok".green(), repo.name, path);
        }
        AuthzCommand::RemovePath {
            provider,
            repository,
            path,
        } => {
            let provider = engine.repository_provider(&provider)?;
            let Some(repo) = provider.find(&repository)? else {
                bail!("repository '{}' not found", repository);
            };
            let handle = provider.authz(&repository)?;
            let removed = handle.update(|file| {
                Ok(file.remove_path(&AuthzPathRule::new(Some(&repo.name), &path)))
            })?;
            if removed {
                println!("{} removed path rule {}:{}", "ok".green(), repo.name, path);
            } else {
                println!("{} no such path rule", "warn".yellow());
            }
        }
    }
    Ok(())
}

fn run_user(engine: &Arc<Engine>, command: UserCommand) -> Result<()> {
    match command {
        UserCommand::List {
            provider,
            offset,
            num,
            format,
        } => {
            let provider = engine.user_provider(&provider)?;
            let list = provider.users(offset, num)?;
            if format == "json" {
                return print_json(&list);
            }
            for user in &list.items {
                println!("{}", user.id);
            }
            if list.has_more {
                println!("{}", "(more…)".dimmed());
            }
        }
        UserCommand::Groups {
            provider,
            user,
            format,
        } => {
            let Some(associator) = engine.associater_for_users(&provider)? else {
                bail!("no association provider is configured for '{}'", provider);
            };
            let groups = associator.groups_of_user(&user)?;
            if format == "json" {
                return print_json(&groups);
            }
            for group in groups {
                println!("{}", group.id);
            }
        }
    }
    Ok(())
}

fn run_group(engine: &Arc<Engine>, command: GroupCommand) -> Result<()> {
    match command {
        GroupCommand::List {
            provider,
            offset,
            num,
            format,
        } => {
            let provider = engine.group_provider(&provider)?;
            let list = provider.groups(offset, num)?;
            if format == "json" {
                return print_json(&list);
            }
            for group in &list.items {
                println!("{}", group.id);
            }
            if list.has_more {
                println!("{}", "(more…)".dimmed());
            }
        }
    }
    Ok(())
}
