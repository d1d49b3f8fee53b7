use anyhow::{Context, Result};
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use crate::cli::Cli;

pub const CLASSPATH_ENV: &str = "CLASSPATH";

/// `--classpath` plus `--entry`, else `$CLASSPATH`, else the current directory.
pub fn resolve_classpath(cli: &Cli) -> Result<Vec<PathBuf>> {
    let current_dir = env::current_dir().context("Failed to resolve current directory")?;
    Ok(resolve_classpath_from(
        cli,
        env::var_os(CLASSPATH_ENV),
        current_dir,
    ))
}

pub fn resolve_classpath_from(
    cli: &Cli,
    env_classpath: Option<OsString>,
    current_dir: PathBuf,
) -> Vec<PathBuf> {
    let mut explicit = cli
        .classpath
        .as_deref()
        .map(split_classpath)
        .unwrap_or_default();
    explicit.extend(cli.entries.iter().cloned());
    if !explicit.is_empty() {
        return explicit;
    }

    if let Some(list) = env_classpath {
        let from_env = split_classpath(&list);
        if !from_env.is_empty() {
            return from_env;
        }
    }

    vec![current_dir]
}

pub fn split_classpath(list: &OsStr) -> Vec<PathBuf> {
    env::split_paths(list)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}
