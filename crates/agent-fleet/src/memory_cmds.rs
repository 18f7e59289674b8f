use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use fleet_config::paths;
use fleet_memory::{UnifyResult, unify_memory, unify_project_memory_for_config_dir};

fn resolve_roots(
    accounts_root: Option<PathBuf>,
    shared_root: Option<PathBuf>,
) -> Result<(PathBuf, PathBuf)> {
    let accounts_root = accounts_root
        .or_else(paths::default_accounts_root)
        .context("cannot determine accounts root (no home directory)")?;
    let shared_root = shared_root
        .or_else(paths::default_shared_memory_root)
        .context("cannot determine shared memory root (no home directory)")?;
    Ok((accounts_root, shared_root))
}

pub fn unify(
    dry_run: bool,
    json: bool,
    accounts_root: Option<PathBuf>,
    shared_root: Option<PathBuf>,
) -> Result<()> {
    let (accounts_root, shared_root) = resolve_roots(accounts_root, shared_root)?;
    let results = unify_memory(&accounts_root, &shared_root, dry_run)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No project memory directories found.");
        return Ok(());
    }
    for result in &results {
        print_result(result, dry_run);
    }
    Ok(())
}

pub fn link(
    config_dir: &Path,
    accounts_root: Option<PathBuf>,
    shared_root: Option<PathBuf>,
) -> Result<()> {
    let (accounts_root, shared_root) = resolve_roots(accounts_root, shared_root)?;
    unify_project_memory_for_config_dir(&accounts_root, &shared_root, config_dir)
}

fn print_result(result: &UnifyResult, dry_run: bool) {
    let verb = if dry_run { "would link" } else { "linked" };
    println!(
        "{}: {} {}, {} already linked",
        result.project_id,
        verb,
        result.symlinks_created.len(),
        result.already_linked.len()
    );
    for warning in &result.warnings {
        eprintln!("  warning: {warning}");
    }
}
