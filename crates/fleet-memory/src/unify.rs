use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};

use fleet_core::FleetError;

/// The living per-project summary file, merged by recency. Every other file
/// is treated as an append-only contribution and merged by presence.
pub const MEMORY_FILE: &str = "MEMORY.md";

/// What happened to one project during a unification pass.
#[derive(Debug, Clone, Serialize)]
pub struct UnifyResult {
    /// Logical project identifier (the directory name under `projects/`).
    pub project_id: String,
    /// Canonical shared memory directory for this project.
    pub shared_dir: PathBuf,
    /// Accounts whose content was merged into the shared dir.
    pub accounts_merged: Vec<String>,
    /// Accounts that got new symlinks (or would, in dry-run).
    pub symlinks_created: Vec<String>,
    /// Accounts already symlinked correctly.
    pub already_linked: Vec<String>,
    /// Non-fatal issues encountered.
    pub warnings: Vec<String>,
}

/// One account's memory dir for a project.
#[derive(Debug, Clone)]
struct ProjectEntry {
    account: String,
    memory_dir: PathBuf,
}

/// Scan all account project dirs and replace `memory/` directories with
/// symlinks to the canonical shared location.
///
/// In dry-run mode nothing on disk changes; entries needing consolidation
/// are reported as would-be symlinks.
pub fn unify_memory(
    accounts_root: &Path,
    shared_root: &Path,
    dry_run: bool,
) -> Result<Vec<UnifyResult>> {
    let projects = discover_projects(accounts_root)?;

    let mut results = Vec::with_capacity(projects.len());
    for (project_id, entries) in projects {
        results.push(unify_project(&project_id, &entries, shared_root, dry_run));
    }
    Ok(results)
}

/// Post-rotation entry point: unify every project under the account owning
/// `config_dir`, re-discovering each across all accounts so the rotated-in
/// account also picks up content contributed by the others.
///
/// A `config_dir` outside `accounts_root` (the single-account default
/// location) is a defined no-op.
pub fn unify_project_memory_for_config_dir(
    accounts_root: &Path,
    shared_root: &Path,
    config_dir: &Path,
) -> Result<()> {
    let abs_accounts_root =
        std::path::absolute(accounts_root).context("resolving accounts root")?;
    let abs_config_dir = std::path::absolute(config_dir).context("resolving config dir")?;

    // The first path segment after the accounts root is the account name.
    let account = match abs_config_dir.strip_prefix(&abs_accounts_root) {
        Ok(rel) => match rel.components().next() {
            Some(Component::Normal(name)) => name.to_string_lossy().into_owned(),
            // config_dir == accounts_root, nothing to derive.
            _ => return Ok(()),
        },
        // Not under the accounts root: unpooled setup, nothing to unify.
        Err(_) => return Ok(()),
    };

    let projects_dir = accounts_root.join(&account).join("projects");
    let entries = match fs::read_dir(&projects_dir) {
        Ok(entries) => entries,
        // No projects dir yet.
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("reading projects dir {}", projects_dir.display()));
        }
    };

    for entry in entries.flatten() {
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let project_id = entry.file_name().to_string_lossy().into_owned();
        let memory_dir = projects_dir.join(&project_id).join("memory");

        let Ok(meta) = fs::symlink_metadata(&memory_dir) else {
            // No memory dir, nothing to do for this project.
            continue;
        };

        let shared_dir = shared_root.join(&project_id);
        if meta.file_type().is_symlink() && symlink_matches_target(&memory_dir, &shared_dir) {
            continue;
        }

        // Unify this project across ALL accounts, not just the rotated one.
        let all_projects = match discover_projects(accounts_root) {
            Ok(projects) => projects,
            Err(err) => {
                warn!(error = %err, "project discovery failed during post-rotation unify");
                continue;
            }
        };
        let result = match all_projects.get(&project_id) {
            Some(project_entries) => {
                unify_project(&project_id, project_entries, shared_root, false)
            }
            // Only this account has the project; still create the symlink.
            None => unify_project(
                &project_id,
                &[ProjectEntry {
                    account: account.clone(),
                    memory_dir,
                }],
                shared_root,
                false,
            ),
        };
        for warning in &result.warnings {
            warn!(project = %project_id, warning = %warning, "post-rotation unify warning");
        }
    }

    Ok(())
}

/// Map of project id to each account's memory dir for it. Unreadable
/// account subdirectories are skipped; an unreadable accounts root is fatal.
fn discover_projects(accounts_root: &Path) -> Result<BTreeMap<String, Vec<ProjectEntry>>> {
    let accounts = fs::read_dir(accounts_root)
        .map_err(|_| FleetError::AccountsRootUnreadable(accounts_root.display().to_string()))?;

    let mut projects: BTreeMap<String, Vec<ProjectEntry>> = BTreeMap::new();
    for account in accounts.flatten() {
        if !account.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let account_name = account.file_name().to_string_lossy().into_owned();
        let projects_dir = accounts_root.join(&account_name).join("projects");
        let Ok(entries) = fs::read_dir(&projects_dir) else {
            // Account may not have a projects dir.
            continue;
        };
        for project in entries.flatten() {
            if !project.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let project_id = project.file_name().to_string_lossy().into_owned();
            let memory_dir = projects_dir.join(&project_id).join("memory");
            // Present as either a real dir or a symlink.
            if fs::symlink_metadata(&memory_dir).is_ok() {
                projects.entry(project_id).or_default().push(ProjectEntry {
                    account: account_name.clone(),
                    memory_dir,
                });
            }
        }
    }
    Ok(projects)
}

/// Consolidate one project: classify entries, merge content, then replace
/// real dirs (and wrong-target symlinks) with links to the shared dir.
fn unify_project(
    project_id: &str,
    entries: &[ProjectEntry],
    shared_root: &Path,
    dry_run: bool,
) -> UnifyResult {
    let shared_dir = shared_root.join(project_id);
    let mut result = UnifyResult {
        project_id: project_id.to_string(),
        shared_dir: shared_dir.clone(),
        accounts_merged: Vec::new(),
        symlinks_created: Vec::new(),
        already_linked: Vec::new(),
        warnings: Vec::new(),
    };

    let mut pending: Vec<&ProjectEntry> = Vec::new();
    for entry in entries {
        let Ok(meta) = fs::symlink_metadata(&entry.memory_dir) else {
            continue;
        };
        if meta.file_type().is_symlink() && symlink_matches_target(&entry.memory_dir, &shared_dir)
        {
            result.already_linked.push(entry.account.clone());
            continue;
        }
        // Real dir, or symlink to the wrong target.
        pending.push(entry);
    }

    if pending.is_empty() {
        return result;
    }

    if dry_run {
        for entry in &pending {
            result.symlinks_created.push(entry.account.clone());
        }
        return result;
    }

    if let Err(err) = fs::create_dir_all(&shared_dir) {
        result
            .warnings
            .push(format!("failed to create shared dir: {err}"));
        return result;
    }

    // A merge failure aborts before any original directory is touched;
    // never symlink over data that was not successfully copied.
    if let Err(err) = merge_memory_content(&pending, &shared_dir, &mut result) {
        result
            .warnings
            .push(format!("merge failed, aborting symlink creation: {err}"));
        return result;
    }

    for entry in &pending {
        match replace_with_symlink(&entry.memory_dir, &shared_dir) {
            Ok(()) => result.symlinks_created.push(entry.account.clone()),
            Err(err) => {
                result
                    .warnings
                    .push(format!("failed to symlink {}: {err}", entry.account));
            }
        }
    }

    debug!(
        project = project_id,
        linked = result.symlinks_created.len(),
        already = result.already_linked.len(),
        "project unified"
    );
    result
}

/// Copy content from real memory dirs into the shared dir.
///
/// `MEMORY.md`: the candidate with the latest mtime wins (size breaks ties),
/// and it only overwrites a pre-existing shared copy that is older, or
/// equal-time and smaller. Other files: copied only when absent from the
/// shared dir; first seen across accounts wins.
fn merge_memory_content(
    entries: &[&ProjectEntry],
    shared_dir: &Path,
    result: &mut UnifyResult,
) -> Result<()> {
    struct Candidate {
        path: PathBuf,
        account: String,
        mtime: SystemTime,
        size: u64,
    }

    let mut best_memory: Option<Candidate> = None;
    // filename -> source path, first seen wins.
    let mut other_files: BTreeMap<String, PathBuf> = BTreeMap::new();

    for entry in entries {
        let Ok(files) = fs::read_dir(&entry.memory_dir) else {
            continue;
        };
        for file in files.flatten() {
            if !file.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let name = file.file_name().to_string_lossy().into_owned();
            let src_path = entry.memory_dir.join(&name);
            let Ok(meta) = file.metadata() else {
                continue;
            };

            if name == MEMORY_FILE {
                let candidate = Candidate {
                    path: src_path,
                    account: entry.account.clone(),
                    mtime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                    size: meta.len(),
                };
                let better = match &best_memory {
                    None => true,
                    Some(best) => {
                        candidate.mtime > best.mtime
                            || (candidate.mtime == best.mtime && candidate.size > best.size)
                    }
                };
                if better {
                    best_memory = Some(candidate);
                }
            } else {
                other_files.entry(name).or_insert(src_path);
            }
        }
        result.accounts_merged.push(entry.account.clone());
    }

    if let Some(best) = best_memory {
        let shared_memory = shared_dir.join(MEMORY_FILE);
        let should_copy = match fs::metadata(&shared_memory) {
            Ok(existing) => {
                let existing_mtime = existing.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                // Copy only if the candidate is strictly newer, or equal-time
                // and strictly larger.
                existing_mtime < best.mtime
                    || (existing_mtime == best.mtime && existing.len() < best.size)
            }
            Err(_) => true,
        };
        if should_copy {
            fs::copy(&best.path, &shared_memory)
                .with_context(|| format!("copying {MEMORY_FILE} from {}", best.account))?;
        }
    }

    for (name, src_path) in &other_files {
        let dest = shared_dir.join(name);
        if dest.exists() {
            continue;
        }
        fs::copy(src_path, &dest).with_context(|| format!("copying {name}"))?;
    }

    Ok(())
}

/// Replace a memory directory with a symlink via a rename-based swap.
///
/// At every observable point the path is the original directory, the
/// `.bak` sibling, or the new symlink; a mid-operation crash never leaves
/// it absent and unlinked.
fn replace_with_symlink(memory_dir: &Path, shared_dir: &Path) -> Result<()> {
    let backup = memory_dir.with_file_name(format!(
        "{}.bak",
        memory_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "memory".to_string())
    ));

    fs::rename(memory_dir, &backup)
        .with_context(|| format!("backing up {}", memory_dir.display()))?;

    if let Some(parent) = memory_dir.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            let _ = fs::rename(&backup, memory_dir);
            return Err(err).with_context(|| format!("creating parent {}", parent.display()));
        }
    }

    #[cfg(unix)]
    let linked = std::os::unix::fs::symlink(shared_dir, memory_dir);
    #[cfg(not(unix))]
    let linked = std::os::windows::fs::symlink_dir(shared_dir, memory_dir);

    if let Err(err) = linked {
        // Restore the backup, original data preserved.
        let _ = fs::rename(&backup, memory_dir);
        return Err(err).context("creating symlink");
    }

    // The backup may itself be a symlink (wrong-target replacement case).
    match fs::symlink_metadata(&backup) {
        Ok(meta) if meta.file_type().is_symlink() => {
            let _ = fs::remove_file(&backup);
        }
        Ok(_) => {
            let _ = fs::remove_dir_all(&backup);
        }
        Err(_) => {}
    }
    Ok(())
}

/// Whether a symlink resolves to the expected target, accepting both
/// relative and absolute stored targets. Relative targets are resolved
/// against the symlink's own directory before comparison.
fn symlink_matches_target(symlink_path: &Path, expected: &Path) -> bool {
    let Ok(target) = fs::read_link(symlink_path) else {
        return false;
    };
    let target = if target.is_absolute() {
        target
    } else {
        match symlink_path.parent() {
            Some(parent) => parent.join(target),
            None => target,
        }
    };
    match (std::path::absolute(&target), std::path::absolute(expected)) {
        (Ok(abs_target), Ok(abs_expected)) => normalize(&abs_target) == normalize(&abs_expected),
        _ => target == expected,
    }
}

/// Lexically drop `.` and resolve `..` components so that a relative target
/// like `../../../../shared/proj` compares equal to its absolute form.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
