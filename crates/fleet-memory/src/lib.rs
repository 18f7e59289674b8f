//! Cross-account memory consolidation.
//!
//! Each pooled account keeps per-project memory at
//! `<accounts_root>/<account>/projects/<project_id>/memory/`. This crate
//! merges those directories into one canonical shared directory per project
//! (`<shared_root>/<project_id>/`) and converts every account's copy into a
//! symlink, so an account rotation is never observable as memory loss.

pub mod unify;

pub use unify::{UnifyResult, unify_memory, unify_project_memory_for_config_dir};
