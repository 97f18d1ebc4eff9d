//! Git operations for drover
//!
//! This module provides bare mirror clones, ref inspection and pruning, and
//! mirror pushes to the destination repository.

mod command;
mod mirror;
mod refs;

pub use command::GitCommand;
pub use mirror::{GitMirror, MirrorOutcome, MirrorStats, RepositoryMirror, DESTINATION_REMOTE};
pub use refs::{diff_refs, is_excluded, local_refs, parse_ls_remote, prune_refs, RefMap};
