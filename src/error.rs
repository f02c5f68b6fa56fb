use std::path::PathBuf;

/// Error kinds surfaced by the core. Commands propagate these through
/// `anyhow`, so callers can match on the kind with `downcast_ref`.
#[derive(Debug, thiserror::Error)]
pub enum VesError {
    #[error("no ves directory in {0} or any parent")]
    NotARepository(PathBuf),

    #[error("{0} exists and is not an empty repository target")]
    RepositoryExists(PathBuf),

    #[error("unsupported repositoryformatversion: {0}")]
    UnsupportedFormat(String),

    #[error("cannot handle paths outside of worktree: {0}")]
    PathOutsideWorktree(PathBuf),

    #[error("not a file or symlink: {0}")]
    NotAFileOrSymlink(PathBuf),

    #[error("paths not in the index: {0:?}")]
    NotInIndex(Vec<String>),

    #[error("no such reference: {0}")]
    NoSuchReference(String),

    #[error("ambiguous reference {name}: candidates are {candidates:?}")]
    AmbiguousReference {
        name: String,
        candidates: Vec<String>,
    },

    #[error("malformed object {sha}: {reason}")]
    MalformedObject { sha: String, reason: String },

    #[error("malformed index: {0}")]
    MalformedIndex(String),

    #[error("no user identity: set user.name and user.email in the ves config")]
    UserIdentityMissing,
}

/// True when an `anyhow` chain bottoms out in `NoSuchReference` — the
/// expected shape right after `init`, before the first commit.
#[must_use]
pub fn is_no_such_reference(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<VesError>(), Some(VesError::NoSuchReference(_)))
}
