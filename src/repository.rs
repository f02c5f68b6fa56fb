use crate::error::VesError;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use ini::Ini;

const DESCRIPTION: &str =
    "Unnamed repository; edit this file 'description' to name the repository.\n";

#[derive(Debug)]
pub struct Repository {
    pub worktree: PathBuf,
    pub ves_dir: PathBuf,
    conf: Ini,
}

impl Repository {
    /// Open an existing repository rooted at `path`. Requires a `.ves`
    /// directory with a config declaring `repositoryformatversion = 0`.
    pub fn open(path: &Path) -> Result<Self> {
        let worktree = path
            .canonicalize()
            .with_context(|| format!("cannot resolve {}", path.display()))?;
        let ves_dir = worktree.join(".ves");

        if !ves_dir.is_dir() {
            return Err(VesError::NotARepository(worktree).into());
        }

        let config_path = ves_dir.join("config");
        if !config_path.is_file() {
            bail!("configuration file missing in {}", ves_dir.display());
        }
        let conf = Ini::load_from_file(&config_path)
            .with_context(|| format!("cannot parse {}", config_path.display()))?;

        let version = conf
            .get_from(Some("core"), "repositoryformatversion")
            .unwrap_or("");
        if version != "0" {
            return Err(VesError::UnsupportedFormat(version.to_string()).into());
        }

        Ok(Self { worktree, ves_dir, conf })
    }

    /// Walk upward from `start` until a directory containing `.ves` is
    /// found.
    pub fn find(start: &Path) -> Result<Self> {
        let mut path = start
            .canonicalize()
            .with_context(|| format!("cannot resolve {}", start.display()))?;

        loop {
            if path.join(".ves").is_dir() {
                return Self::open(&path);
            }
            if !path.pop() {
                return Err(VesError::NotARepository(start.to_path_buf()).into());
            }
        }
    }

    /// Create a new repository skeleton at `path`. The target must not
    /// exist, or must be a directory whose `.ves` is absent or empty.
    pub fn create(path: &Path) -> Result<Self> {
        let ves_dir = path.join(".ves");

        if path.exists() {
            if !path.is_dir() {
                return Err(VesError::RepositoryExists(path.to_path_buf()).into());
            }
            if ves_dir.exists() && fs::read_dir(&ves_dir)?.next().is_some() {
                return Err(VesError::RepositoryExists(path.to_path_buf()).into());
            }
        } else {
            fs::create_dir_all(path)?;
        }

        for dir in ["branches", "objects", "refs/tags", "refs/heads"] {
            fs::create_dir_all(ves_dir.join(dir))?;
        }

        fs::write(ves_dir.join("description"), DESCRIPTION)?;
        fs::write(ves_dir.join("HEAD"), "ref: refs/heads/master\n")?;

        let mut conf = Ini::new();
        conf.with_section(Some("core"))
            .set("repositoryformatversion", "0")
            .set("filemode", "false")
            .set("bare", "false");
        conf.write_to_file(ves_dir.join("config"))?;

        log::debug!("created repository at {}", path.display());
        Self::open(path)
    }

    #[must_use]
    pub fn conf(&self) -> &Ini {
        &self.conf
    }

    /// Compose a path beneath `.ves`.
    #[must_use]
    pub fn repo_path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.ves_dir.join(rel)
    }

    /// Path to a file beneath `.ves`, creating the parent directories
    /// when `mkdir` is set.
    pub fn repo_file(&self, rel: impl AsRef<Path>, mkdir: bool) -> Result<PathBuf> {
        let path = self.repo_path(rel);
        if mkdir {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(path)
    }

    /// Path to a directory beneath `.ves`; `None` when it does not exist
    /// and `mkdir` is unset.
    pub fn repo_dir(&self, rel: impl AsRef<Path>, mkdir: bool) -> Result<Option<PathBuf>> {
        let path = self.repo_path(rel);

        if path.exists() {
            if path.is_dir() {
                return Ok(Some(path));
            }
            bail!("not a directory: {}", path.display());
        }
        if mkdir {
            fs::create_dir_all(&path)?;
            return Ok(Some(path));
        }
        Ok(None)
    }
}
