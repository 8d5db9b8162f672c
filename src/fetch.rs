//! Repository acquisition.
//!
//! Remote repositories are shallow-cloned with the `git` binary into a
//! temporary directory that lives as long as the returned [`Checkout`].

use crate::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info, warn};

const REMOTE_PREFIXES: &[&str] = &["https://github.com/", "git@github.com:"];
const CLONE_DIR: &str = "repo";

/// Where the documented tree comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSource {
    /// Git URL to clone
    Remote(String),
    /// Existing directory used in place
    Local(PathBuf),
}

impl RepoSource {
    /// Classifies a command-line source argument.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `source` is neither a GitHub URL nor an
    /// existing directory.
    pub fn parse(source: &str) -> Result<Self> {
        let source = source.trim();
        if REMOTE_PREFIXES.iter().any(|p| source.starts_with(p)) {
            return Ok(Self::Remote(source.to_string()));
        }

        let path = PathBuf::from(source);
        if path.is_dir() {
            return Ok(Self::Local(path));
        }

        Err(Error::config(format!(
            "'{source}' is neither a GitHub URL nor an existing directory"
        )))
    }

    /// Makes the tree available on disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] if the clone fails or the local directory
    /// is gone.
    pub fn checkout(&self) -> Result<Checkout> {
        match self {
            Self::Local(path) => {
                if !path.is_dir() {
                    return Err(Error::fetch(
                        path.display().to_string(),
                        "directory does not exist",
                    ));
                }
                Ok(Checkout {
                    root: path.clone(),
                    temp: None,
                })
            }
            Self::Remote(url) => clone_shallow(url),
        }
    }
}

impl fmt::Display for RepoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => f.write_str(url),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A tree on disk, owning its temporary clone if there is one.
#[derive(Debug)]
pub struct Checkout {
    root: PathBuf,
    temp: Option<TempDir>,
}

impl Checkout {
    /// Root directory of the tree.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Returns true if the tree is a temporary clone.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }

    /// Removes the temporary clone. Failures are logged, never returned.
    pub fn cleanup(self) {
        let Some(temp) = self.temp else {
            return;
        };

        let location = temp.path().display().to_string();
        match temp.close() {
            Ok(()) => debug!("Removed clone at {}", location),
            Err(e) => warn!("Failed to remove clone at {}: {}", location, e),
        }
    }
}

fn clone_shallow(url: &str) -> Result<Checkout> {
    let temp = tempfile::Builder::new()
        .prefix("repodoc-")
        .tempdir()
        .map_err(|e| Error::fetch(url, format!("cannot create temporary directory: {e}")))?;
    let root = temp.path().join(CLONE_DIR);

    info!("Cloning {}", url);
    let output = Command::new("git")
        .args(["clone", "--depth", "1", "--quiet"])
        .arg(url)
        .arg(&root)
        .output()
        .map_err(|e| Error::fetch(url, format!("cannot run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::fetch(
            url,
            format!("git clone exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    Ok(Checkout {
        root,
        temp: Some(temp),
    })
}
