use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::{env, fs};

use regex::Regex;

use hc_core::ParametricHypercube;

use crate::container;
use crate::error::{Result, StoreError};

/// File extension for containers kept in a catalog.
pub const EXTENSION: &str = "hcube";

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap());

/// Default catalog directory: `~/.hypercube`.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".hypercube")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// A directory of named containers, one `<name>.hcube` file each.
#[derive(Debug, Clone)]
pub struct Catalog {
    base_dir: PathBuf,
}

impl Catalog {
    pub fn open(base_dir: &Path) -> Result<Self> {
        fs::create_dir_all(base_dir)?;
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(&default_base_dir())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Container path for `name`. Names are restricted to letters, digits,
    /// `_`, `.` and `-`, and cannot be `.` or `..`.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        if !NAME_RE.is_match(name) || name == "." || name == ".." {
            return Err(StoreError::InvalidData(format!(
                "invalid catalog name '{name}'"
            )));
        }
        Ok(self.base_dir.join(format!("{name}.{EXTENSION}")))
    }

    pub fn save(&self, name: &str, cube: &ParametricHypercube, level: i32) -> Result<PathBuf> {
        let path = self.path_for(name)?;
        container::save(cube, &path, level)?;
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<ParametricHypercube> {
        container::load(&self.path_for(name)?)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.path_for(name).is_ok_and(|p| p.is_file())
    }

    /// Names of stored containers, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && NAME_RE.is_match(stem)
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete a stored container. Returns false when nothing was stored
    /// under `name`.
    pub fn remove(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(name, path = %path.display(), "catalog entry removed");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
