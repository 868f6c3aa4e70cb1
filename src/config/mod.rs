//! User preferences: a flat `key=value` file naming the directories
//! the tool works out of.
//!
//! Loading never fails. A missing file, an unknown key, or a value
//! that is not a usable directory all degrade to computed defaults
//! under the user's home, and the directories are created on the way
//! out so later saves and cache writes have somewhere to land.
//!
//! Note the delimiter: preferences use `=`, templates use `:`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::data::cache;
use crate::data::scan::DatasetKind;

/// Filename of the preferences file inside the config base.
pub const PREFS_FILENAME: &str = "preferences.txt";

/// Base directory for everything this tool persists.
pub fn config_base() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".nmr-plotter")
}

/// Default location of the preferences file.
pub fn default_prefs_path() -> PathBuf {
    config_base().join(PREFS_FILENAME)
}

/// The directory-valued preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    /// Where the directory picker starts browsing for data.
    pub data_dir: PathBuf,
    /// Where plot templates are kept.
    pub template_dir: PathBuf,
    /// Where the scan cache stores live.
    pub cache_dir: PathBuf,
}

impl Default for Preferences {
    fn default() -> Self {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            data_dir: home,
            template_dir: config_base().join("templates"),
            cache_dir: config_base().join("cache"),
        }
    }
}

impl Preferences {
    /// Read preferences from `path`, falling back per key. Every
    /// directory in the result exists afterwards.
    pub fn load(path: &Path) -> Self {
        let mut prefs = Self::default();

        match fs::read_to_string(path) {
            Ok(content) => prefs.apply(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("cannot read preferences {}: {}", path.display(), e),
        }

        prefs.ensure_dirs();
        prefs
    }

    fn apply(&mut self, content: &str) {
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                log::warn!("preferences line {}: no separator; ignored", lineno + 1);
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "data_dir" => self.data_dir = PathBuf::from(value),
                "template_dir" => self.template_dir = PathBuf::from(value),
                "cache_dir" => self.cache_dir = PathBuf::from(value),
                other => log::warn!("unknown preference key {:?}; ignored", other),
            }
        }
    }

    /// Replace values that are not usable directories with their
    /// defaults, then create whatever is missing.
    fn ensure_dirs(&mut self) {
        let defaults = Self::default();
        ensure_dir(&mut self.data_dir, &defaults.data_dir, "data_dir");
        ensure_dir(&mut self.template_dir, &defaults.template_dir, "template_dir");
        ensure_dir(&mut self.cache_dir, &defaults.cache_dir, "cache_dir");
    }

    /// Write the preferences back in the same format.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = format!(
            "data_dir={}\ntemplate_dir={}\ncache_dir={}\n",
            self.data_dir.display(),
            self.template_dir.display(),
            self.cache_dir.display()
        );
        fs::write(path, content)
    }

    /// Cache store file for the given dataset layout.
    pub fn cache_store(&self, kind: DatasetKind) -> PathBuf {
        cache::store_path(&self.cache_dir, kind)
    }
}

fn ensure_dir(dir: &mut PathBuf, fallback: &Path, key: &str) {
    if dir.exists() && !dir.is_dir() {
        log::warn!(
            "preference {} points at {}, which is not a directory; using {}",
            key,
            dir.display(),
            fallback.display()
        );
        *dir = fallback.to_path_buf();
    }
    if !dir.exists() {
        if let Err(e) = fs::create_dir_all(&dir) {
            log::warn!("cannot create {} {}: {}; using {}", key, dir.display(), e, fallback.display());
            *dir = fallback.to_path_buf();
            let _ = fs::create_dir_all(&dir);
        }
    }
}
