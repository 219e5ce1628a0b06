//! Template discovery on disk.
//!
//! Templates are `*.json` files in a search path made of the directory named
//! by `CSV2BUFR_TEMPLATES` (when set) followed by the per-user data
//! directory. Earlier directories shadow later ones.

use super::Template;
use crate::constants::{APP_DIR_NAME, TEMPLATE_EXTENSION, TEMPLATES_ENV_VAR};
use crate::error::{Csv2BufrError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A template found in the search path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateEntry {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    search_path: Vec<PathBuf>,
}

impl TemplateStore {
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self { search_path }
    }

    /// Search path from the environment and the user data directory
    pub fn from_env() -> Self {
        let mut search_path = Vec::new();
        if let Ok(dir) = std::env::var(TEMPLATES_ENV_VAR) {
            if !dir.trim().is_empty() {
                search_path.push(PathBuf::from(dir));
            }
        }
        if let Some(data_dir) = dirs::data_dir() {
            search_path.push(data_dir.join(APP_DIR_NAME).join("templates"));
        }
        debug!("Template search path: {:?}", search_path);
        Self { search_path }
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Templates available by name, sorted within each directory
    pub fn list(&self) -> Result<Vec<TemplateEntry>> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for dir in &self.search_path {
            if !dir.is_dir() {
                debug!("Skipping missing template directory {}", dir.display());
                continue;
            }

            let pattern = dir.join(format!("*.{}", TEMPLATE_EXTENSION));
            let pattern = pattern.to_str().ok_or_else(|| Csv2BufrError::TemplateDirectory {
                path: dir.clone(),
            })?;
            let paths = glob::glob(pattern).map_err(|_| Csv2BufrError::TemplateDirectory {
                path: dir.clone(),
            })?;

            let mut found: Vec<PathBuf> = paths
                .filter_map(|entry| match entry {
                    Ok(path) => Some(path),
                    Err(e) => {
                        warn!("Unreadable template entry: {}", e);
                        None
                    }
                })
                .collect();
            found.sort();

            for path in found {
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if seen.insert(name.to_string()) {
                    entries.push(TemplateEntry {
                        name: name.to_string(),
                        path,
                    });
                }
            }
        }

        Ok(entries)
    }

    /// Load a template by file path or by stored name
    pub fn load(&self, name_or_path: &str) -> Result<Template> {
        Template::from_file(&self.resolve(name_or_path)?)
    }

    /// Locate a template file by path or stored name
    pub fn resolve(&self, name_or_path: &str) -> Result<PathBuf> {
        let direct = Path::new(name_or_path);
        if direct.is_file() {
            return Ok(direct.to_path_buf());
        }

        let file_name = format!("{}.{}", name_or_path, TEMPLATE_EXTENSION);
        self.search_path
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| Csv2BufrError::template_not_found(name_or_path))
    }
}
