//! Reference property values stored on disk, one file per monomer

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors that can occur when reading or writing cached properties
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error in {path} at line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

/// Store of per-atom property values keyed by monomer name
pub trait PropertyCache: Send + Sync {
    fn has_cached(&self, key: &str) -> bool;

    fn load(&self, key: &str) -> Result<Vec<f64>, CacheError>;

    fn save(&self, key: &str, values: &[f64]) -> Result<(), CacheError>;
}

/// Cache stored as `<dir>/<key>-<suffix>.txt`, one value per line
#[derive(Debug, Clone)]
pub struct DirectoryCache {
    dir: PathBuf,
    suffix: String,
}

impl DirectoryCache {
    pub fn new<P: AsRef<Path>>(dir: P, suffix: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            suffix: suffix.to_string(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}-{}.txt", key, self.suffix))
    }
}

impl PropertyCache for DirectoryCache {
    fn has_cached(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    fn load(&self, key: &str) -> Result<Vec<f64>, CacheError> {
        let path = self.path_for(key);
        let reader = BufReader::new(File::open(&path)?);

        let mut values = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let value = trimmed.parse::<f64>().map_err(|_| CacheError::Parse {
                path: path.clone(),
                line: i + 1,
                message: format!("Invalid value: {}", trimmed),
            })?;
            values.push(value);
        }
        Ok(values)
    }

    /// Values are written to a temporary file in the cache directory and
    /// renamed into place, so readers see either the old or the new file.
    fn save(&self, key: &str, values: &[f64]) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let mut staged = NamedTempFile::new_in(&self.dir)?;
        {
            let mut out = BufWriter::new(staged.as_file_mut());
            for value in values {
                writeln!(out, "{}", value)?;
            }
            out.flush()?;
        }
        staged.persist(self.path_for(key)).map_err(|e| e.error)?;
        Ok(())
    }
}
