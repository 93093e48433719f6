use crate::core::{Result, StoreError};
use crate::storage::DurabilityMode;
use std::path::{Path, PathBuf};

const URL_SCHEME: &str = "taskstore://";

/// Local document store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the journal and snapshot files
    pub data_dir: PathBuf,

    /// How hard each journal append is pushed to disk
    pub durability: DurabilityMode,

    /// Number of journal entries after which a snapshot is taken
    pub checkpoint_threshold: usize,
}

impl StoreConfig {
    /// Create a new store configuration rooted at `data_dir`
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            durability: DurabilityMode::default(),
            checkpoint_threshold: 1000,
        }
    }

    /// Set the durability mode
    pub fn durability(mut self, durability: DurabilityMode) -> Self {
        self.durability = durability;
        self
    }

    /// Set the checkpoint threshold
    pub fn checkpoint_threshold(mut self, threshold: usize) -> Self {
        self.checkpoint_threshold = threshold;
        self
    }

    /// Parse from a store URL
    ///
    /// Format: "taskstore://<path>[?durability=sync|async|none&checkpoint=<n>]"
    ///
    /// # Examples
    ///
    /// ```
    /// # use taskstore::{DurabilityMode, StoreConfig};
    /// let config = StoreConfig::from_url("taskstore:///var/lib/tasks?durability=sync").unwrap();
    /// assert_eq!(config.durability, DurabilityMode::Sync);
    /// ```
    pub fn from_url(url: &str) -> Result<Self> {
        let rest = url.strip_prefix(URL_SCHEME).ok_or_else(|| {
            StoreError::Config(format!("URL must start with '{}'", URL_SCHEME))
        })?;

        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };
        if path.is_empty() {
            return Err(StoreError::Config("URL has no data directory".to_string()));
        }

        let mut config = Self::new(path);
        for pair in query.into_iter().flat_map(|q| q.split('&')).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                StoreError::Config(format!("invalid query parameter '{}'", pair))
            })?;
            match key {
                "durability" => config.durability = value.parse()?,
                "checkpoint" => {
                    config.checkpoint_threshold = value.parse().map_err(|_| {
                        StoreError::Config(format!("invalid checkpoint threshold '{}'", value))
                    })?
                }
                other => {
                    return Err(StoreError::Config(format!(
                        "unknown query parameter '{}'",
                        other
                    )));
                }
            }
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(StoreError::Config("data_dir cannot be empty".to_string()));
        }

        if self.checkpoint_threshold == 0 {
            return Err(StoreError::Config(
                "checkpoint_threshold must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Migration runner configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Documents fetched per key-range page during bulk rewrites
    pub page_size: usize,
}

impl MigrationConfig {
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self { page_size: 100 }
    }
}
