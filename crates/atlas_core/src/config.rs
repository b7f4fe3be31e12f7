//! Run configuration loaded from `atlas.toml`.
//!
//! # Responsibility
//! - Deserialize every run knob with a default except `atlas_dir`.
//! - Resolve relative paths against the directory holding the config file.
//! - Translate the knobs into `ExpansionConfig` / `FetchOptions`.
//!
//! # Invariants
//! - A config that passed `validate` produces an `ExpansionConfig` that
//!   `iterate_expand` accepts.
//!
//! ```toml
//! atlas_dir = "atlas"
//! seed_bibtex = "seed.bib"
//! catalog = "catalog.json"
//! target_size = 500
//! ```

use crate::cartography::{ExpandOptions, DEFAULT_CONVERGENCE_KERNEL_SIZE, DEFAULT_N_PUBS_MAX};
use crate::expansion::{ExpansionConfig, DEFAULT_MAX_FAILED_EXPANSIONS};
use crate::librarian::{FetchOptions, RetryPolicy, DEFAULT_CALL_SIZE};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CATALOG_LIBRARIAN_ID: &str = "catalog";
pub const BOW_VECTORIZER_ID: &str = "bow";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AtlasConfig {
    pub atlas_dir: PathBuf,
    #[serde(default = "default_seed_bibtex")]
    pub seed_bibtex: PathBuf,
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    #[serde(default = "default_librarian")]
    pub librarian: String,
    #[serde(default = "default_vectorizer")]
    pub vectorizer: String,
    #[serde(default = "default_bow_dimension")]
    pub bow_dimension: usize,
    #[serde(default = "default_target_size")]
    pub target_size: usize,
    #[serde(default = "default_max_failed_expansions")]
    pub max_failed_expansions: usize,
    #[serde(default = "default_n_pubs_max")]
    pub n_pubs_max: usize,
    #[serde(default)]
    pub n_sources_max: Option<usize>,
    #[serde(default = "default_call_size")]
    pub call_size: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_convergence_kernel_size")]
    pub convergence_kernel_size: usize,
    /// Falls back to `logging::default_log_level()`.
    #[serde(default)]
    pub log_level: Option<String>,
    /// Falls back to `<atlas_dir>/logs`.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Fixes candidate sampling; `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_seed_bibtex() -> PathBuf {
    PathBuf::from("seed.bib")
}

fn default_librarian() -> String {
    CATALOG_LIBRARIAN_ID.to_string()
}

fn default_vectorizer() -> String {
    BOW_VECTORIZER_ID.to_string()
}

fn default_bow_dimension() -> usize {
    256
}

fn default_target_size() -> usize {
    1000
}

fn default_max_failed_expansions() -> usize {
    DEFAULT_MAX_FAILED_EXPANSIONS
}

fn default_n_pubs_max() -> usize {
    DEFAULT_N_PUBS_MAX
}

fn default_call_size() -> usize {
    DEFAULT_CALL_SIZE
}

fn default_max_attempts() -> u32 {
    50
}

fn default_backoff_secs() -> u64 {
    2
}

fn default_workers() -> usize {
    1
}

fn default_convergence_kernel_size() -> usize {
    DEFAULT_CONVERGENCE_KERNEL_SIZE
}

impl AtlasConfig {
    /// Reads, resolves and validates the config at `path`.
    ///
    /// # Errors
    /// - `Io` when the file cannot be read.
    /// - `Parse` on malformed TOML or unknown keys.
    /// - `Invalid` when `validate` rejects a value.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = match path.parent() {
            Some(parent) if parent.is_absolute() => parent.to_path_buf(),
            parent => std::env::current_dir()
                .map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?
                .join(parent.unwrap_or_else(|| Path::new(""))),
        };
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let config = config.resolved_against(&base);
        config.validate()?;
        Ok(config)
    }

    /// Rebases every relative path onto `base`.
    pub fn resolved_against(mut self, base: &Path) -> Self {
        self.atlas_dir = base.join(&self.atlas_dir);
        self.seed_bibtex = base.join(&self.seed_bibtex);
        self.catalog = self.catalog.map(|catalog| base.join(catalog));
        self.log_dir = self.log_dir.map(|log_dir| base.join(log_dir));
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let positive = [
            ("target_size", self.target_size),
            ("max_failed_expansions", self.max_failed_expansions),
            ("n_pubs_max", self.n_pubs_max),
            ("call_size", self.call_size),
            ("workers", self.workers),
            ("convergence_kernel_size", self.convergence_kernel_size),
            ("bow_dimension", self.bow_dimension),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be greater than 0")));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be greater than 0".to_string(),
            ));
        }
        if self.librarian.trim().is_empty() {
            return Err(ConfigError::Invalid("librarian cannot be blank".to_string()));
        }
        if self.vectorizer.trim().is_empty() {
            return Err(ConfigError::Invalid("vectorizer cannot be blank".to_string()));
        }
        if self.librarian == CATALOG_LIBRARIAN_ID && self.catalog.is_none() {
            return Err(ConfigError::Invalid(
                "the catalog librarian needs a `catalog` path".to_string(),
            ));
        }
        Ok(())
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.atlas_dir.join("logs"))
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            call_size: self.call_size,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                backoff: Duration::from_secs(self.backoff_secs),
                ..RetryPolicy::default()
            },
        }
    }

    /// Loop settings; the center is left for the tracer to fill in.
    pub fn to_expansion_config(&self) -> ExpansionConfig {
        ExpansionConfig {
            target_size: self.target_size,
            max_failed_expansions: self.max_failed_expansions,
            expand: ExpandOptions {
                center: None,
                n_pubs_max: self.n_pubs_max,
                n_sources_max: self.n_sources_max,
                fetch: self.fetch_options(),
            },
            convergence_kernel_size: self.convergence_kernel_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AtlasConfig, ConfigError};
    use std::path::Path;
    use std::time::Duration;

    fn parse(text: &str) -> AtlasConfig {
        toml::from_str(text).expect("config should parse")
    }

    #[test]
    fn minimal_config_takes_defaults() {
        let config = parse("atlas_dir = \"atlas\"\ncatalog = \"catalog.json\"\n");
        config.validate().expect("defaults should validate");

        let expansion = config.to_expansion_config();
        assert_eq!(expansion.max_failed_expansions, 2);
        assert_eq!(expansion.expand.n_pubs_max, 4000);
        assert_eq!(expansion.expand.n_sources_max, None);
        assert_eq!(expansion.expand.fetch.call_size, 10);
        assert_eq!(expansion.expand.fetch.retry.max_attempts, 50);
        assert_eq!(expansion.expand.fetch.retry.backoff, Duration::from_secs(2));
        assert_eq!(expansion.convergence_kernel_size, 16);
        assert_eq!(config.librarian, "catalog");
        assert_eq!(config.vectorizer, "bow");
    }

    #[test]
    fn missing_atlas_dir_fails_to_parse() {
        let result: Result<AtlasConfig, _> = toml::from_str("target_size = 10\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<AtlasConfig, _> =
            toml::from_str("atlas_dir = \"atlas\"\ntarget_sise = 10\n");
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_zero_sizes_and_missing_catalog() {
        let zero_call = parse("atlas_dir = \"a\"\ncatalog = \"c.json\"\ncall_size = 0\n");
        let error = zero_call.validate().expect_err("zero call_size must fail");
        assert!(matches!(error, ConfigError::Invalid(message) if message.contains("call_size")));

        let no_catalog = parse("atlas_dir = \"a\"\n");
        assert!(no_catalog.validate().is_err());

        let blank_vectorizer = parse("atlas_dir = \"a\"\ncatalog = \"c.json\"\nvectorizer = \" \"\n");
        assert!(blank_vectorizer.validate().is_err());
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let config = parse("atlas_dir = \"atlas\"\ncatalog = \"data/catalog.json\"\n")
            .resolved_against(Path::new("/runs/demo"));

        assert_eq!(config.atlas_dir, Path::new("/runs/demo/atlas"));
        assert_eq!(config.seed_bibtex, Path::new("/runs/demo/seed.bib"));
        assert_eq!(
            config.catalog.as_deref(),
            Some(Path::new("/runs/demo/data/catalog.json"))
        );
        assert_eq!(config.log_dir(), Path::new("/runs/demo/atlas/logs"));
    }

    #[test]
    fn load_reads_file_next_to_atlas() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("atlas.toml");
        std::fs::write(
            &path,
            "atlas_dir = \"atlas\"\ncatalog = \"catalog.json\"\ntarget_size = 12\nseed = 7\n",
        )
        .expect("config should be written");

        let config = AtlasConfig::load(&path).expect("config should load");
        assert_eq!(config.atlas_dir, dir.path().join("atlas"));
        assert_eq!(config.target_size, 12);
        assert_eq!(config.seed, Some(7));
    }
}
