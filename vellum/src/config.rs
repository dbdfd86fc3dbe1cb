//! Template engine configuration.
//!
//! Configuration is built in code or loaded from a TOML file:
//!
//! ```toml
//! [views]
//! paths = ["views"]
//! cache = "storage/views"
//!
//! [views.namespaces]
//! admin = ["admin/views"]
//!
//! [[views.engines]]
//! extension = "tmpl"
//! engine = "compiled"
//! ```
//!
//! Relative paths in the file are relative to the directory the file is in.
//! The cache directory can be overridden with the `VELLUM_CACHE_PATH` environment variable.
use crate::view::EngineKind;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env::var;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum Error {
    #[error("config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config file \"{}\" could not be read: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config not found")]
    NoConfig,

    #[error("cache path is not configured, set it in the config or with VELLUM_CACHE_PATH")]
    NoCachePath,

    #[error("engine extension can't be empty")]
    EmptyExtension,
}

/// Extension handled by an engine, e.g. `tmpl` files are compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineBinding {
    pub extension: String,
    #[serde(rename = "engine")]
    pub kind: EngineKind,
}

impl EngineBinding {
    pub fn new(extension: &str, kind: EngineKind) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_string(),
            kind,
        }
    }
}

/// Template engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    path: Option<PathBuf>,
    /// Default template directories, searched in order.
    pub paths: Vec<PathBuf>,
    /// Directories searched for `namespace::name` templates.
    pub namespaces: BTreeMap<String, Vec<PathBuf>>,
    /// Where compiled templates are written.
    pub cache: Option<PathBuf>,
    /// Engines by extension. The order is also the order
    /// extensions are tried when looking for a template.
    pub engines: Vec<EngineBinding>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: None,
            paths: vec![],
            namespaces: BTreeMap::new(),
            cache: cache_path_from_env(),
            engines: vec![
                EngineBinding::new("tmpl", EngineKind::Compiled),
                EngineBinding::new("html", EngineKind::Raw),
            ],
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, Error> {
        let path = path.as_ref();
        let file = ConfigFile::load(path)?;
        let base = path.parent().unwrap_or(Path::new("")).to_owned();
        let relative = |dir: PathBuf| base.join(dir);

        let mut config = Config::default();
        let views = file.views;

        config.path = Some(path.to_owned());
        config.paths = views.paths.into_iter().map(relative).collect();
        config.namespaces = views
            .namespaces
            .into_iter()
            .map(|(namespace, paths)| (namespace, paths.into_iter().map(relative).collect()))
            .collect();

        if let Some(cache) = cache_path_from_env().or(views.cache.map(relative)) {
            config.cache = Some(cache);
        }

        if let Some(engines) = views.engines {
            config.engines = engines
                .into_iter()
                .map(|binding| EngineBinding::new(&binding.extension, binding.kind))
                .collect();
        }

        config.validate()?;

        Ok(config)
    }

    /// Load `vellum.toml` from the working directory.
    pub fn load_default() -> Result<Config, Error> {
        let path = PathBuf::from("vellum.toml");

        if path.exists() {
            Config::load(path)
        } else {
            Err(Error::NoConfig)
        }
    }

    /// Add a default template directory.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.paths.push(path.as_ref().to_owned());
        self
    }

    /// Add a directory for templates in the namespace.
    pub fn namespace(mut self, namespace: &str, path: impl AsRef<Path>) -> Self {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .push(path.as_ref().to_owned());
        self
    }

    /// Set the compiled templates directory.
    pub fn cache(mut self, path: impl AsRef<Path>) -> Self {
        self.cache = Some(path.as_ref().to_owned());
        self
    }

    /// Bind an extension to an engine. Binding an extension again
    /// changes its engine but keeps its place in the search order.
    pub fn engine(mut self, extension: &str, kind: EngineKind) -> Self {
        let binding = EngineBinding::new(extension, kind);

        match self
            .engines
            .iter_mut()
            .find(|existing| existing.extension == binding.extension)
        {
            Some(existing) => existing.kind = binding.kind,
            None => self.engines.push(binding),
        }

        self
    }

    /// Directory for compiled templates.
    pub fn cache_path(&self) -> Result<&Path, Error> {
        self.cache.as_deref().ok_or(Error::NoCachePath)
    }

    /// Where the config was loaded from, if it came from a file.
    pub fn file(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.cache_path()?;

        if self.engines.iter().any(|binding| binding.extension.is_empty()) {
            return Err(Error::EmptyExtension);
        }

        Ok(())
    }

    pub fn log_info(&self) {
        if let Some(path) = &self.path {
            info!("Using configuration from \"{}\"", path.display());
        }

        if let Some(cache) = &self.cache {
            info!("Compiled templates are stored in \"{}\"", cache.display());
        }
    }
}

fn cache_path_from_env() -> Option<PathBuf> {
    var("VELLUM_CACHE_PATH").ok().map(PathBuf::from)
}

#[derive(Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    views: ViewsConfig,
}

impl ConfigFile {
    fn load(path: &Path) -> Result<ConfigFile, Error> {
        let file = read_to_string(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        let config: Self = toml::from_str(&file)?;

        Ok(config)
    }
}

#[derive(Serialize, Deserialize, Default)]
struct ViewsConfig {
    #[serde(default)]
    paths: Vec<PathBuf>,
    cache: Option<PathBuf>,
    #[serde(default)]
    namespaces: BTreeMap<String, Vec<PathBuf>>,
    engines: Option<Vec<EngineBinding>>,
}
