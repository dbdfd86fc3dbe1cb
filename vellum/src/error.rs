//! Global error type.
use crate::view::{template, ResolvedSource};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("template \"{name}\" not found, tried: {}", list(.attempted))]
    NotFound { name: String, attempted: Vec<PathBuf> },

    #[error("\"{0}\" is not a valid template name")]
    InvalidName(String),

    #[error("{}:{line}:{column}: failed to compile template \"{name}\": {message}", .path.display())]
    Compile {
        name: String,
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
        excerpt: Option<String>,
    },

    #[error("failed to write compiled template \"{}\": {source}", .path.display())]
    CacheWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("template \"{name}\" ({}) failed: {source}", .path.display())]
    EngineExecution {
        name: String,
        path: PathBuf,
        source: template::Error,
    },

    #[error("no engine is registered for \".{extension}\" files, needed by \"{name}\"")]
    UnknownEngine { name: String, extension: String },

    #[error("io error on \"{}\": {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Config(#[from] crate::config::Error),

    #[error("watcher: {0}")]
    Watch(#[from] notify::Error),
}

impl Error {
    /// Convert a template language error raised while compiling the source
    /// into a compile error carrying the template identity and location.
    pub(crate) fn compile(source: &ResolvedSource, text: &str, error: template::Error) -> Self {
        let (line, column) = error.location().unwrap_or_else(|| end_of(text));

        Error::Compile {
            name: source.name.to_string(),
            path: source.path.clone(),
            line,
            column,
            message: error.to_string(),
            excerpt: error.pretty(text),
        }
    }

    pub(crate) fn execution(source: &ResolvedSource, error: template::Error) -> Self {
        match error {
            // Errors from included templates are already typed.
            template::Error::Include(error) => *error,
            error => Error::EngineExecution {
                name: source.name.to_string(),
                path: source.path.clone(),
                source: error,
            },
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn cache_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::CacheWrite {
            path: path.into(),
            source,
        }
    }
}

fn list(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no locations are configured".into();
    }

    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// Errors that stop at the end of input point past the last character.
fn end_of(text: &str) -> (usize, usize) {
    let line = std::cmp::max(1, text.lines().count());
    let column = text.lines().last().map(|l| l.chars().count()).unwrap_or(0) + 1;

    if text.ends_with('\n') {
        (line + 1, 1)
    } else {
        (line, column)
    }
}
