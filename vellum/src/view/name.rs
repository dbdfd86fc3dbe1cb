//! Logical template names, e.g. `users.index` or `admin::users.index`.
use crate::Error;

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use std::str::FromStr;

static SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-]+$").expect("regex"));

/// Template name. Segments are separated by `.` (or `/`), and map to
/// directories under the template roots. An optional `namespace::` prefix
/// restricts the search to the namespace's directories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateName {
    namespace: Option<String>,
    segments: Vec<String>,
}

impl TemplateName {
    pub fn new(name: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidName(name.to_string());

        let (namespace, path) = match name.split_once("::") {
            Some((namespace, path)) => {
                if !SEGMENT.is_match(namespace) || path.contains("::") {
                    return Err(invalid());
                }
                (Some(namespace.to_string()), path)
            }
            None => (None, name),
        };

        let segments = path
            .split(['.', '/'])
            .map(|segment| {
                if SEGMENT.is_match(segment) {
                    Ok(segment.to_string())
                } else {
                    Err(invalid())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            namespace,
            segments,
        })
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Path relative to a template root, without the extension.
    pub fn relative_path(&self) -> PathBuf {
        self.segments.iter().collect()
    }
}

impl FromStr for TemplateName {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        TemplateName::new(name)
    }
}

impl std::fmt::Display for TemplateName {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if let Some(namespace) = &self.namespace {
            write!(f, "{}::", namespace)?;
        }

        write!(f, "{}", self.segments.join("."))
    }
}
