//! Template finder.
//!
//! Maps template names to files under the configured directories.
//! For each directory in order, every registered extension is tried in order;
//! the first file that exists wins.
use super::TemplateName;
use crate::filesystem::Filesystem;
use crate::{Config, Error};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// A template file found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSource {
    pub name: TemplateName,
    pub path: PathBuf,
    pub modified: SystemTime,
    pub extension: String,
}

pub struct Finder {
    paths: Vec<PathBuf>,
    namespaces: BTreeMap<String, Vec<PathBuf>>,
    extensions: Vec<String>,
    fs: Arc<dyn Filesystem>,
}

impl Finder {
    pub fn new(config: &Config, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            paths: config.paths.clone(),
            namespaces: config.namespaces.clone(),
            extensions: config
                .engines
                .iter()
                .map(|binding| binding.extension.clone())
                .collect(),
            fs,
        }
    }

    /// Find the template file.
    pub fn resolve(&self, name: &TemplateName) -> Result<ResolvedSource, Error> {
        let candidates = self.candidates(name);

        for (path, extension) in &candidates {
            if self.fs.exists(path) {
                let modified = self
                    .fs
                    .modified(path)
                    .map_err(|err| Error::io(path, err))?;

                return Ok(ResolvedSource {
                    name: name.clone(),
                    path: path.clone(),
                    modified,
                    extension: extension.to_string(),
                });
            }
        }

        Err(Error::NotFound {
            name: name.to_string(),
            attempted: candidates.into_iter().map(|(path, _)| path).collect(),
        })
    }

    /// Every path the template could be at, in search order.
    pub fn candidates(&self, name: &TemplateName) -> Vec<(PathBuf, &str)> {
        let relative = &name.relative_path();

        self.roots_for(name)
            .iter()
            .flat_map(|root| {
                self.extensions.iter().map(move |extension| {
                    let mut file = root.join(relative).into_os_string();
                    file.push(".");
                    file.push(extension);
                    (PathBuf::from(file), extension.as_str())
                })
            })
            .collect()
    }

    /// The name that refers to the file, if the file is a template under one of
    /// the configured directories. The file may be shadowed by another one.
    pub fn name_for(&self, path: &Path) -> Option<TemplateName> {
        let namespaced = self.namespaces.iter().flat_map(|(namespace, roots)| {
            roots.iter().map(move |root| (Some(namespace.as_str()), root))
        });

        self.paths
            .iter()
            .map(|root| (None, root))
            .chain(namespaced)
            .find_map(|(namespace, root)| self.name_under(namespace, root, path))
    }

    /// All templates, in search order. Shadowed files aren't included.
    pub fn sources(&self) -> Result<Vec<ResolvedSource>, Error> {
        let mut sources = vec![];

        let roots = self
            .paths
            .iter()
            .map(|root| (None, root))
            .chain(self.namespaces.iter().flat_map(|(namespace, roots)| {
                roots.iter().map(move |root| (Some(namespace.as_str()), root))
            }));

        for (namespace, root) in roots {
            let files = self
                .fs
                .list_directory(root)
                .map_err(|err| Error::io(root, err))?;

            for file in files {
                let name = match self.name_under(namespace, root, &file) {
                    Some(name) => name,
                    None => continue,
                };

                let source = self.resolve(&name)?;

                // Only the file the name resolves to.
                if source.path == file {
                    sources.push(source);
                }
            }
        }

        Ok(sources)
    }

    /// Template directories, namespaced ones included.
    pub fn roots(&self) -> Vec<&Path> {
        self.paths
            .iter()
            .chain(self.namespaces.values().flatten())
            .map(|path| path.as_path())
            .collect()
    }

    fn roots_for(&self, name: &TemplateName) -> &[PathBuf] {
        match name.namespace() {
            Some(namespace) => self
                .namespaces
                .get(namespace)
                .map(|roots| roots.as_slice())
                .unwrap_or(&[]),
            None => &self.paths,
        }
    }

    fn name_under(&self, namespace: Option<&str>, root: &Path, path: &Path) -> Option<TemplateName> {
        let relative = path.strip_prefix(root).ok()?;
        let extension = relative.extension()?.to_str()?;

        if !self.extensions.iter().any(|known| known == extension) {
            return None;
        }

        let stem = relative.with_extension("");
        let segments = stem
            .iter()
            .map(|segment| segment.to_str())
            .collect::<Option<Vec<_>>>()?;

        let name = match namespace {
            Some(namespace) => format!("{}::{}", namespace, segments.join(".")),
            None => segments.join("."),
        };

        TemplateName::new(&name).ok()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::filesystem::LocalFilesystem;
    use std::fs::{create_dir_all, write};
    use tempdir::TempDir;

    fn setup() -> (TempDir, Finder) {
        let dir = TempDir::new("vellum-finder").expect("tempdir");
        let root = dir.path();

        for (path, contents) in [
            ("app/users/index.tmpl", "app users"),
            ("app/users/index.html", "app users html"),
            ("app/home.html", "app home"),
            ("shared/users/index.tmpl", "shared users"),
            ("shared/footer.tmpl", "footer"),
            ("shared/notes.txt", "not a template"),
            ("admin/dashboard.tmpl", "dashboard"),
        ] {
            let path = root.join(path);
            create_dir_all(path.parent().expect("parent")).expect("mkdir");
            write(path, contents).expect("write");
        }

        let config = Config::default()
            .path(root.join("app"))
            .path(root.join("shared"))
            .namespace("admin", root.join("admin"))
            .cache(root.join("cache"));

        let finder = Finder::new(&config, Arc::new(LocalFilesystem));

        (dir, finder)
    }

    #[test]
    fn test_resolve() -> Result<(), Error> {
        let (dir, finder) = setup();
        let root = dir.path();

        // First root wins, then the first extension.
        let source = finder.resolve(&TemplateName::new("users.index")?)?;
        assert_eq!(source.path, root.join("app/users/index.tmpl"));
        assert_eq!(source.extension, "tmpl");

        let source = finder.resolve(&TemplateName::new("home")?)?;
        assert_eq!(source.path, root.join("app/home.html"));
        assert_eq!(source.extension, "html");

        let source = finder.resolve(&TemplateName::new("footer")?)?;
        assert_eq!(source.path, root.join("shared/footer.tmpl"));

        let source = finder.resolve(&TemplateName::new("admin::dashboard")?)?;
        assert_eq!(source.path, root.join("admin/dashboard.tmpl"));

        // Resolution doesn't change while the files don't.
        for _ in 0..3 {
            assert_eq!(
                finder.resolve(&TemplateName::new("users/index")?)?,
                finder.resolve(&TemplateName::new("users.index")?)?
            );
        }

        Ok(())
    }

    #[test]
    fn test_not_found() -> Result<(), Error> {
        let (dir, finder) = setup();
        let root = dir.path();

        match finder.resolve(&TemplateName::new("missing")?) {
            Err(Error::NotFound { name, attempted }) => {
                assert_eq!(name, "missing");
                assert_eq!(
                    attempted,
                    vec![
                        root.join("app/missing.tmpl"),
                        root.join("app/missing.html"),
                        root.join("shared/missing.tmpl"),
                        root.join("shared/missing.html"),
                    ]
                );
            }
            result => panic!("expected not found, got {:?}", result),
        }

        // Namespaces only search their own directories.
        assert!(matches!(
            finder.resolve(&TemplateName::new("admin::footer")?),
            Err(Error::NotFound { attempted, .. }) if attempted.len() == 2
        ));
        assert!(matches!(
            finder.resolve(&TemplateName::new("dashboard")?),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            finder.resolve(&TemplateName::new("unknown::dashboard")?),
            Err(Error::NotFound { attempted, .. }) if attempted.is_empty()
        ));

        Ok(())
    }

    #[test]
    fn test_name_for() -> Result<(), Error> {
        let (dir, finder) = setup();
        let root = dir.path();

        assert_eq!(
            finder.name_for(&root.join("shared/users/index.tmpl")),
            Some(TemplateName::new("users.index")?)
        );
        assert_eq!(
            finder.name_for(&root.join("admin/dashboard.tmpl")),
            Some(TemplateName::new("admin::dashboard")?)
        );
        assert_eq!(finder.name_for(&root.join("shared/notes.txt")), None);
        assert_eq!(finder.name_for(&root.join("elsewhere/home.tmpl")), None);

        Ok(())
    }

    #[test]
    fn test_sources() -> Result<(), Error> {
        let (dir, finder) = setup();
        let root = dir.path();

        let paths = finder
            .sources()?
            .into_iter()
            .map(|source| source.path)
            .collect::<Vec<_>>();

        assert_eq!(
            paths,
            vec![
                root.join("app/home.html"),
                root.join("app/users/index.tmpl"),
                root.join("shared/footer.tmpl"),
                root.join("admin/dashboard.tmpl"),
            ]
        );

        assert_eq!(finder.roots().len(), 3);

        Ok(())
    }
}
