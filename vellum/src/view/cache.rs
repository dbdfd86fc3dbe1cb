//! Compiled template cache.
//!
//! Compiled templates are written to the cache directory, one file per template source,
//! named after the SHA-1 of the source path. A compiled template is current as long as it
//! isn't older than its source. Writes go through a temporary file and a rename, so
//! concurrent renders, even from other processes, never read a partially written file.
//!
//! Loaded templates are also kept in memory, so a current template is only read from disk once.
use super::{template, ResolvedSource, Template, TemplateName};
use crate::events::{Event, Listener, NoopListener};
use crate::filesystem::Filesystem;
use crate::Error;

use parking_lot::Mutex;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// A compiled template on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledArtifact {
    pub name: TemplateName,
    /// Template source.
    pub source: PathBuf,
    /// Compiled template.
    pub compiled: PathBuf,
    pub compiled_at: SystemTime,
    /// Was it compiled just now?
    pub recompiled: bool,
}

pub struct CompiledCache {
    dir: PathBuf,
    fs: Arc<dyn Filesystem>,
    listener: Arc<dyn Listener>,
    templates: Mutex<HashMap<PathBuf, (SystemTime, Arc<Template>)>>,
}

impl CompiledCache {
    pub fn new(dir: impl AsRef<Path>, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            dir: dir.as_ref().to_owned(),
            fs,
            listener: Arc::new(NoopListener),
            templates: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn set_listener(&mut self, listener: Arc<dyn Listener>) {
        self.listener = listener;
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the compiled template for the source is stored.
    pub fn compiled_path(&self, source: &Path) -> PathBuf {
        let digest = Sha1::digest(source.to_string_lossy().as_bytes());
        self.dir.join(format!("{:x}.json", digest))
    }

    /// The compiled template is missing or older than its source.
    pub fn is_stale(&self, source: &ResolvedSource) -> bool {
        self.current(source).is_none()
    }

    /// Make sure the compiled template is current, compiling the source if it isn't.
    pub fn ensure_compiled<F>(
        &self,
        source: &ResolvedSource,
        compile: F,
    ) -> Result<CompiledArtifact, Error>
    where
        F: Fn(&str) -> Result<String, template::Error>,
    {
        match self.current(source) {
            Some(artifact) => {
                debug!("\"{}\" is up to date", source.name);
                Ok(artifact)
            }
            None => self.refresh(source, compile),
        }
    }

    /// Compile the source, even if the compiled template is current.
    pub fn refresh<F>(&self, source: &ResolvedSource, compile: F) -> Result<CompiledArtifact, Error>
    where
        F: Fn(&str) -> Result<String, template::Error>,
    {
        let name = source.name.to_string();
        let compiled = self.compiled_path(&source.path);

        self.listener.on_event(&Event::Compiling {
            name: &name,
            path: &source.path,
        });

        let text = self
            .fs
            .read_to_string(&source.path)
            .map_err(|err| Error::io(&source.path, err))?;

        let output = compile(&text).map_err(|err| Error::compile(source, &text, err))?;

        self.fs
            .create_dir_all(&self.dir)
            .map_err(|err| Error::cache_write(&self.dir, err))?;

        // Stamped with the source time seen before reading it. An edit saved while
        // compiling moves the source past the stamp, and the next render compiles again.
        self.fs
            .write_atomic(&compiled, &output, source.modified)
            .map_err(|err| Error::cache_write(&compiled, err))?;

        let compiled_at = self
            .fs
            .modified(&compiled)
            .map_err(|err| Error::io(&compiled, err))?;

        self.templates.lock().remove(&compiled);

        info!(
            "compiled \"{}\" ({} => {})",
            name,
            source.path.display(),
            compiled.display()
        );

        self.listener.on_event(&Event::Compiled {
            name: &name,
            path: &source.path,
            artifact: &compiled,
        });

        Ok(CompiledArtifact {
            name: source.name.clone(),
            source: source.path.clone(),
            compiled,
            compiled_at,
            recompiled: true,
        })
    }

    /// Get the executable template from a compiled artifact.
    ///
    /// The template is read from disk once for every version of the artifact.
    /// The lock is held while reading, so concurrent renders of the same template
    /// don't all read it at the same time.
    pub fn load(&self, artifact: &CompiledArtifact) -> Result<Arc<Template>, Error> {
        let mut templates = self.templates.lock();

        if let Some((compiled_at, template)) = templates.get(&artifact.compiled) {
            if *compiled_at == artifact.compiled_at {
                return Ok(template.clone());
            }
        }

        let text = self
            .fs
            .read_to_string(&artifact.compiled)
            .map_err(|err| Error::io(&artifact.compiled, err))?;

        let template = Template::from_compiled(&text, &artifact.source).map_err(|err| {
            Error::EngineExecution {
                name: artifact.name.to_string(),
                path: artifact.compiled.clone(),
                source: err,
            }
        })?;

        let template = Arc::new(template);

        templates.insert(
            artifact.compiled.clone(),
            (artifact.compiled_at, template.clone()),
        );

        Ok(template)
    }

    /// Get the executable template for the source, compiling it if needed.
    /// A compiled template that can't be loaded is compiled again, once.
    pub fn template<F>(&self, source: &ResolvedSource, compile: F) -> Result<Arc<Template>, Error>
    where
        F: Fn(&str) -> Result<String, template::Error>,
    {
        let artifact = self.ensure_compiled(source, &compile)?;

        match self.load(&artifact) {
            Ok(template) => Ok(template),
            Err(err) if !artifact.recompiled => {
                warn!(
                    "compiled template for \"{}\" is unusable, compiling again: {}",
                    source.name, err
                );

                let artifact = self.refresh(source, &compile)?;
                self.load(&artifact)
            }
            Err(err) => Err(err),
        }
    }

    /// Remove all compiled templates. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, Error> {
        let mut templates = self.templates.lock();
        let mut removed = 0;

        let files = self
            .fs
            .list_directory(&self.dir)
            .map_err(|err| Error::io(&self.dir, err))?;

        for file in files {
            let artifact = file.extension().map(|ext| ext == "json").unwrap_or(false);
            let temporary = file.extension().map(|ext| ext == "tmp").unwrap_or(false);

            if artifact || temporary {
                self.fs
                    .remove(&file)
                    .map_err(|err| Error::cache_write(&file, err))?;
            }

            if artifact {
                removed += 1;
            }
        }

        templates.clear();

        info!("removed {} compiled templates from \"{}\"", removed, self.dir.display());

        Ok(removed)
    }

    // The compiled template, if it's current.
    fn current(&self, source: &ResolvedSource) -> Option<CompiledArtifact> {
        let compiled = self.compiled_path(&source.path);

        if !self.fs.exists(&compiled) {
            return None;
        }

        let compiled_at = self.fs.modified(&compiled).ok()?;

        if compiled_at < source.modified {
            return None;
        }

        Some(CompiledArtifact {
            name: source.name.clone(),
            source: source.path.clone(),
            compiled,
            compiled_at,
            recompiled: false,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::filesystem::LocalFilesystem;
    use crate::view::{template::compile, Context, TemplateName};
    use std::fs::{write, File};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tempdir::TempDir;

    fn source(dir: &Path, name: &str, contents: &str) -> ResolvedSource {
        let path = dir.join(format!("{}.tmpl", name));
        write(&path, contents).expect("write");

        resolved(&path, name)
    }

    fn resolved(path: &Path, name: &str) -> ResolvedSource {
        ResolvedSource {
            name: TemplateName::new(name).expect("name"),
            path: path.to_owned(),
            modified: LocalFilesystem.modified(path).expect("modified"),
            extension: "tmpl".into(),
        }
    }

    #[test]
    fn test_ensure_compiled_twice() -> Result<(), Error> {
        let dir = TempDir::new("vellum-cache").expect("tempdir");
        let cache = CompiledCache::new(dir.path().join("cache"), Arc::new(LocalFilesystem));
        let source = source(dir.path(), "hello", "Hello, {{ name }}!");
        let compiles = AtomicUsize::new(0);
        let counting = |text: &str| {
            compiles.fetch_add(1, Ordering::Relaxed);
            compile(text)
        };

        assert!(cache.is_stale(&source));

        let first = cache.ensure_compiled(&source, counting)?;
        let second = cache.ensure_compiled(&source, counting)?;

        assert!(first.recompiled);
        assert!(!second.recompiled);
        assert_eq!(first.compiled, second.compiled);
        assert_eq!(first.compiled_at, second.compiled_at);
        assert_eq!(compiles.load(Ordering::Relaxed), 1);
        assert!(first.compiled.starts_with(dir.path().join("cache")));
        assert!(!cache.is_stale(&source));

        let template = cache.load(&second)?;
        let mut context = Context::new();
        context.set("name", "Al").expect("set");
        assert_eq!(template.render(&context).expect("render"), "Hello, Al!");

        // Loaded once, then kept in memory.
        assert!(Arc::ptr_eq(&template, &cache.load(&second)?));

        Ok(())
    }

    #[test]
    fn test_stale_source() -> Result<(), Error> {
        let dir = TempDir::new("vellum-cache").expect("tempdir");
        let cache = CompiledCache::new(dir.path().join("cache"), Arc::new(LocalFilesystem));
        let source = source(dir.path(), "page", "one");

        let first = cache.ensure_compiled(&source, compile)?;
        assert_eq!(cache.load(&first)?.render_default().expect("render"), "one");

        // Edit the source, dated an hour from now.
        write(&source.path, "two").expect("write");
        let future = SystemTime::now() + Duration::from_secs(3600);
        File::options()
            .write(true)
            .open(&source.path)
            .and_then(|file| file.set_modified(future))
            .expect("set modified");

        let source = resolved(&source.path, "page");
        assert!(cache.is_stale(&source));

        let second = cache.ensure_compiled(&source, compile)?;
        assert!(second.recompiled);
        assert_eq!(second.compiled, first.compiled);
        assert!(second.compiled_at >= source.modified);
        assert!(!cache.is_stale(&source));
        assert_eq!(cache.load(&second)?.render_default().expect("render"), "two");

        Ok(())
    }

    // Saves a new version of the template right after the first read.
    #[derive(Default)]
    struct EditedWhileCompiling {
        edited: AtomicBool,
    }

    impl Filesystem for EditedWhileCompiling {
        fn exists(&self, path: &Path) -> bool {
            LocalFilesystem.exists(path)
        }

        fn modified(&self, path: &Path) -> std::io::Result<SystemTime> {
            LocalFilesystem.modified(path)
        }

        fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
            let text = LocalFilesystem.read_to_string(path)?;

            if !self.edited.swap(true, Ordering::Relaxed) {
                let saved = LocalFilesystem.modified(path)? + Duration::from_secs(2);
                write(path, "two")?;
                File::options().write(true).open(path)?.set_modified(saved)?;
            }

            Ok(text)
        }

        fn write_atomic(&self, path: &Path, contents: &str, modified: SystemTime) -> std::io::Result<()> {
            LocalFilesystem.write_atomic(path, contents, modified)
        }

        fn list_directory(&self, path: &Path) -> std::io::Result<Vec<PathBuf>> {
            LocalFilesystem.list_directory(path)
        }

        fn remove(&self, path: &Path) -> std::io::Result<()> {
            LocalFilesystem.remove(path)
        }

        fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
            LocalFilesystem.create_dir_all(path)
        }
    }

    #[test]
    fn test_edit_while_compiling() -> Result<(), Error> {
        let dir = TempDir::new("vellum-cache").expect("tempdir");
        let cache = CompiledCache::new(
            dir.path().join("cache"),
            Arc::new(EditedWhileCompiling::default()),
        );
        let source = source(dir.path(), "page", "one");

        let artifact = cache.ensure_compiled(&source, compile)?;
        assert_eq!(artifact.compiled_at, source.modified);
        assert_eq!(cache.load(&artifact)?.render_default().expect("render"), "one");

        // The edit is newer than what was compiled.
        let source = resolved(&source.path, "page");
        assert!(cache.is_stale(&source));
        assert_eq!(
            cache.template(&source, compile)?.render_default().expect("render"),
            "two"
        );

        Ok(())
    }

    #[test]
    fn test_load_error_names_template() -> Result<(), Error> {
        let dir = TempDir::new("vellum-cache").expect("tempdir");
        let cache = CompiledCache::new(dir.path().join("cache"), Arc::new(LocalFilesystem));
        let source = source(dir.path(), "users.index", "hello");

        let artifact = cache.ensure_compiled(&source, compile)?;
        write(&artifact.compiled, "[]").expect("write");

        match cache.load(&artifact) {
            Err(Error::EngineExecution { name, path, .. }) => {
                assert_eq!(name, "users.index");
                assert_eq!(path, artifact.compiled);
            }
            result => panic!("expected an execution error, got {:?}", result.map(|_| ())),
        }

        Ok(())
    }

    #[test]
    fn test_compile_error() {
        let dir = TempDir::new("vellum-cache").expect("tempdir");
        let cache = CompiledCache::new(dir.path().join("cache"), Arc::new(LocalFilesystem));
        let source = source(dir.path(), "broken", "<ul>\n<% for item in items %>\n<li>{{ item }}</li>\n");

        match cache.ensure_compiled(&source, compile) {
            Err(Error::Compile {
                name,
                path,
                line,
                excerpt,
                ..
            }) => {
                assert_eq!(name, "broken");
                assert_eq!(path, source.path);
                assert_eq!(line, 2);
                assert!(excerpt.unwrap_or_default().contains("<% for item in items %>"));
            }
            result => panic!("expected a compile error, got {:?}", result),
        }

        // Nothing is written for templates that don't compile.
        assert!(cache.is_stale(&source));
    }

    #[test]
    fn test_cache_write_error() -> Result<(), Error> {
        let dir = TempDir::new("vellum-cache").expect("tempdir");

        // The cache "directory" is a file.
        let blocked = dir.path().join("blocked");
        write(&blocked, "").expect("write");

        let cache = CompiledCache::new(&blocked, Arc::new(LocalFilesystem));
        let source = source(dir.path(), "hello", "hello");

        assert!(matches!(
            cache.ensure_compiled(&source, compile),
            Err(Error::CacheWrite { .. })
        ));

        Ok(())
    }

    #[test]
    fn test_corrupt_artifact() -> Result<(), Error> {
        let dir = TempDir::new("vellum-cache").expect("tempdir");
        let cache = CompiledCache::new(dir.path().join("cache"), Arc::new(LocalFilesystem));
        let source = source(dir.path(), "hello", "hello");

        let artifact = cache.ensure_compiled(&source, compile)?;
        write(&artifact.compiled, "{ not json").expect("write");

        // Still current by modification time, but can't be loaded.
        let template = cache.template(&source, compile)?;
        assert_eq!(template.render_default().expect("render"), "hello");

        Ok(())
    }

    #[test]
    fn test_clear() -> Result<(), Error> {
        let dir = TempDir::new("vellum-cache").expect("tempdir");
        let cache = CompiledCache::new(dir.path().join("cache"), Arc::new(LocalFilesystem));

        assert_eq!(cache.clear()?, 0);

        for name in ["one", "two"] {
            let source = source(dir.path(), name, name);
            cache.ensure_compiled(&source, compile)?;
        }

        write(cache.dir().join(".stale.json.1234.tmp"), "").expect("write");

        assert_eq!(cache.clear()?, 2);
        assert!(LocalFilesystem.list_directory(cache.dir()).expect("list").is_empty());

        Ok(())
    }
}
