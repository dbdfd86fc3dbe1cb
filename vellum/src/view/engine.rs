//! Template engines.
//!
//! Every template extension is handled by an engine: compiled templates go through
//! the compiled template cache, raw templates are sent as they are.
use super::{template, CompiledArtifact, CompiledCache, Context, Partials, ResolvedSource, Template};
use crate::config::EngineBinding;
use crate::filesystem::Filesystem;
use crate::Error;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// How files with an extension are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// The file is markup that doesn't need rendering.
    Raw,
    /// The file is a template, compiled before it's executed.
    Compiled,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            EngineKind::Raw => write!(f, "raw"),
            EngineKind::Compiled => write!(f, "compiled"),
        }
    }
}

/// Engine for one template.
pub enum Engine<'a> {
    Raw(&'a dyn Filesystem),
    Compiled(&'a CompiledCache),
}

/// A template ready to be executed.
pub enum Prepared {
    Raw(String),
    Compiled(Arc<Template>),
}

impl Engine<'_> {
    pub fn kind(&self) -> EngineKind {
        match self {
            Engine::Raw(_) => EngineKind::Raw,
            Engine::Compiled(_) => EngineKind::Compiled,
        }
    }

    /// Get the template ready for execution, compiling it if needed.
    pub fn prepare(&self, source: &ResolvedSource) -> Result<Prepared, Error> {
        match self {
            Engine::Raw(fs) => fs
                .read_to_string(&source.path)
                .map(Prepared::Raw)
                .map_err(|err| Error::io(&source.path, err)),

            Engine::Compiled(cache) => cache.template(source, template::compile).map(Prepared::Compiled),
        }
    }

    pub fn render(
        &self,
        source: &ResolvedSource,
        context: &Context,
        partials: &dyn Partials,
    ) -> Result<String, Error> {
        self.prepare(source)?.execute(source, context, partials)
    }
}

impl Prepared {
    pub fn execute(
        &self,
        source: &ResolvedSource,
        context: &Context,
        partials: &dyn Partials,
    ) -> Result<String, Error> {
        match self {
            // Raw files are in their final form already.
            Prepared::Raw(text) => Ok(text.clone()),
            Prepared::Compiled(template) => template
                .render_with(context, partials)
                .map_err(|err| Error::execution(source, err)),
        }
    }
}

/// Engines by extension.
pub struct Engines {
    bindings: Vec<EngineBinding>,
    fs: Arc<dyn Filesystem>,
    cache: CompiledCache,
}

impl Engines {
    pub fn new(bindings: &[EngineBinding], cache_dir: &Path, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            bindings: bindings.to_vec(),
            cache: CompiledCache::new(cache_dir, fs.clone()),
            fs,
        }
    }

    /// Engine for the template, picked by its extension.
    pub fn engine(&self, source: &ResolvedSource) -> Result<Engine<'_>, Error> {
        let binding = self
            .bindings
            .iter()
            .find(|binding| binding.extension == source.extension)
            .ok_or_else(|| Error::UnknownEngine {
                name: source.name.to_string(),
                extension: source.extension.clone(),
            })?;

        Ok(match binding.kind {
            EngineKind::Raw => Engine::Raw(self.fs.as_ref()),
            EngineKind::Compiled => Engine::Compiled(&self.cache),
        })
    }

    /// Render the template with the engine registered for its extension.
    pub fn render(
        &self,
        source: &ResolvedSource,
        context: &Context,
        partials: &dyn Partials,
    ) -> Result<String, Error> {
        self.engine(source)?.render(source, context, partials)
    }

    /// Compile the template, if its engine compiles templates.
    pub fn precompile(&self, source: &ResolvedSource) -> Result<Option<CompiledArtifact>, Error> {
        match self.engine(source)? {
            Engine::Raw(_) => Ok(None),
            Engine::Compiled(cache) => cache.refresh(source, template::compile).map(Some),
        }
    }

    pub fn cache(&self) -> &CompiledCache {
        &self.cache
    }

    pub(crate) fn cache_mut(&mut self) -> &mut CompiledCache {
        &mut self.cache
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::filesystem::LocalFilesystem;
    use crate::view::{NoPartials, TemplateName};
    use std::fs::write;
    use tempdir::TempDir;

    fn engines(dir: &Path) -> Engines {
        Engines::new(
            &[
                EngineBinding::new("tmpl", EngineKind::Compiled),
                EngineBinding::new("html", EngineKind::Raw),
            ],
            &dir.join("cache"),
            Arc::new(LocalFilesystem),
        )
    }

    fn source(dir: &Path, file: &str, contents: &str) -> ResolvedSource {
        let path = dir.join(file);
        write(&path, contents).expect("write");

        let (name, extension) = file.split_once('.').expect("extension");

        ResolvedSource {
            name: TemplateName::new(name).expect("name"),
            modified: LocalFilesystem.modified(&path).expect("modified"),
            path,
            extension: extension.into(),
        }
    }

    #[test]
    fn test_raw_engine() -> Result<(), Error> {
        let dir = TempDir::new("vellum-engine").expect("tempdir");
        let engines = engines(dir.path());
        let source = source(dir.path(), "page.html", "<p>{{ not a variable }}</p>");

        let mut context = Context::new();
        context.set("name", "ignored").expect("set");

        assert_eq!(engines.engine(&source)?.kind(), EngineKind::Raw);
        assert_eq!(
            engines.render(&source, &context, &NoPartials)?,
            "<p>{{ not a variable }}</p>"
        );
        assert_eq!(engines.precompile(&source)?, None);

        Ok(())
    }

    #[test]
    fn test_compiled_engine() -> Result<(), Error> {
        let dir = TempDir::new("vellum-engine").expect("tempdir");
        let engines = engines(dir.path());
        let source = source(dir.path(), "page.tmpl", "<p>{{ title }}</p>");

        let mut context = Context::new();
        context.set("title", "Q&A").expect("set");

        assert_eq!(engines.engine(&source)?.kind(), EngineKind::Compiled);
        assert_eq!(engines.render(&source, &context, &NoPartials)?, "<p>Q&amp;A</p>");

        let artifact = engines.precompile(&source)?.expect("compiled");
        assert!(artifact.recompiled);
        assert_eq!(artifact.compiled, engines.cache().compiled_path(&source.path));

        Ok(())
    }

    #[test]
    fn test_execution_error() -> Result<(), Error> {
        let dir = TempDir::new("vellum-engine").expect("tempdir");
        let engines = engines(dir.path());
        let source = source(dir.path(), "page.tmpl", "{{ 1 / zero }}");

        let mut context = Context::new();
        context.set("zero", 0).expect("set");

        match engines.render(&source, &context, &NoPartials) {
            Err(Error::EngineExecution { name, path, source: err }) => {
                assert_eq!(name, "page");
                assert_eq!(path, source.path);
                assert!(matches!(err, template::Error::Runtime(_)));
            }
            result => panic!("expected an execution error, got {:?}", result),
        }

        assert!(matches!(
            engines.render(&source, &Context::new(), &NoPartials),
            Err(Error::EngineExecution {
                source: template::Error::UndefinedVariable(_),
                ..
            })
        ));

        Ok(())
    }

    #[test]
    fn test_unknown_engine() {
        let dir = TempDir::new("vellum-engine").expect("tempdir");
        let engines = engines(dir.path());
        let source = source(dir.path(), "notes.txt", "text");

        assert!(matches!(
            engines.render(&source, &Context::new(), &NoPartials),
            Err(Error::UnknownEngine { extension, .. }) if extension == "txt"
        ));
        assert!(matches!(
            engines.precompile(&source),
            Err(Error::UnknownEngine { .. })
        ));
    }
}
