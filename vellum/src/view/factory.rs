//! Rendering templates by name.
use super::{
    template, CompiledArtifact, Context, Engines, Finder, Partials, TemplateName,
};
use crate::events::{Event, Listener, NoopListener, Stage};
use crate::filesystem::{Filesystem, LocalFilesystem};
use crate::{Config, Error};

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// How deep includes can nest. Includes that go deeper are most likely
/// a template including itself.
pub const MAX_INCLUDE_DEPTH: usize = 64;

/// Finds, compiles and renders templates.
///
/// ```rust,no_run
/// # use vellum::prelude::*;
/// # fn main() -> Result<(), vellum::Error> {
/// let views = Views::new(Config::default().path("views").cache("storage/views"))?;
/// let html = views.render("users.index", &Context::new())?;
/// # Ok(())
/// # }
/// ```
pub struct Views {
    finder: Finder,
    engines: Engines,
    listener: Arc<dyn Listener>,
}

impl Views {
    /// Templates on the local disk.
    pub fn new(config: Config) -> Result<Self, Error> {
        Self::with_filesystem(config, Arc::new(LocalFilesystem))
    }

    pub fn with_filesystem(config: Config, fs: Arc<dyn Filesystem>) -> Result<Self, Error> {
        config.validate()?;
        let cache = config.cache_path()?;

        debug!(
            "views: {} paths, {} namespaces, cache in \"{}\"",
            config.paths.len(),
            config.namespaces.len(),
            cache.display()
        );

        Ok(Self {
            finder: Finder::new(&config, fs.clone()),
            engines: Engines::new(&config.engines, cache, fs),
            listener: Arc::new(NoopListener),
        })
    }

    /// Send render events to the listener.
    pub fn listener(mut self, listener: impl Listener + 'static) -> Self {
        let listener: Arc<dyn Listener> = Arc::new(listener);
        self.engines.cache_mut().set_listener(listener.clone());
        self.listener = listener;
        self
    }

    /// Render the template.
    pub fn render(&self, name: &str, context: &Context) -> Result<String, Error> {
        self.render_at(name, context, 0)
    }

    /// Compile the template without rendering it, even if its compiled form is current.
    /// Returns `None` for templates that aren't compiled.
    pub fn precompile(&self, name: &str) -> Result<Option<CompiledArtifact>, Error> {
        let source = self.finder.resolve(&TemplateName::new(name)?)?;
        self.engines.precompile(&source)
    }

    /// Compile every template.
    pub fn precompile_all(&self) -> Result<Vec<CompiledArtifact>, Error> {
        let mut artifacts = vec![];

        for source in self.finder.sources()? {
            if let Some(artifact) = self.engines.precompile(&source)? {
                artifacts.push(artifact);
            }
        }

        Ok(artifacts)
    }

    /// Does the template exist?
    pub fn exists(&self, name: &str) -> bool {
        TemplateName::new(name)
            .and_then(|name| self.finder.resolve(&name))
            .is_ok()
    }

    /// Remove all compiled templates.
    pub fn clear(&self) -> Result<usize, Error> {
        self.engines.cache().clear()
    }

    pub fn finder(&self) -> &Finder {
        &self.finder
    }

    pub fn engines(&self) -> &Engines {
        &self.engines
    }

    fn render_at(&self, name: &str, context: &Context, depth: usize) -> Result<String, Error> {
        let started = Instant::now();

        self.listener.on_event(&Event::RenderStart { name });

        match self.run(name, context, depth) {
            Ok(output) => {
                self.listener.on_event(&Event::RenderEnd {
                    name,
                    elapsed: started.elapsed(),
                });

                Ok(output)
            }

            Err((stage, err)) => {
                // Partials report their own failures.
                if depth == 0 {
                    error!("{} failed during {}: {}", name, stage, err);
                }

                self.listener.on_event(&Event::Error {
                    name,
                    stage,
                    error: &err,
                });

                Err(err)
            }
        }
    }

    // Resolving -> EngineSelecting -> CacheChecking -> Compiling? -> Executing
    fn run(&self, name: &str, context: &Context, depth: usize) -> Result<String, (Stage, Error)> {
        let source = TemplateName::new(name)
            .and_then(|name| self.finder.resolve(&name))
            .map_err(|err| (Stage::Resolving, err))?;

        let engine = self
            .engines
            .engine(&source)
            .map_err(|err| (Stage::EngineSelecting, err))?;

        let prepared = engine.prepare(&source).map_err(|err| {
            let stage = match err {
                Error::Compile { .. } | Error::CacheWrite { .. } => Stage::Compiling,
                _ => Stage::CacheChecking,
            };

            (stage, err)
        })?;

        let partials = Includes {
            views: self,
            depth,
        };

        prepared
            .execute(&source, context, &partials)
            .map_err(|err| (Stage::Executing, err))
    }
}

// Renders includes for a template, one level deeper.
struct Includes<'a> {
    views: &'a Views,
    depth: usize,
}

impl Partials for Includes<'_> {
    fn render_partial(&self, name: &str, context: &Context) -> Result<String, template::Error> {
        if self.depth + 1 >= MAX_INCLUDE_DEPTH {
            return Err(template::Error::Runtime(format!(
                "including \"{}\" goes deeper than {} includes, do templates include each other?",
                name, MAX_INCLUDE_DEPTH
            )));
        }

        self.views
            .render_at(name, context, self.depth + 1)
            .map_err(|err| template::Error::Include(Box::new(err)))
    }
}

impl std::fmt::Debug for Views {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Views")
            .field("roots", &self.finder.roots())
            .field("cache", &self.engines.cache().dir())
            .finish()
    }
}
