//! The template language.
//!
//! Templates are compiled into a [`Program`] once and executed as many times
//! as needed. The compiled program can be written out as a versioned JSON
//! artifact and loaded back without parsing the source again.
//!
//! # Example
//!
//! ```
//! # use vellum::view::template::*;
//! let template = Template::from_str("<h1>{{ title }}</h1>").unwrap();
//! let mut context = Context::new();
//!
//! context.set("title", "Tom & Jerry").unwrap();
//!
//! let rendered = template.render(&context).unwrap();
//!
//! assert_eq!(rendered, "<h1>Tom &amp; Jerry</h1>");
//! ```
pub mod context;
pub mod error;
pub mod language;
pub mod lexer;

pub use context::Context;
pub use error::Error;
pub use language::{Evaluate, Program};
pub use lexer::{Lexer, ToTemplateValue, Token, TokenWithContext, Tokenize, Value};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Version of the compiled template format. Artifacts written with
/// a different version are compiled again.
pub const ARTIFACT_VERSION: u32 = 1;

/// Renders templates referenced by `<% include "name" %>`.
pub trait Partials {
    fn render_partial(&self, name: &str, context: &Context) -> Result<String, Error>;
}

/// Used when templates are rendered on their own, without a view registry.
/// Any include fails.
pub struct NoPartials;

impl Partials for NoPartials {
    fn render_partial(&self, name: &str, _context: &Context) -> Result<String, Error> {
        Err(Error::Runtime(format!(
            "cannot include \"{}\", partials are not available here",
            name
        )))
    }
}

#[derive(Serialize)]
struct ArtifactRef<'a> {
    version: u32,
    program: &'a Program,
}

#[derive(Deserialize)]
struct ArtifactHeader {
    version: u32,
}

#[derive(Deserialize)]
struct Artifact {
    program: Program,
}

/// Compiled template.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    program: Program,
    path: PathBuf,
}

impl Template {
    /// Compile template source. The path is only used for identification.
    pub fn compile(source: &str, path: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Template {
            program: Program::from_str(source)?,
            path: path.as_ref().to_owned(),
        })
    }

    pub fn from_str(template: &str) -> Result<Self, Error> {
        Self::compile(template, "/dev/null")
    }

    /// Load a template from its compiled form, see [`Template::to_compiled`].
    pub fn from_compiled(compiled: &str, path: impl AsRef<Path>) -> Result<Self, Error> {
        let header: ArtifactHeader = serde_json::from_str(compiled)?;

        if header.version != ARTIFACT_VERSION {
            return Err(Error::ArtifactVersion(header.version));
        }

        let artifact: Artifact = serde_json::from_str(compiled)?;

        Ok(Template {
            program: artifact.program,
            path: path.as_ref().to_owned(),
        })
    }

    /// Serialize the compiled program.
    pub fn to_compiled(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&ArtifactRef {
            version: ARTIFACT_VERSION,
            program: &self.program,
        })?)
    }

    /// Render the template. Includes are not available.
    pub fn render(&self, context: &Context) -> Result<String, Error> {
        self.program.evaluate(context, &NoPartials)
    }

    /// Render the template, using `partials` to render includes.
    pub fn render_with(&self, context: &Context, partials: &dyn Partials) -> Result<String, Error> {
        self.program.evaluate(context, partials)
    }

    pub fn render_default(&self) -> Result<String, Error> {
        self.render(&Context::default())
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Compile template source straight into its serialized form.
///
/// The result is checked to load back, so a template nested deeper than the
/// artifact reader allows fails here instead of on every render.
pub fn compile(source: &str) -> Result<String, Error> {
    let compiled = Template::from_str(source)?.to_compiled()?;

    match Template::from_compiled(&compiled, "/dev/null") {
        Ok(_) => Ok(compiled),
        Err(Error::Artifact(err)) => Err(Error::TooDeep(err)),
        Err(err) => Err(err),
    }
}
