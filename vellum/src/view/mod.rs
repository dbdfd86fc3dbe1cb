//! Templates and views.
//!
//! Templates are found by name under the configured directories ([`Finder`]),
//! rendered by the engine registered for their extension ([`Engines`]),
//! and, if they are compiled, kept compiled on disk ([`CompiledCache`]).
//! [`Views`] puts it all together.
pub mod cache;
pub mod engine;
pub mod factory;
pub mod finder;
pub mod name;
pub mod template;
pub mod watch;

pub use cache::{CompiledArtifact, CompiledCache};
pub use engine::{Engine, EngineKind, Engines, Prepared};
pub use factory::{Views, MAX_INCLUDE_DEPTH};
pub use finder::{Finder, ResolvedSource};
pub use name::TemplateName;
pub use template::{Context, NoPartials, Partials, Template};
pub use watch::watch;

pub use template::{ToTemplateValue, Value};
