//! A collection of types which when imported make working with Vellum easy.
//!
//! ```
//! use vellum::prelude::*;
//! ```
pub use crate::config::Config;
pub use crate::events::{Event, Listener, Stage};
pub use crate::logging::Logger;
pub use crate::view::{Context, Template, TemplateName, ToTemplateValue, Value, Views};
pub use crate::Error;

pub use time::OffsetDateTime;
