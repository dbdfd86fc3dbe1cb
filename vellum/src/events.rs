//! Render lifecycle events.
//!
//! Attach a [`Listener`] to [`crate::Views`] to observe renders and compiles,
//! e.g. for metrics. Nothing is observed by default.
use crate::Error;
use std::path::Path;
use std::time::Duration;

/// Where in the render a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    EngineSelecting,
    CacheChecking,
    Compiling,
    Executing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let stage = match self {
            Stage::Resolving => "resolving",
            Stage::EngineSelecting => "engine selection",
            Stage::CacheChecking => "cache check",
            Stage::Compiling => "compilation",
            Stage::Executing => "execution",
        };

        write!(f, "{}", stage)
    }
}

#[derive(Debug)]
pub enum Event<'a> {
    RenderStart {
        name: &'a str,
    },
    Compiling {
        name: &'a str,
        path: &'a Path,
    },
    Compiled {
        name: &'a str,
        path: &'a Path,
        artifact: &'a Path,
    },
    RenderEnd {
        name: &'a str,
        elapsed: Duration,
    },
    Error {
        name: &'a str,
        stage: Stage,
        error: &'a Error,
    },
}

pub trait Listener: Send + Sync {
    fn on_event(&self, event: &Event);
}

/// Ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl Listener for NoopListener {
    fn on_event(&self, _event: &Event) {}
}

impl<F> Listener for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn on_event(&self, event: &Event) {
        self(event)
    }
}
