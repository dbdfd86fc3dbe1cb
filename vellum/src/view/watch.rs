//! Compile templates as soon as they change on disk.
use super::Views;
use crate::Error;

use notify::{
    event::{AccessKind, AccessMode},
    Event, EventKind, RecursiveMode, Watcher,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Watch the template directories and compile templates when they are written.
/// Runs until the task is aborted or the watcher fails.
pub fn watch(views: Arc<Views>) -> JoinHandle<Result<(), Error>> {
    tokio::task::spawn(async move {
        let (tx, mut rx) = unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;

        for root in views.finder().roots() {
            if root.is_dir() {
                watcher.watch(root, RecursiveMode::Recursive)?;
                info!("watching \"{}\"", root.display());
            } else {
                warn!("\"{}\" doesn't exist, not watching it", root.display());
            }
        }

        while let Some(event) = rx.recv().await {
            match event {
                Ok(event) if changed(&event.kind) => {
                    for path in &event.paths {
                        recompile(&views, path);
                    }
                }
                Ok(_) => (),
                Err(err) => warn!("watcher: {}", err),
            }
        }

        Ok::<(), Error>(())
    })
}

fn changed(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(_)
            | EventKind::Access(AccessKind::Close(AccessMode::Write))
    )
}

// Returns true if the template was compiled.
fn recompile(views: &Views, path: &Path) -> bool {
    let name = match views.finder().name_for(path) {
        Some(name) => name,
        None => return false,
    };

    match views.precompile(&name.to_string()) {
        Ok(Some(_)) => {
            info!("recompiled \"{}\"", name);
            true
        }
        Ok(None) => false,
        // Removed since.
        Err(Error::NotFound { .. }) => false,
        Err(err) => {
            error!("{}", err);
            false
        }
    }
}
