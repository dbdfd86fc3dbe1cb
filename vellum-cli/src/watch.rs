use crate::logging::watching;
use std::error::Error;
use std::sync::Arc;
use tokio::signal::ctrl_c;
use vellum::Views;

pub async fn watch(views: Views) -> Result<(), Box<dyn Error>> {
    for root in views.finder().roots() {
        watching(format!("\"{}\"", root.display()));
    }

    let watcher = vellum::view::watch(Arc::new(views));

    tokio::select! {
        result = watcher => result??,
        _ = ctrl_c() => (),
    }

    Ok(())
}
