use crate::logging::{compiled, removed, skipped};
use std::error::Error;
use vellum::Views;

pub fn precompile(views: &Views, names: Vec<String>) -> Result<(), Box<dyn Error>> {
    if names.is_empty() {
        let artifacts = views.precompile_all()?;

        for artifact in &artifacts {
            compiled(format!("\"{}\"", artifact.source.display()));
        }

        if artifacts.is_empty() {
            skipped("no templates to compile");
        }

        return Ok(());
    }

    for name in names {
        match views.precompile(&name)? {
            Some(artifact) => compiled(format!("\"{}\" ({})", name, artifact.source.display())),
            None => skipped(format!("\"{}\" doesn't need compiling", name)),
        }
    }

    Ok(())
}

pub fn clear(views: &Views) -> Result<(), Box<dyn Error>> {
    let count = views.clear()?;
    removed(format!("{} compiled templates", count));

    Ok(())
}
