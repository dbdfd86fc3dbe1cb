use std::error::Error;
use std::path::PathBuf;
use tokio::fs::read_to_string;
use vellum::view::Context;
use vellum::Views;

pub async fn render(
    views: &Views,
    name: &str,
    context: Option<PathBuf>,
    set: Vec<(String, String)>,
) -> Result<(), Box<dyn Error>> {
    let mut context = match context {
        Some(path) => {
            let json = read_to_string(&path).await.map_err(|source| vellum::Error::Io {
                path: path.clone(),
                source,
            })?;
            let json: serde_json::Value = serde_json::from_str(&json)?;
            Context::try_from(json)?
        }
        None => Context::new(),
    };

    for (key, value) in set {
        context.set(&key, value)?;
    }

    let output = views.render(name, &context)?;
    print!("{}", output);

    Ok(())
}

/// Parse `key=value`.
pub fn parse_pair(pair: &str) -> Result<(String, String), String> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got \"{}\"", pair)),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            parse_pair("name=Al=Bo"),
            Ok(("name".to_string(), "Al=Bo".to_string()))
        );
        assert_eq!(parse_pair("empty="), Ok(("empty".to_string(), "".to_string())));
        assert!(parse_pair("=value").is_err());
        assert!(parse_pair("novalue").is_err());
    }
}
