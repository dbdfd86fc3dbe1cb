use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::exit;
use vellum::logging::Logger;
use vellum::{Config, Views};

mod logging;
mod precompile;
mod render;
mod watch;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(
        long,
        short,
        help = "Path to the configuration file",
        default_value = "vellum.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    subcommands: Subcommands,
}

#[derive(Subcommand, Debug)]
enum Subcommands {
    /// Render a template and print it.
    Render {
        /// Template name, e.g. "users.index" or "admin::dashboard".
        name: String,

        #[arg(long, help = "JSON file with the template variables")]
        context: Option<PathBuf>,

        #[arg(long = "set", help = "Set a variable, e.g. --set name=Al", value_parser = render::parse_pair)]
        set: Vec<(String, String)>,
    },

    /// Compile templates ahead of time. All templates are compiled if no names are given.
    Precompile { names: Vec<String> },

    /// Remove compiled templates.
    Clear,

    /// Compile templates as soon as they change.
    Watch,
}

#[tokio::main]
async fn main() {
    Logger::init();
    let args = Cli::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            logging::error(err);
            exit(1);
        }
    };

    config.log_info();

    let views = match Views::new(config) {
        Ok(views) => views,
        Err(err) => {
            logging::error(err);
            exit(1);
        }
    };

    let result = match args.subcommands {
        Subcommands::Render { name, context, set } => {
            render::render(&views, &name, context, set).await
        }
        Subcommands::Precompile { names } => precompile::precompile(&views, names),
        Subcommands::Clear => precompile::clear(&views),
        Subcommands::Watch => watch::watch(views).await,
    };

    if let Err(err) = result {
        logging::error(&err);

        if let Some(vellum::Error::Compile {
            excerpt: Some(excerpt),
            ..
        }) = err.downcast_ref::<vellum::Error>()
        {
            eprintln!("{}", excerpt);
        }

        exit(1);
    }
}
