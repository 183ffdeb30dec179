mod cli;
mod commands;
mod config;
mod debounce;
mod editor;
mod error;
mod input;
mod mcp;
mod merge;
mod page_chooser;
mod page_range;
mod pdf;
mod plan;
mod session;
mod store;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use commands::AppContext;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries command output and the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<config::AppConfig> {
    let mut loader = config::Loader::new().with_optional_file(config::LOCAL_CONFIG_FILE);
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    if let Some(library) = &cli.library {
        loader = loader.set_override("library.root", library.display().to_string())?;
    }
    loader.build().context("Failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Commands that don't touch the library
    match &cli.command {
        Commands::Info { path } => return commands::info::run(path),
        Commands::Decode { text } => return commands::pages::run_decode(text),
        Commands::Encode { pages } => return commands::pages::run_encode(pages),
        _ => {}
    }

    let ctx = AppContext::open(load_config(&cli)?)?;

    match cli.command {
        Commands::Mcp => {
            mcp::run_server(ctx.store.clone(), ctx.scratch_dir().to_path_buf()).await?;
        }
        Commands::Import {
            files,
            title,
            archive,
        } => {
            commands::library::run_import(&ctx, &files, title, archive.as_deref())?;
        }
        Commands::List => {
            commands::library::run_list(&ctx)?;
        }
        Commands::Merge { sources, options } => {
            commands::merge::run(&ctx, &sources, &options)?;
        }
        Commands::Split {
            document,
            after,
            options,
        } => {
            commands::split::run(&ctx, document, &after, &options)?;
        }
        Commands::Execute { request, preview } => {
            commands::execute::run(&ctx, &request, preview)?;
        }
        Commands::Edit { documents } => {
            commands::edit::run(&ctx, &documents).await?;
        }
        Commands::Info { .. } | Commands::Decode { .. } | Commands::Encode { .. } => {}
    }

    Ok(())
}
