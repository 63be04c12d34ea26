//! CLI entry point for mdsite

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mdsite::content::{ContentLoader, FeedBuilder, MarkdownRenderer};
use mdsite::ogimage::OgImageGenerator;
use mdsite::templates::TemplateSet;
use mdsite::Site;

#[derive(Parser)]
#[command(name = "mdsite")]
#[command(version)]
#[command(about = "A personal static site generator for Markdown collections", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Config file, relative to the base directory
    #[arg(long, global = true, default_value = mdsite::CONFIG_FILE)]
    config: PathBuf,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every content file into the output directory
    #[command(alias = "b")]
    Build,

    /// Serve pages on demand and scaffold new collections and files
    #[command(alias = "d")]
    Dev {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value = "8080")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,
    },

    /// Print the feed in order
    Feed,

    /// Generate OG images for every published item
    OgImage,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "mdsite=debug,info"
    } else {
        "mdsite=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let site = Site::load(&base_dir, &base_dir.join(&cli.config))?;

    match cli.command {
        Commands::Build => {
            tracing::info!("Building {:?} into {:?}", site.content_dir, site.output_dir);
            let report = site.build()?;

            if !report.is_success() {
                for (path, error) in &report.failed {
                    eprintln!("Failed: {} ({})", path.display(), error);
                }
                std::process::exit(1);
            }
            println!("Built {} files", report.rendered.len());
        }

        Commands::Dev { port, ip } => {
            tracing::info!("Starting dev server at http://{}:{}", ip, port);
            mdsite::server::start(&site, &ip, port).await?;
        }

        Commands::Feed => {
            let loader = ContentLoader::new(&site, Arc::new(MarkdownRenderer::new()));
            let feed = FeedBuilder::new(&loader).build()?;

            for item in &feed {
                let date = if item.date.is_empty() { "-" } else { item.date.as_str() };
                println!("{:<12} {:<12} {}", date, item.collection, item.title);
            }
            println!("{} items", feed.len());
        }

        Commands::OgImage => {
            let markdown = Arc::new(MarkdownRenderer::new());
            let templates = TemplateSet::load(&site.template_dir, markdown.clone())?;
            let loader = ContentLoader::new(&site, markdown);

            let count = OgImageGenerator::new(&site).generate_all(&loader, &templates)?;
            println!("{} OG images ready", count);
        }
    }

    Ok(())
}
