//! Chapterwatch CLI - manga metadata lookup across scanlation sites.

use anyhow::{Context, Result};
use chapterwatch::config::Config;
use chapterwatch::console::Console;
use chapterwatch::resolver::{AltSource, Resolver};
use chapterwatch::sites::{SiteRegistry, SiteType, Title};
use chapterwatch::transport::ReqwestTransport;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Manga metadata lookup across scanlation sites.
#[derive(Parser, Debug)]
#[command(name = "chapterwatch")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file to use instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a title and its latest chapter
    Resolve {
        /// Title URL
        url: String,

        /// Site to read with, instead of the one matching the URL
        #[arg(long)]
        site: Option<SiteType>,

        /// Alternate source as `<site>=<url>`, tried in order
        #[arg(long = "alt", value_parser = parse_alt)]
        alts: Vec<AltSource>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search one site, or every site
    Search {
        query: String,

        /// Only search this site
        #[arg(long)]
        site: Option<SiteType>,

        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List supported sites
    Sites,

    /// Probe every site for login state and reachability
    Check,
}

/// Parses an `<site>=<url>` alternate source.
fn parse_alt(value: &str) -> Result<AltSource, String> {
    let (site, url) = value
        .split_once('=')
        .ok_or_else(|| format!("expected <site>=<url>, got '{}'", value))?;
    let site = site.parse::<SiteType>().map_err(|e| e.to_string())?;
    Ok((site, url.to_string()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    let console = Console::new();

    match run(args, &console).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            console.error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, console: &Console) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("chapterwatch=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let transport = ReqwestTransport::new(Duration::from_secs(config.scraping.timeout_sec))
        .context("Failed to create HTTP client")?;
    let registry = SiteRegistry::new(&config.scraping, Arc::new(transport));
    let resolver = Resolver::new(&config, registry);

    match args.command {
        Command::Resolve {
            url,
            site,
            alts,
            json,
        } => {
            let title = match site {
                Some(site) => resolver.resolve_by_site(&url, site, &alts).await,
                None => resolver.resolve(&url, &alts).await,
            }
            .with_context(|| format!("Failed to resolve {}", url))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&title)?);
            } else {
                console.title(&title);
            }
        }
        Command::Search { query, site, json } => {
            let titles = resolver
                .search(&query, site)
                .await
                .with_context(|| format!("Search for '{}' failed", query))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&titles)?);
            } else {
                print_results(console, &query, &titles);
            }
        }
        Command::Sites => {
            console.section("Primary sites");
            for site in resolver.sites().primary() {
                print_site(console, site.site_type());
            }
            console.section("Linking sites");
            for site in resolver.sites().linking() {
                print_site(console, site.site_type());
            }
        }
        Command::Check => {
            console.info(&format!(
                "Checking {} sites...",
                console.count(resolver.sites().primary().len())
            ));
            console.section("Site health");
            for health in resolver.check_sites().await {
                console.health(&health);
            }
        }
    }

    Ok(())
}

fn print_results(console: &Console, query: &str, titles: &[Title]) {
    if titles.is_empty() {
        console.warning(&format!("No results for '{}'", query));
        return;
    }

    console.success(&format!("{} results for '{}'", console.count(titles.len()), query));
    for title in titles {
        console.title(title);
    }
}

fn print_site(console: &Console, site: SiteType) {
    println!("{:<24} {}", site.name(), console.muted(&site.base_url()));
}
