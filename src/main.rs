use clap::{Parser, Subcommand};
use sitewright::logging::{self, LogLevel};
use sitewright::server::{DevServer, RebuildState};
use sitewright::site::Site;
use sitewright::{config, output};
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

/// Flags for the development server.
#[derive(clap::Args, Clone)]
struct ServeArgs {
    /// Port to listen on (overrides [serve] port)
    #[arg(long)]
    port: Option<u16>,

    /// Serve the build directory without checking for changes
    #[arg(long)]
    no_rebuild: bool,
}

#[derive(Parser)]
#[command(name = "sitewright")]
#[command(about = "Static site builder with a rebuild-on-request dev server")]
#[command(long_about = "\
Static site builder with a rebuild-on-request dev server

Every file in the source directory is run through a transformer chosen by
its last suffix and written to the build directory. The suffix is dropped
from the output name; files with unregistered suffixes are copied as-is.

Source structure:

  site/
  ├── config.toml            # Site config (optional, never copied)
  ├── index.html.tmpl        # Tera template   → _build/index.html
  ├── about.html.md          # Markdown page   → _build/about.html
  ├── css/style.css          # Copied verbatim → _build/css/style.css
  ├── _templates/            # Private: partials, not copied
  ├── .git/                  # Hidden: ignored
  └── _build/                # Build output

`serve` builds once, then before answering each request checks whether any
top-level entry (or any entry of a watch directory) changed, and rebuilds
the whole site if so.

Run 'sitewright gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Source directory
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Log level (overrides SITEWRIGHT_LOG)
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site into the build directory
    Build,
    /// Build, then serve the build directory and rebuild on change
    Serve(ServeArgs),
    /// Validate config.toml and list the interpreters without building
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    println!("==> Shutting down");
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level);

    match cli.command {
        Command::Build => {
            let site = Site::load(&cli.source)?;
            println!("==> Building {}", cli.source.display());
            let report = site.build()?;
            output::print_build_output(&report, &site.build_dir());
        }
        Command::Serve(args) => {
            let site = Site::load(&cli.source)?;
            let port = args.port.unwrap_or(site.config().serve.port);
            let rebuild = site.config().serve.rebuild && !args.no_rebuild;

            println!("==> Building {}", cli.source.display());
            let (state, report) = RebuildState::new(site)?;
            let build_dir = state.site().build_dir();
            output::print_build_output(&report, &build_dir);

            let server = DevServer::bind(("127.0.0.1", port), state, rebuild)?;
            output::print_serving(server.local_addr()?, &build_dir, rebuild);
            server.serve(shutdown_signal()).await?;
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let site = Site::load(&cli.source)?;
            output::print_check_output(&site);
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
