use clap::{Parser, Subcommand};
use fx_gal::config;
use fx_gal::error::GalleryError;
use fx_gal::gallery::Gallery;
use fx_gal::imaging::Effect;
use fx_gal::output;
use fx_gal::upload::UploadRequest;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, warn};

#[derive(Parser)]
#[command(name = "fx-gal")]
#[command(about = "Image gallery with cached effects over local and Flickr photos")]
#[command(long_about = "\
Image gallery with cached effects over local and Flickr photos

Local images live under the static directory with their titles and tags in a
JSON metadata store. Any id not found locally is looked up on Flickr. Effects
are rendered on first request and cached on disk:

  static/
  ├── info.json                         # id → {title, tags}
  └── images/
      ├── sunset-3f9a0c12b4de.jpg       # uploaded original
      └── cache/
          └── sunset-3f9a0c12b4de_sepia.jpg

Effects: none, grayscale, negative, sepia, thumbnail

Run 'fx-gal gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml; relative paths in it resolve from here
    #[arg(long, default_value = ".", global = true)]
    config: PathBuf,

    /// Flickr API key (overrides remote.api_key)
    #[arg(long, env = "FLICKR_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search local titles and tags, and Flickr
    Search {
        /// Keywords
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Show one image, rendering the effect if needed
    Show {
        id: String,
        /// none, grayscale, negative, sepia or thumbnail
        #[arg(long, default_value = "none")]
        effect: String,
    },
    /// Add a local image
    Upload {
        file: PathBuf,
        #[arg(long)]
        title: String,
        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Pick random local images
    Featured {
        #[arg(long, default_value_t = 3)]
        count: usize,
    },
    /// Pre-render effects in parallel (all local images when no ids are given)
    Warm {
        /// Effect to render; repeatable (default: every effect)
        #[arg(long = "effect")]
        effects: Vec<String>,
        ids: Vec<String>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Respect RUST_LOG if set; logs go to stderr so stdout stays clean
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "fx_gal=debug".to_string()
        } else {
            "fx_gal=info".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<GalleryError>() {
                Some(gallery_error) => {
                    error!(error = %gallery_error, "request failed");
                    eprintln!("error: {}", gallery_error.user_message());
                }
                None => eprintln!("error: {}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut site_config = config::load_config(&cli.config)?;
    if let Some(key) = cli.api_key {
        site_config.remote.api_key = key;
    }
    let gallery = Gallery::from_config(&site_config, &cli.config)?;

    match cli.command {
        Command::Search { query } => {
            let results = gallery.search(&query.join(" "))?;
            output::print_search_output(&results);
        }
        Command::Show { id, effect } => {
            let view = gallery.detail(&id, parse_effect(&effect))?;
            output::print_detail_output(&view);
        }
        Command::Upload { file, title, tags } => {
            let data = std::fs::read(&file)?;
            let uploaded = gallery.upload(UploadRequest {
                data: &data,
                title: &title,
                tags: &tags,
            })?;
            output::print_upload_output(&uploaded);
        }
        Command::Featured { count } => {
            let featured = gallery.featured(count, &mut rand::thread_rng())?;
            output::print_featured_output(&featured);
        }
        Command::Warm { effects, ids } => {
            let effects: Vec<Effect> = if effects.is_empty() {
                Effect::TRANSFORMS.to_vec()
            } else {
                effects.iter().map(|e| parse_effect(e)).collect()
            };
            init_thread_pool(&site_config.processing);
            let report = gallery.warm(&ids, &effects)?;
            output::print_warm_output(&report);
            if report.failures() > 0 {
                return Err(format!("{} warm-up job(s) failed", report.failures()).into());
            }
        }
        Command::GenConfig => unreachable!("handled above"),
    }

    Ok(())
}

/// Unknown names fall back to no effect, with a warning.
fn parse_effect(name: &str) -> Effect {
    let effect = Effect::parse(name);
    if effect.is_none() && !name.trim().eq_ignore_ascii_case("none") {
        warn!(effect = name, "unknown effect, showing original");
    }
    effect
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
