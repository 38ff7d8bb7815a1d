//! concept-shift server and CLI entry point

use std::sync::Arc;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use concept_shift::{
    cleaner_by_name, create_rest_router, load_registry, parse_terms, Config, RestApiConfig,
    TrackQuery, TrackRequest, VocabularyMonitor,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// concept-shift: track how the vocabulary around a concept changes over time
#[derive(Parser, Debug)]
#[command(name = "concept-shift")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Where the embedding models come from.
#[derive(ClapArgs, Debug, Default)]
struct ModelArgs {
    /// Path to word2vec model files (glob patterns are supported)
    #[arg(short, long)]
    files: Option<String>,
    /// Model files are in the text format
    #[arg(short, long)]
    non_binary: bool,
    /// Name of the cleaning function applied to output terms
    #[arg(short = 'c', long)]
    cleaning: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default behavior)
    Serve {
        #[command(flatten)]
        models: ModelArgs,
        /// HTTP port. If not specified, uses config file value.
        #[arg(short, long)]
        port: Option<u16>,
        /// Enable JSON logging format
        #[arg(long)]
        json_logs: bool,
    },
    /// Track comma separated terms and print the result as JSON
    Track {
        /// Terms to track, e.g. "computer,machine"
        terms: String,
        #[command(flatten)]
        models: ModelArgs,
        /// Distinct terms kept per slice
        #[arg(long)]
        max_terms: Option<usize>,
        /// Neighbours requested per query term
        #[arg(long)]
        max_related_terms: Option<usize>,
        /// First slice
        #[arg(long)]
        start_key: Option<String>,
        /// Last slice
        #[arg(long)]
        end_key: Option<String>,
        /// Minimum similarity
        #[arg(long)]
        min_sim: Option<f32>,
        /// Cloud members carried into the next slice
        #[arg(long)]
        word_boost: Option<usize>,
        /// Walk the slices from latest to earliest
        #[arg(long)]
        backwards: bool,
        /// sum or max
        #[arg(long)]
        boost_method: Option<String>,
        /// adaptive, non-adaptive or continuous
        #[arg(short, long)]
        algorithm: Option<String>,
        /// uniform, linear or gaussian
        #[arg(long)]
        weigh_function: Option<String>,
        /// Parameter of the weighting function
        #[arg(long)]
        wf_param: Option<f32>,
        /// Slices per aggregation interval
        #[arg(long)]
        years_in_interval: Option<usize>,
        /// Terms kept per aggregation interval
        #[arg(long)]
        words_per_year: Option<usize>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// List the available slices
    Years {
        #[command(flatten)]
        models: ModelArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let is_serve = matches!(args.command, Some(Command::Serve { .. }) | None);

    if !is_serve {
        // Minimal logging for CLI commands
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = if let Some(path) = &args.config {
        Config::from_file(path)?
    } else if is_serve {
        // Logging is not set up yet; serve loads the config itself
        Config::default()
    } else {
        Config::load()?
    };

    match args.command {
        Some(Command::Serve {
            models,
            port,
            json_logs,
        }) => run_server(args.config.is_some(), config, models, port, json_logs).await,
        None => run_server(args.config.is_some(), config, ModelArgs::default(), None, false).await,
        Some(Command::Track {
            terms,
            models,
            max_terms,
            max_related_terms,
            start_key,
            end_key,
            min_sim,
            word_boost,
            backwards,
            boost_method,
            algorithm,
            weigh_function,
            wf_param,
            years_in_interval,
            words_per_year,
            pretty,
        }) => {
            let do_cleaning = models.cleaning.is_some() || config.cleaning.function.is_some();
            let query = TrackQuery {
                max_terms,
                max_related_terms,
                start_key,
                end_key,
                min_sim,
                word_boost,
                forwards: backwards.then_some(false),
                boost_method,
                algorithm,
                agg_weigh_function: weigh_function,
                agg_wf_param: wf_param,
                agg_years_in_interval: years_in_interval,
                agg_words_per_year: words_per_year,
                do_cleaning: Some(do_cleaning),
            };
            let request = query.into_request(&defaults(&config))?;
            let monitor = build_monitor(&config, &models)?;

            let response = monitor.track(&parse_terms(&terms), &request)?;
            let json = if pretty {
                serde_json::to_string_pretty(&response)?
            } else {
                serde_json::to_string(&response)?
            };
            println!("{}", json);
            Ok(())
        }
        Some(Command::Years { models }) => {
            let monitor = build_monitor(&config, &models)?;
            let years = monitor.available_years();
            for (middle, key) in &years.values {
                println!("{}\t{}", middle, key);
            }
            Ok(())
        }
    }
}

fn defaults(config: &Config) -> TrackRequest {
    TrackRequest {
        tracker: config.tracker.clone(),
        aggregation: config.aggregation.clone(),
        do_cleaning: false,
    }
}

/// Load the model files and set up the pipeline.
fn build_monitor(config: &Config, models: &ModelArgs) -> anyhow::Result<VocabularyMonitor> {
    let pattern = models
        .files
        .clone()
        .unwrap_or_else(|| config.model_pattern());
    let binary = config.models.binary && !models.non_binary;

    let registry = load_registry(&pattern, binary)
        .with_context(|| format!("Failed to load models from {}", pattern))?;

    let cleaner = match models.cleaning.as_ref().or(config.cleaning.function.as_ref()) {
        Some(name) => Some(cleaner_by_name(name)?),
        None => None,
    };

    Ok(VocabularyMonitor::new(Arc::new(registry))
        .with_cleaner(cleaner)
        .with_projection(config.projection.clone())
        .with_granularity(config.network.granularity))
}

/// Run the HTTP server.
async fn run_server(
    explicit_config: bool,
    mut config: Config,
    models: ModelArgs,
    port: Option<u16>,
    json_logs: bool,
) -> anyhow::Result<()> {
    // Initialize tracing for server mode
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting concept-shift v{}", env!("CARGO_PKG_VERSION"));

    if !explicit_config {
        config = Config::load()?;
    }
    if let Some(p) = port {
        config.server.port = p;
    }

    let monitor = build_monitor(&config, &models)?;
    tracing::info!(
        slices = monitor.registry().len(),
        cleaning = monitor.can_clean(),
        port = config.server.port,
        "Models loaded"
    );

    let router = create_rest_router(
        monitor,
        &RestApiConfig {
            enable_cors: config.server.cors,
            defaults: defaults(&config),
        },
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
