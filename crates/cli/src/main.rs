//! OpenTwin CLI: the main entry point.
//!
//! Commands:
//! - `extract`    Pull content from URLs, local files or the curated speech list
//! - `analyze`    Build a persona profile from the extracted content
//! - `query`      Ask the digital twin one question
//! - `chat`       Interactive chat with the digital twin
//! - `fomc`       Generate an FOMC-style rate decision
//! - `voice-chat` Spoken (or typed) practice with the English tutor
//! - `scenario`   Role-play scenarios with the English tutor
//! - `status`     Show stored content and configuration
//! - `info`       Describe the available extractors

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

/// Default persona for the digital-twin commands.
const DEFAULT_PERSONA: &str = "Jerome Powell";

#[derive(Parser)]
#[command(
    name = "opentwin",
    about = "OpenTwin: build AI digital twins and practice English with a voice tutor",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract content from URLs or files and store it
    Extract {
        /// URL to extract (repeatable)
        #[arg(short, long = "url")]
        urls: Vec<String>,

        /// Local .txt or .md file to parse (repeatable)
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,

        /// Extract the curated list of Powell speeches
        #[arg(long)]
        powell: bool,

        /// Number of Powell speeches to extract
        #[arg(short, long, default_value_t = 10)]
        num: usize,

        /// Extractor to use (overrides EXTRACTOR_TYPE)
        #[arg(short, long, value_parser = ["jina", "firecrawl"])]
        extractor: Option<String>,
    },

    /// Analyze extracted content and build a persona profile
    Analyze {
        #[arg(short, long, default_value = DEFAULT_PERSONA)]
        name: String,
    },

    /// Ask the digital twin a question
    Query {
        query: String,

        #[arg(short, long, default_value = DEFAULT_PERSONA)]
        name: String,

        /// Do not read or write long-term memory
        #[arg(long)]
        no_memory: bool,
    },

    /// Interactive chat with the digital twin
    Chat {
        #[arg(short, long, default_value = DEFAULT_PERSONA)]
        name: String,

        #[arg(long)]
        no_memory: bool,
    },

    /// Generate an FOMC decision from economic data
    Fomc {
        #[arg(long, default_value = "3.2%")]
        inflation: String,

        #[arg(long, default_value = "3.7%")]
        unemployment: String,

        #[arg(long, default_value = "2.5%")]
        gdp_growth: String,

        #[arg(short, long, default_value = DEFAULT_PERSONA)]
        name: String,
    },

    /// Voice conversation with the English tutor
    VoiceChat {
        /// Text-to-speech voice (alloy, echo, fable, onyx, nova, shimmer)
        #[arg(long)]
        voice: Option<String>,

        /// Type instead of speaking; replies are still printed
        #[arg(long)]
        text: bool,

        #[arg(long)]
        no_memory: bool,
    },

    /// Role-play scenarios with the English tutor
    Scenario {
        /// Scenario id to start
        id: Option<String>,

        /// List scenarios instead of starting one
        #[arg(long)]
        list: bool,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        difficulty: Option<String>,

        /// Pick a random scenario matching the filters
        #[arg(long)]
        random: bool,

        /// Speak and listen instead of typing
        #[arg(long)]
        voice: bool,

        #[arg(long)]
        no_memory: bool,
    },

    /// Show stored content, personas and configuration
    Status,

    /// Show information about available extractors
    Info {
        /// Extractor to describe
        #[arg(short = 't', long = "type", value_parser = ["jina", "firecrawl"])]
        extractor_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Extract {
            urls,
            files,
            powell,
            num,
            extractor,
        } => commands::extract::run(urls, files, powell, num, extractor).await,
        Commands::Analyze { name } => commands::analyze::run(name).await,
        Commands::Query {
            query,
            name,
            no_memory,
        } => commands::query::run(query, name, no_memory).await,
        Commands::Chat { name, no_memory } => commands::chat::run(name, no_memory).await,
        Commands::Fomc {
            inflation,
            unemployment,
            gdp_growth,
            name,
        } => commands::fomc::run(inflation, unemployment, gdp_growth, name).await,
        Commands::VoiceChat {
            voice,
            text,
            no_memory,
        } => commands::voice_chat::run(voice, text, no_memory).await,
        Commands::Scenario {
            id,
            list,
            category,
            difficulty,
            random,
            voice,
            no_memory,
        } => {
            let args = commands::scenario::ScenarioArgs {
                id,
                list,
                category,
                difficulty,
                random,
                voice,
                no_memory,
            };
            commands::scenario::run(args).await
        }
        Commands::Status => commands::status::run().await,
        Commands::Info { extractor_type } => commands::info::run(extractor_type).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("  ❌ {e}");
            ExitCode::from(commands::exit_code(e.as_ref()))
        }
    }
}
