mod config;
mod logging;
mod models;
mod ports;
mod services;
mod youtube_rs;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::{Result, eyre::Context};

use crate::{
    config::Config,
    models::group_thousands,
    ports::browser::Browser,
    services::{
        browser::SystemBrowser,
        classifier::TextClassifier,
        pipeline::{Pipeline, RunOutcome, RunReport},
        session,
    },
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
struct Args {
    /// The config file to use
    #[arg(short, long, global = true, env = "AFRO_SCOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `afro_scout=debug`
    #[arg(long, default_value = "info", global = true, env = "AFRO_SCOUT_LOG")]
    log_level: String,

    /// OTLP gRPC endpoint to export traces to
    #[arg(long, global = true, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// YouTube Data API key, used when OAuth is unavailable
    #[arg(short = 'k', long = "api-key", env = "YOUTUBE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Skip OAuth and only write the manual playlist guide
    #[arg(long)]
    read_only: bool,

    /// Do not open the playlist or YouTube in a browser
    #[arg(long)]
    no_browser: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find up-and-coming Afrobeats artists and build a playlist (default)
    Run(RunArgs),
    /// Sign in with Google and store the OAuth token
    Login {
        /// Print the sign-in URL instead of opening it
        #[arg(long)]
        no_browser: bool,
    },
    /// Show how the text classifier scores a video
    Classify {
        #[arg(short, long)]
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        #[arg(long, default_value = "")]
        channel: String,

        /// May be repeated
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(error) = color_eyre::install() {
        eprintln!("Error: {}", error);
        return ExitCode::FAILURE;
    }
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let tracer_provider = match logging::init_tracing(
        env!("CARGO_PKG_NAME"),
        args.otlp_endpoint.as_deref(),
        &args.log_level,
    ) {
        Ok(provider) => provider,
        Err(error) => {
            eprintln!("Error: {:#}", error);
            return ExitCode::FAILURE;
        }
    };

    let code = tokio::select! {
        result = execute(args) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("Error: {:#}", error);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nCancelled");
            ExitCode::from(130)
        }
    };

    if let Some(provider) = tracer_provider
        && let Err(error) = provider.shutdown()
    {
        eprintln!("Failed to flush traces: {}", error);
    }
    code
}

async fn execute(args: Args) -> Result<()> {
    tracing::debug!("Loading configuration");
    let config = match &args.config {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
    .wrap_err("Failed to load afro-scout config")?;

    match args.command.unwrap_or(Commands::Run(args.run)) {
        Commands::Run(run_args) => run(&config, run_args).await,
        Commands::Login { no_browser } => {
            let system_browser = SystemBrowser;
            let browser: Option<&dyn Browser> = if no_browser {
                None
            } else {
                Some(&system_browser)
            };
            session::login(&config, browser).await?;
            println!(
                "Signed in. Token stored at {}",
                config.auth.token_path().display()
            );
            Ok(())
        }
        Commands::Classify {
            title,
            description,
            channel,
            tags,
        } => {
            let classifier = TextClassifier::new(&config.classifier);
            let score = classifier.score(&title, &description, &channel, &tags);
            println!("Afrobeats score: {}", score.afrobeats_score);
            println!("African score:   {}", score.african_score);
            println!("Music terms:     {}", score.has_music_terms);
            if let Some(term) = &score.excluded_by {
                println!("Excluded by:     '{}'", term);
            }
            println!(
                "Verdict:         {}",
                if score.is_authentic() {
                    "authentic Afrobeats"
                } else {
                    "rejected"
                }
            );
            Ok(())
        }
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                tracing::debug!("Creating default config");
                let path = Config::create_default()?;
                println!("{}", path.display());
                Ok(())
            }
            ConfigCommands::Path => {
                match Config::config_path() {
                    Some(path) => println!("{}", path.display()),
                    None => println!("No default config path found"),
                }
                Ok(())
            }
        },
    }
}

async fn run(config: &Config, args: RunArgs) -> Result<()> {
    println!("AFROBEATS PLAYLIST GENERATOR");
    println!("Finding authentic up-and-coming Afrobeats artists");
    println!(
        "Criteria: <{} subs, >{} views, last {} days\n",
        group_thousands(config.thresholds.max_subscribers),
        group_thousands(config.thresholds.min_video_views),
        config.thresholds.max_video_age_days
    );

    let system_browser = SystemBrowser;
    let browser: Option<&dyn Browser> = if args.no_browser {
        None
    } else {
        Some(&system_browser)
    };

    let session = session::establish(config, args.api_key, args.read_only, browser).await?;
    let report = Pipeline::new(config, &session, browser)
        .run(Utc::now())
        .await?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("Authentic Afrobeats videos found: {}", report.candidates);
    println!("Up-and-coming artists: {}", report.up_and_coming.len());

    match &report.outcome {
        RunOutcome::NoCandidates => {
            println!("\nNo authentic Afrobeats found. Try adjusting keywords.");
        }
        RunOutcome::NoUpAndComing => {
            println!("\nNo up-and-coming artists found. Try relaxing criteria.");
        }
        RunOutcome::Playlist { id, url, added } => {
            println!("\nYour Afrobeats playlist is ready!");
            println!("Playlist ID: {}", id);
            println!("Added {} videos: {}", added, url);
            println!("Check your YouTube app → Library → Playlists");
        }
        RunOutcome::ManualGuide { path, guide } => {
            println!("\nMANUAL PLAYLIST CREATION GUIDE");
            println!("{}", "=".repeat(50));
            println!("Playlist name: {}", guide.playlist_name);
            println!("Total videos: {}", guide.total_videos);
            println!("\nInstructions:");
            for instruction in &guide.instructions {
                println!("   {}", instruction);
            }
            println!("\nVIDEOS TO ADD:");
            println!("{}", "=".repeat(50));
            for video in &guide.videos {
                println!("{:2}. {}", video.position, video.title);
                println!(
                    "    {} ({} subs)",
                    video.artist,
                    group_thousands(video.subscribers)
                );
                println!("    {}\n", video.url);
            }
            println!("Instructions saved to {}", path.display());
        }
    }

    if !report.skips.is_empty() {
        println!("\nSkipped {} item(s):", report.skips.len());
        for skip in &report.skips {
            println!("  - {}", skip);
        }
    }
}
