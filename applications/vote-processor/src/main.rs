/// Festify vote processor - applies votes to party queues
use anyhow::Context;
use clap::{Parser, Subcommand};
use festify_core::{PartyId, TrackReference, UserId};
use festify_queue::{parties, VoteOutcome};
use festify_votes::{config::AppConfig, ingest, state::AppState};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "festify-votes")]
#[command(about = "Festify vote processor and queue maintenance", long_about = None)]
struct Cli {
    /// Configuration file path (default: ./festify.toml if present)
    #[arg(short, long, global = true, env = "FESTIFY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a party, or show it if it already exists
    CreateParty {
        /// Party id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        /// Display name
        #[arg(long)]
        name: Option<String>,
    },
    /// Cast or retract one user's vote
    Vote {
        #[arg(long)]
        party: String,
        /// Track key, e.g. spotify-4uLU6hMCjMI75M1A2tKUQC
        #[arg(long)]
        track: String,
        #[arg(long)]
        user: String,
        /// Retract the vote instead of casting it
        #[arg(long)]
        retract: bool,
    },
    /// Process JSON-lines vote events from a file or stdin
    Ingest {
        /// Input file (default: stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Print a party's queue in play order
    Queue {
        #[arg(long)]
        party: String,
    },
    /// Finish a played track and start the next one
    Played {
        #[arg(long)]
        party: String,
        #[arg(long)]
        track: String,
    },
    /// Queue playlist tracks as fallback tracks
    SeedFallback {
        #[arg(long)]
        party: String,
        /// Track keys in playlist order
        #[arg(required = true)]
        tracks: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "festify_votes=info,festify_queue=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    config.validate()?;
    let state = AppState::open(&config).await?;

    match cli.command {
        Commands::CreateParty { id, name } => create_party(&state, id, name).await?,
        Commands::Vote {
            party,
            track,
            user,
            retract,
        } => vote(&state, &party, &track, &user, !retract).await?,
        Commands::Ingest { file } => ingest_events(&state, &config, file).await?,
        Commands::Queue { party } => print_queue(&state, &party).await?,
        Commands::Played { party, track } => complete_track(&state, &party, &track).await?,
        Commands::SeedFallback { party, tracks } => {
            seed_fallback(&state, &party, &tracks).await?;
        }
    }

    Ok(())
}

async fn create_party(
    state: &AppState,
    id: Option<String>,
    name: Option<String>,
) -> anyhow::Result<()> {
    let id = id.map_or_else(PartyId::generate, PartyId::new);
    let party = parties::create_party(state.store.as_ref(), id, name).await?;

    println!("{}", serde_json::to_string_pretty(&party)?);
    Ok(())
}

async fn vote(
    state: &AppState,
    party: &str,
    track: &str,
    user: &str,
    cast: bool,
) -> anyhow::Result<()> {
    let outcome = state
        .dispatcher
        .vote(&PartyId::new(party), track, &UserId::new(user), cast)
        .await?;

    match outcome {
        None => println!("vote already {}", if cast { "cast" } else { "retracted" }),
        Some(VoteOutcome::Inserted(doc) | VoteOutcome::Updated(doc)) => {
            println!("{}: {} votes, order {}", track, doc.vote_count, doc.order);
        }
        Some(outcome) => println!("{}: {}", track, outcome.as_str()),
    }
    Ok(())
}

async fn ingest_events(
    state: &AppState,
    config: &AppConfig,
    file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let dispatcher = state.dispatcher.clone();
    let capacity = config.ingest.channel_capacity;

    let report = match file {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            ingest(BufReader::new(file), dispatcher, capacity).await?
        }
        None => ingest(BufReader::new(tokio::io::stdin()), dispatcher, capacity).await?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn print_queue(state: &AppState, party: &str) -> anyhow::Result<()> {
    let entries = state.queue().tracks(&PartyId::new(party)).await?;

    if entries.is_empty() {
        println!("queue is empty");
        return Ok(());
    }

    for (position, entry) in entries.iter().enumerate() {
        let mut flags = Vec::new();
        if position == 0 {
            flags.push("playing");
        }
        if entry.track.is_fallback {
            flags.push("fallback");
        }
        if entry.track.has_played() {
            flags.push("played");
        }

        println!(
            "{:>3}. {:<40} {:>4} votes  {}",
            position + 1,
            entry.key,
            entry.track.vote_count,
            flags.join(",")
        );
    }
    Ok(())
}

async fn complete_track(state: &AppState, party: &str, track: &str) -> anyhow::Result<()> {
    let head = state
        .dispatcher
        .complete_track(&PartyId::new(party), track)
        .await?;

    match head {
        Some(entry) => println!("now playing {} ({} votes)", entry.key, entry.track.vote_count),
        None => println!("queue is empty"),
    }
    Ok(())
}

async fn seed_fallback(state: &AppState, party: &str, tracks: &[String]) -> anyhow::Result<()> {
    let party_id = PartyId::new(party);
    let party = parties::get_party(state.store.as_ref(), &party_id)
        .await?
        .with_context(|| format!("party {party_id} not found"))?;

    let references = tracks
        .iter()
        .map(|key| TrackReference::from_key(key))
        .collect::<festify_core::Result<Vec<_>>>()?;

    let inserted = state.queue().seed_fallback(&party, &references).await?;
    println!("queued {inserted} of {} fallback tracks", references.len());
    Ok(())
}
