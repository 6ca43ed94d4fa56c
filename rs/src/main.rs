//! Teammate command-line interface
//!
//! Batch commands build the matrices and the semantic index into the data
//! directory; `recommend` answers a single request from those artifacts.

use anyhow::Context;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use teammate::models::timestamp;
use teammate::{
    CollaborationMatrix, DistanceMatrix, DistanceOrder, FileStorage,
    RecommendationEngine, RecommendationRequest, RecommenderConfig, SearchEngine, StaffingStorage,
};

#[derive(Parser)]
#[command(name = "teammate")]
#[command(about = "Recommend colleagues by proximity, collaboration history and expertise")]
#[command(version)]
struct Args {
    /// Directory holding employee/meeting records and built artifacts
    #[arg(long, default_value = "data", global = true)]
    data_dir: PathBuf,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the distance and collaboration matrices from the records
    BuildMatrices,

    /// Embed employee profiles into the semantic index
    BuildIndex,

    /// Recommend employees for each participant term
    Recommend(RecommendArgs),

    /// Print the JSON schema of a recommendation request
    RequestSchema,
}

#[derive(clap::Args)]
struct RecommendArgs {
    /// Read the whole request from a JSON file instead of flags
    #[arg(long, conflicts_with_all = ["reference", "participants", "start", "end", "preference"])]
    request: Option<PathBuf>,

    /// Employee the scores are measured from
    #[arg(long, required_unless_present = "request")]
    reference: Option<String>,

    /// Full name or role description; repeat for several seats
    #[arg(long = "participant", required_unless_present = "request")]
    participants: Vec<String>,

    /// Window start candidates must be free from
    #[arg(long, value_parser = parse_time)]
    start: Option<NaiveDateTime>,

    /// Window end candidates must be free until
    #[arg(long, value_parser = parse_time)]
    end: Option<NaiveDateTime>,

    /// Location, Collaboration, Expertise or None
    #[arg(long)]
    preference: Option<String>,

    /// Semantic matches considered per free-text term
    #[arg(long, default_value_t = teammate::constants::DEFAULT_SEMANTIC_K)]
    k: usize,

    /// Recommendations returned per term
    #[arg(long, default_value_t = teammate::constants::DEFAULT_MAX_RECOMMENDATIONS)]
    top: usize,

    /// Which end of the distance scale ranks first
    #[arg(long, value_enum, default_value_t = DistanceOrder::Nearest)]
    distance_order: DistanceOrder,
}

fn parse_time(text: &str) -> Result<NaiveDateTime, String> {
    timestamp::parse(text).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for command output
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("teammate={},fastembed=info", log_level))
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Teammate version: {}", teammate::VERSION);
    tracing::info!("Data directory: {}", args.data_dir.display());

    match args.command {
        Command::BuildMatrices => build_matrices(&args.data_dir).await,
        Command::BuildIndex => build_index(&args.data_dir).await,
        Command::Recommend(recommend_args) => recommend(&args.data_dir, recommend_args).await,
        Command::RequestSchema => {
            let schema = schemars::schema_for!(RecommendationRequest);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

async fn build_matrices(data_dir: &Path) -> anyhow::Result<()> {
    let storage = FileStorage::new(data_dir).await?;

    let employees = storage.load_employees().await?;
    let distance = DistanceMatrix::build(&employees);
    storage.save_distance_matrix(&distance).await?;

    let meetings = storage.load_meetings().await?;
    let collaboration = CollaborationMatrix::build(&meetings);
    storage.save_collaboration_matrix(&collaboration).await?;

    println!(
        "Built distance matrix ({} employees) and collaboration matrix ({} employees)",
        distance.len(),
        collaboration.len()
    );
    Ok(())
}

async fn build_index(data_dir: &Path) -> anyhow::Result<()> {
    let storage = FileStorage::new(data_dir).await?;
    let employees = storage.load_employees().await?;

    let engine = SearchEngine::new(Default::default());
    let index = engine.build_index(&employees).await?;
    storage.save_employee_index(&index).await?;

    println!("Indexed {} employee profiles", index.len());
    Ok(())
}

async fn recommend(data_dir: &Path, args: RecommendArgs) -> anyhow::Result<()> {
    let request = match &args.request {
        Some(path) => {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read request {}", path.display()))?;
            serde_json::from_str::<RecommendationRequest>(&content)
                .with_context(|| format!("Invalid request in {}", path.display()))?
        }
        None => {
            let reference = args
                .reference
                .clone()
                .context("--reference is required without --request")?;
            let mut request =
                RecommendationRequest::new(reference.as_str(), args.participants.clone());
            request.start_time = args.start;
            request.end_time = args.end;
            request.preference = args.preference.clone().into();
            request
        }
    };

    let storage = FileStorage::new(data_dir).await?;
    let index = storage.load_employee_index().await?;
    let config = RecommenderConfig {
        semantic_k: args.k,
        max_recommendations: args.top,
        distance_order: args.distance_order,
    };
    let engine =
        RecommendationEngine::load(&storage, Box::new(SearchEngine::new(index)), config).await?;

    let response = engine.recommend(&request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
