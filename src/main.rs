use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{EnvFilter, fmt};

use property_analyzer::agents::coordinator::{CHECK_FLOOD_HISTORY, EXECUTE_SQL, GET_DEMOGRAPHICS};
use property_analyzer::agents::{Agent, AgentError, Coordinator, ReportAgent};
use property_analyzer::config::Config;
use property_analyzer::console::Console;
use property_analyzer::gemini::GeminiClient;
use property_analyzer::geo::PostalTable;
use property_analyzer::orchestrator::{AnalysisRequest, Orchestrator};

#[derive(Debug, Parser)]
#[command(name = "property-analyzer", about = "Real estate investment data lookups and memo generation")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// FEMA flood declaration history for the county of a zip code
    Flood { zip_code: String },

    /// Census population and median household income for a zip code
    Demographics { zip_code: String },

    /// Resolve a zip code against the offline postal table
    Locate { zip_code: String },

    /// Format raw analysis text into an investment memo
    Memo {
        /// Read the analysis from a file instead of the argument
        #[arg(long)]
        file: Option<PathBuf>,
        text: Option<String>,
    },

    /// Run a read-only query against the BigQuery dataset
    Sql { query: String },

    /// Print the coordinator's agent manifest (instruction and tool declarations) as JSON
    Tools,

    /// Print the coordinator's instruction text
    Instruction,

    /// Gather demographics, flood history and optional queries for a zip code, then write a memo
    Analyze {
        zip_code: String,

        /// Extra read-only warehouse query to include (repeatable)
        #[arg(long = "sql")]
        queries: Vec<String>,

        /// Free-form notes appended to the raw analysis
        #[arg(long)]
        notes: Option<String>,

        /// Output directory for artifacts
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,
    },

    /// Interactive shell for calling capabilities by name
    Console,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    // logging
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter_layer).with_writer(std::io::stderr).init();

    tracing::info!("Starting property analyzer");

    let config = Config::load()?;
    let postal = Arc::new(PostalTable::load(config.postal_table_path.as_deref()).await?);
    let coordinator = Coordinator::new(&config, postal.clone())?;

    match args.command {
        Command::Flood { zip_code } => {
            let output = coordinator
                .invoke(CHECK_FLOOD_HISTORY, json!({"zip_code": zip_code}))
                .await;
            Console::display_output(CHECK_FLOOD_HISTORY, &output);
        }
        Command::Demographics { zip_code } => {
            let output = coordinator
                .invoke(GET_DEMOGRAPHICS, json!({"zip_code": zip_code}))
                .await;
            Console::display_output(GET_DEMOGRAPHICS, &output);
        }
        Command::Locate { zip_code } => {
            Console::display_locality(&postal.resolve(&zip_code));
        }
        Command::Memo { file, text } => {
            let analysis = match (file, text) {
                (Some(path), _) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, Some(text)) => text,
                (None, None) => anyhow::bail!("provide analysis text or --file"),
            };
            let report = ReportAgent::new(GeminiClient::new(config.gemini.clone(), config.timeout)?);
            match report.execute(&analysis).await {
                Ok(memo) => Console::display_memo(&memo),
                Err(AgentError::Llm(e)) => {
                    Console::display_gemini_error(&e);
                    return Err(e.into());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Sql { query } => {
            let output = coordinator.invoke(EXECUTE_SQL, json!({"query": query})).await;
            Console::display_output(EXECUTE_SQL, &output);
        }
        Command::Tools => {
            println!("{}", serde_json::to_string_pretty(&coordinator.manifest())?);
        }
        Command::Instruction => {
            println!("{}", coordinator.instruction);
        }
        Command::Analyze {
            zip_code,
            queries,
            notes,
            out_dir,
        } => {
            let orchestrator = Orchestrator::new(coordinator, postal);
            let request = AnalysisRequest {
                zip_code,
                queries,
                notes,
            };
            match orchestrator.run(&request, &out_dir).await {
                Ok(outcome) => {
                    Console::display_outcome(&outcome);
                    println!(
                        "Artifacts:\n  {}\n  {}",
                        outcome.analysis_path.display(),
                        outcome.memo_path.display()
                    );
                }
                Err(e) => {
                    Console::display_error(&e);
                    return Err(e);
                }
            }
        }
        Command::Console => {
            Console::new(coordinator).run().await?;
        }
    }

    Ok(())
}
