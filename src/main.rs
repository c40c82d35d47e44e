use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info, warn};

mod config;
mod db;
mod llm;
mod repl;
mod util;

use crate::config::{AppConfig, CliArgs, ConfigError};
use crate::db::db_pool::Database;
use crate::db::executor::QueryExecutor;
use crate::db::schema::{introspect, SchemaDescription};
use crate::llm::LlmManager;
use crate::repl::Session;
use crate::util::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = CliArgs::parse();

    // Initialize logging
    init_tracing(if args.verbose { "debug" } else { "warn" }, args.log_json);

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("\nError initializing: {}", e);
        if matches!(e, ConfigError::MissingApiKey) {
            eprintln!("\nPlease check:");
            eprintln!("1. GEMINI_API_KEY is set in the environment or in {}", args.env_file.display());
            eprintln!("2. DB_NAME points at the DuckDB database to query");
            eprintln!("3. Get an API key from: https://aistudio.google.com/app/apikey");
        }
        return Err(e.into());
    }

    let db = Database::open(&config.database);

    info!("Initializing LLM manager with backend: {}", config.llm.backend);
    let llm_manager = LlmManager::new(&config.llm).await?;
    println!("Using model: {}", llm_manager.model_name());

    let schema = match introspect(&db).await {
        Ok(tables) => {
            if tables.is_empty() {
                warn!("Database {} has no tables", config.database.connection_string);
            }
            SchemaDescription::from_tables(&tables)
        }
        Err(e) => {
            error!("Failed to read database schema: {}", e);
            SchemaDescription::unavailable(&e)
        }
    };

    let executor = QueryExecutor::new(db);
    let stdout = std::io::stdout();
    let mut session = Session::new(
        llm_manager.generator(),
        &executor,
        &schema,
        stdout.lock(),
        args.yes,
    );

    match &args.question {
        Some(question) => {
            if !session.answer_once(question).await? {
                return Err("question could not be answered".into());
            }
        }
        None => session.run(BufReader::new(tokio::io::stdin())).await?,
    }

    Ok(())
}
