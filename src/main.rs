use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sql_genius::assistant::{QueryAssistant, QueryRequest, QueryType};
use sql_genius::config::{AiConfig, AiProviderKind, DbConfig};
use sql_genius::introspect::{catalog_for, connect_source, extract_schema};
use sql_genius::llm::provider_from_config;
use sql_genius::models::{DbType, QueryResponse, QueryValidation, Schema};
use sql_genius::{prompt, schema};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sql-genius")]
#[command(about = "Natural-language SQL assistant for DDL files and live databases")]
struct Args {
    /// DDL file to read the schema from
    #[arg(long, global = true)]
    ddl: Option<PathBuf>,

    /// Schema file (.json document or DDL)
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Dialect of the DDL file (guessed from the text when omitted)
    #[arg(long, global = true)]
    dialect: Option<DbType>,

    /// Extract the schema from a live database of this type
    #[arg(long, global = true)]
    db: Option<DbType>,

    #[arg(long, global = true, default_value = "localhost")]
    host: String,

    #[arg(long, global = true)]
    port: Option<u16>,

    #[arg(long, global = true, default_value = "")]
    user: String,

    #[arg(long, global = true, default_value = "")]
    password: String,

    #[arg(long, global = true, default_value = "")]
    database: String,

    /// AI provider: ollama or groq (or set SQL_GENIUS_AI_PROVIDER)
    #[arg(long, global = true)]
    provider: Option<AiProviderKind>,

    #[arg(long, global = true)]
    model: Option<String>,

    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Groq API key (or set GROQ_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the loaded schema as JSON
    Schema,
    /// Print the loaded schema as DDL
    Ddl,
    /// Generate SQL from a natural-language request
    Generate {
        prompt: String,
        #[arg(short = 't', long, default_value = "select")]
        query_type: QueryType,
    },
    /// Suggest a faster version of a query
    Optimize { query: String },
    /// Explain what a query does
    Explain { query: String },
    /// Score a query and list its issues
    Validate { query: String },
    /// Interactive session
    Interactive,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let loaded = load_schema(&args).await?;

    match &args.command {
        Command::Schema => println!("{}", schema::to_json(&loaded)?),
        Command::Ddl => print!("{}", schema::generate_ddl(&loaded)),
        Command::Generate { prompt, query_type } => {
            let assistant = build_assistant(&args)?;
            let request = QueryRequest {
                prompt: prompt.clone(),
                schema: loaded,
                query_type: *query_type,
                optimize: true,
            };
            print_response(&assistant.generate(&request).await?);
        }
        Command::Optimize { query } => {
            let assistant = build_assistant(&args)?;
            print_response(&assistant.optimize(query, &loaded).await?);
        }
        Command::Explain { query } => {
            let assistant = build_assistant(&args)?;
            println!("{}", assistant.explain(query).await?);
        }
        Command::Validate { query } => {
            let assistant = build_assistant(&args)?;
            print_validation(&assistant.validate(query, &loaded).await?);
        }
        Command::Interactive => {
            let assistant = build_assistant(&args)?;
            if !assistant.provider().is_available().await {
                warn!(
                    "{} is not reachable; requests will fail until it is",
                    assistant.provider().name()
                );
            }
            interactive(&assistant, &loaded).await?;
        }
    }

    Ok(())
}

async fn load_schema(args: &Args) -> Result<Schema> {
    if let Some(db_type) = args.db {
        let config = DbConfig {
            db_type,
            host: args.host.clone(),
            port: args.port,
            user: args.user.clone(),
            password: args.password.clone(),
            database: args.database.clone(),
        };
        let source = connect_source(&config).await?;
        let catalog = catalog_for(db_type, &config.database);
        return Ok(extract_schema(source.as_ref(), catalog.as_ref(), &config.database).await?);
    }

    match args.schema.as_ref().or(args.ddl.as_ref()) {
        Some(path) => schema::load_schema_file(path, args.dialect)
            .with_context(|| format!("Failed to load schema from {}", path.display())),
        None => {
            info!("No schema given; continuing with an empty schema");
            Ok(Schema::new("", args.dialect))
        }
    }
}

fn build_assistant(args: &Args) -> Result<QueryAssistant> {
    let mut config = AiConfig::from_env()?;
    if let Some(provider) = args.provider {
        config.provider = provider;
    }
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(api_key) = &args.api_key {
        config.api_key = api_key.clone();
    }
    Ok(QueryAssistant::new(provider_from_config(&config)?))
}

async fn interactive(assistant: &QueryAssistant, schema: &Schema) -> Result<()> {
    println!("sql-genius interactive mode ({} tables loaded)", schema.tables.len());
    println!("  /select /insert /update /delete /alter /create <request>");
    println!("  /optimize <query>  /explain <query>  /validate <query>  /schema  exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        let (command, rest) = match line.strip_prefix('/') {
            Some(cmd) => cmd.split_once(' ').unwrap_or((cmd, "")),
            None => ("select", line),
        };
        let rest = rest.trim();

        let outcome = match command {
            "schema" => {
                print!("{}", prompt::format_schema(schema));
                Ok(())
            }
            "optimize" => assistant
                .optimize(rest, schema)
                .await
                .map(|r| print_response(&r)),
            "explain" => assistant.explain(rest).await.map(|text| println!("{}", text)),
            "validate" => assistant
                .validate(rest, schema)
                .await
                .map(|v| print_validation(&v)),
            other => match other.parse::<QueryType>() {
                Ok(query_type) => {
                    let request = QueryRequest {
                        prompt: rest.to_string(),
                        schema: schema.clone(),
                        query_type,
                        optimize: true,
                    };
                    assistant.generate(&request).await.map(|r| print_response(&r))
                }
                Err(e) => Err(e),
            },
        };

        if let Err(e) = outcome {
            eprintln!("error: {}", e);
        }
    }

    Ok(())
}

fn print_response(response: &QueryResponse) {
    println!("\n=== SQL ===\n{}", response.query);
    if !response.explanation.is_empty() {
        println!("\n=== Explanation ===\n{}", response.explanation);
    }
    if !response.tips.is_empty() {
        println!("\n=== Tips ===");
        for tip in &response.tips {
            println!("  - {}", tip);
        }
    }
    println!("\n({} ms)", response.execute_time);
}

fn print_validation(validation: &QueryValidation) {
    println!(
        "\nValid: {}  Score: {}/100  Estimated: {}",
        validation.is_valid,
        validation.score,
        if validation.estimated_time.is_empty() { "-" } else { validation.estimated_time.as_str() }
    );
    if !validation.issues.is_empty() {
        println!("\n=== Issues ===");
        for issue in &validation.issues {
            println!("  [{}] {}", issue.severity.as_str(), issue.message);
            if !issue.location.is_empty() {
                println!("      at: {}", issue.location);
            }
            if !issue.suggestion.is_empty() {
                println!("      fix: {}", issue.suggestion);
            }
        }
    }
    if !validation.index_usage.is_empty() {
        println!("\n=== Indexes ===\n  {}", validation.index_usage.join("\n  "));
    }
    if validation.optimized_query != validation.original_query {
        println!("\n=== Optimized query ===\n{}", validation.optimized_query);
    }
    if !validation.execution_plan.is_empty() {
        println!("\n=== Execution plan ===\n{}", validation.execution_plan);
    }
    if !validation.suggestions.is_empty() {
        println!("\n=== Suggestions ===");
        for suggestion in &validation.suggestions {
            println!("  - {}", suggestion);
        }
    }
    println!("\n({} ms)", validation.ai_response_time);
}
