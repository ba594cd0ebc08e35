//! Cohort Assistant - loan portfolio analytics with an AI data assistant
//!
//! A CLI tool that loads a pre-computed loan-cohort summary, renders the
//! dashboard views, and answers questions about the portfolio and the KYC
//! funnel analysis through the Gemini API.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Invalid arguments, configuration error, or a failed `--ask` turn

mod analysis;
mod assistant;
mod cli;
mod config;
mod data;
mod llm;
mod models;
mod report;

use anyhow::{Context, Result};
use assistant::{PipelineConfig, ResponsePipeline};
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use data::CohortTable;
use indicatif::{ProgressBar, ProgressStyle};
use llm::{GeminiClient, GeminiConfig, GenerationProvider};
use models::Reply;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Secrets may live in a .env file next to the data
    dotenv::dotenv().ok();

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("Cohort Assistant v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .cohort-assistant.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to change the data path, model, persona, and dashboard.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {:#}. Using defaults.", CONFIG_FILE_NAME, e);
            Ok(Config::default())
        }
    }
}

/// Dispatch to the requested mode. Returns the process exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let csv_path = config.data.csv_path.clone();
    let table = data::load_cached(&csv_path);
    if table.is_none() {
        warn!(
            "No cohort data loaded from {}; the assistant will answer without loan figures",
            csv_path.display()
        );
    }
    let table_ref: Option<&CohortTable> = table.as_deref();

    if args.table {
        println!("{}", report::render_table(table_ref, &csv_path));
        return Ok(0);
    }

    if args.insights {
        println!("{}", report::render_insights());
        return Ok(0);
    }

    if let Some(ref out) = args.export_html {
        let html = report::render_dashboard_html(&config.dashboard, table_ref, &csv_path);
        std::fs::write(out, html)
            .with_context(|| format!("Failed to write dashboard to {}", out.display()))?;
        println!("✅ Dashboard written to {}", out.display());
        return Ok(0);
    }

    // The loan section is computed once and reused for every request.
    let loan_section = analysis::loan_context(table_ref);
    let persona = assistant::Persona {
        company: config.chat.company.clone(),
        analyst: config.chat.analyst.clone(),
    };
    let system_prompt = assistant::compose_system_prompt(&persona, &loan_section);

    if args.show_prompt {
        println!("{}", system_prompt);
        println!("\n✅ Dry run complete. No model calls were made.");
        return Ok(0);
    }

    let provider = GeminiClient::new(GeminiConfig {
        base_url: config.model.api_base_url.clone(),
        api_key_env: config.model.api_key_env.clone(),
        timeout_seconds: config.model.timeout_seconds,
        temperature: config.model.temperature,
    })?;

    let mut pipeline = ResponsePipeline::new(
        provider,
        PipelineConfig {
            preferred_model: config.model.preferred_model.clone(),
            max_history_messages: config.chat.max_history_messages,
        },
        system_prompt,
        assistant::greeting(&persona),
    );

    let exit_code = if let Some(ref question) = args.ask {
        let reply = ask_with_spinner(&mut pipeline, question, args.quiet).await;
        match reply {
            Reply::Success(text) => {
                println!("{}", text);
                0
            }
            Reply::Failure(e) => {
                eprintln!("{}", e.user_message());
                1
            }
        }
    } else {
        if table.is_none() {
            println!("⚠️  {}", report::missing_file_notice(&csv_path));
        }
        run_chat(&mut pipeline, args.quiet).await?;
        0
    };

    if let Some(ref path) = args.transcript {
        let transcript = report::render_transcript(pipeline.conversation(), &config.dashboard.title);
        std::fs::write(path, transcript)
            .with_context(|| format!("Failed to write transcript to {}", path.display()))?;
        println!("📝 Transcript saved to {}", path.display());
    }

    Ok(exit_code)
}

/// Interactive chat loop over stdin.
async fn run_chat<P: GenerationProvider>(
    pipeline: &mut ResponsePipeline<P>,
    quiet: bool,
) -> Result<()> {
    println!("🤖 Data Assistant");
    println!("Ask me about portfolio performance, the Top 3 cohorts, or the KYC drop-off analysis.");
    println!("Commands: /insights, /help, /quit\n");
    println!("{}", report::render_sample_questions());

    if let Some(greeting) = pipeline.conversation().last() {
        println!("{} {}\n", greeting.role.emoji(), greeting.content);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        pipeline.await_input();
        print_prompt_marker();

        let Some(line) = lines
            .next_line()
            .await
            .context("Failed to read from stdin")?
        else {
            println!();
            break;
        };

        let input = line.trim();
        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => {
                println!("{}", report::render_sample_questions());
                continue;
            }
            "/insights" => {
                println!("{}", report::render_insights());
                continue;
            }
            _ => {}
        }

        let reply = ask_with_spinner(pipeline, input, quiet).await;
        if let Some(message) = pipeline.conversation().last() {
            println!("\n{} {}\n", message.role.emoji(), message.content);
        }
        debug!("Turn finished (success: {})", reply.is_success());
    }

    Ok(())
}

fn print_prompt_marker() {
    use std::io::Write;
    print!("🧑 > ");
    let _ = std::io::stdout().flush();
}

/// Run one turn with a spinner on stderr while the request is in flight.
async fn ask_with_spinner<P: GenerationProvider>(
    pipeline: &mut ResponsePipeline<P>,
    question: &str,
    quiet: bool,
) -> Reply {
    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.magenta} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Thinking...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };

    let reply = pipeline.submit(question).await;
    spinner.finish_and_clear();
    reply
}
