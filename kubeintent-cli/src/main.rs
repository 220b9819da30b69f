// kubeintent-cli/src/main.rs
mod history;
mod models;
mod rendering;

use anyhow::{anyhow, Context, Result};
use colored::*;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use uuid::Uuid;

use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};

use kubeintent_core::config::CONFIG_FILENAME;
use kubeintent_core::models::execution::ExecutionMode;
use kubeintent_core::tools::execution_mode;
use kubeintent_core::{
    safety, Assistant, AssistantConfig, AssistantReply, AssistantResponse, AuditLog, BatchStatus,
    KnowledgeBase,
};

use crate::history::FileInteractionLog;
use crate::models::cli::{Cli, Commands};
use crate::rendering::{print_json, print_reply, write_verdict};

use clap::Parser;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{
    fmt::{self, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const APP_DIR: &str = "kubeintent";
const LOG_FILE_NAME: &str = "kubeintent.log";

/// Walks up from `start` looking for the config file.
fn find_config_in_ancestors(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILENAME))
        .find(|path| path.is_file())
}

/// The project config nearest the working directory, else the per-user one.
fn find_config_file() -> Result<PathBuf> {
    let current_dir = env::current_dir().context("Failed to get current directory")?;
    if let Some(path) = find_config_in_ancestors(&current_dir) {
        return Ok(path);
    }
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILENAME));
    match user_config {
        Some(path) if path.is_file() => Ok(path),
        _ => Err(anyhow!(
            "Could not find '{}' in the current directory, any parent directory, or the user config directory.",
            CONFIG_FILENAME
        )),
    }
}

fn load_cli_config() -> Result<AssistantConfig> {
    let config_path = find_config_file()?;
    let config = AssistantConfig::load_from_file(&config_path)?;
    info!("Loaded configuration from {:?}", config_path);
    Ok(config)
}

fn load_knowledge(config: &AssistantConfig) -> KnowledgeBase {
    let Some(path) = config.knowledge.file.as_deref() else {
        return KnowledgeBase::empty();
    };
    match KnowledgeBase::load(path) {
        Ok(knowledge) => {
            info!(path = %path.display(), "Loaded knowledge notes");
            knowledge
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Failed to load knowledge notes, continuing without them"
            );
            KnowledgeBase::empty()
        }
    }
}

fn build_assistant(log: Arc<FileInteractionLog>) -> Result<Assistant> {
    let config = load_cli_config()?;
    let knowledge = load_knowledge(&config);
    let assistant = Assistant::from_config(&config, knowledge, log, Arc::new(AuditLog::new()))?;
    Ok(assistant)
}

fn mode_name(mode: ExecutionMode) -> &'static str {
    match mode {
        ExecutionMode::Shell => "shell",
        ExecutionMode::Direct => "direct",
    }
}

/// Replies that should make a one-shot run exit non-zero.
fn reply_failed(reply: &AssistantReply) -> bool {
    match &reply.response {
        AssistantResponse::Commands(result) => result.status == BatchStatus::Failed,
        AssistantResponse::GenerationFailed { .. } => true,
        _ => false,
    }
}

fn spinner() -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "-"]),
    );
    pb.set_message("Working...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

async fn handle_request(assistant: &Assistant, query: &str, json: bool) -> Result<AssistantReply> {
    let pb = if json { None } else { Some(spinner()?) };
    let result = assistant.handle(query).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let reply = result?;

    if json {
        print_json(&reply)?;
    } else if let Err(e) = print_reply(&reply) {
        error!("Failed to render reply: {}. Printing summary.", e);
        println!("{}", reply.response.summary());
    }
    Ok(reply)
}

/// Handles one request (non-interactive).
async fn run_single_turn(assistant: Assistant, query: String, json: bool) -> Result<ExitCode> {
    info!(task = %query, "Running non-interactive request.");
    let reply = handle_request(&assistant, &query, json).await?;
    Ok(if reply_failed(&reply) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_welcome_message() {
    println!("\n{}", "kubeintent - natural-language cluster operations".cyan().bold());
    println!(
        "{}",
        "Type 'exit', 'quit', Ctrl-D, or press Enter on an empty line to quit.".dimmed()
    );
    println!();
}

/// Runs an interactive session using rustyline for a REPL experience.
async fn run_interactive(assistant: Assistant, json: bool) -> Result<ExitCode> {
    print_welcome_message();

    let rl_config = Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .edit_mode(rustyline::EditMode::Emacs)
        .auto_add_history(true)
        .build();
    let mut rl = DefaultEditor::with_config(rl_config)?;

    let history_dir = dirs::cache_dir()
        .map(|d| d.join(APP_DIR))
        .ok_or_else(|| anyhow!("Could not determine cache directory for history file"))?;
    fs::create_dir_all(&history_dir).context("Failed to create history directory")?;
    let history_file_path = history_dir.join("cli_history.txt");
    if rl.load_history(&history_file_path).is_err() {
        debug!(
            path = %history_file_path.display(),
            "No previous CLI history found or error loading."
        );
    }

    let prompt = format!("{} ", ">".green().bold());

    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let input = line.trim();
                let lowered = input.to_lowercase();
                if input.is_empty() || lowered == "exit" || lowered == "quit" {
                    info!("Exit command or empty line entered, exiting interactive mode.");
                    break;
                }

                // A request that fails outright does not end the session.
                if let Err(e) = handle_request(&assistant, input, json).await {
                    error!("Request failed: {:#}", e);
                    eprintln!("\n{}: {:#}", "Request failed".red(), e);
                }
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => {
                info!("EOF detected, exiting interactive mode.");
                break;
            }
            Err(err) => {
                error!("Readline error: {:?}", err);
                eprintln!("Error reading input: {}", err.to_string().red());
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&history_file_path) {
        warn!(path = %history_file_path.display(), error = %e, "Failed to save CLI history.");
    } else {
        debug!(path = %history_file_path.display(), "Saved CLI history.");
    }

    println!("\n{}\n", "Goodbye.".cyan());
    Ok(ExitCode::SUCCESS)
}

fn handle_list(log: &FileInteractionLog, limit: usize, json: bool) -> Result<()> {
    let records = log.list()?;
    if json {
        let shown: Vec<_> = records.into_iter().take(limit).collect();
        return print_json(&shown);
    }
    if records.is_empty() {
        println!("No recorded interactions found.");
        return Ok(());
    }

    println!("\n{}", "Recent Interactions:".bold());
    println!(
        "{:<36} {:<20} {}",
        "ID".underline(),
        "Updated".underline(),
        "Request".underline()
    );
    for record in records.iter().take(limit) {
        let local_time = record.updated_at.with_timezone(&chrono::Local);
        let status = match &record.reply {
            Some(reply) => reply.analysis.headline.normal(),
            None => "no reply".yellow(),
        };
        println!(
            "{:<36} {:<20} {} {}",
            record.id.to_string(),
            local_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            record.preview(),
            format!("({})", status).dimmed()
        );
    }
    println!("\n{}", "(Use 'kubeintent view <ID>' to see details)".dimmed());
    Ok(())
}

fn handle_view(log: &FileInteractionLog, id: Uuid, json: bool) -> Result<()> {
    let record = log.load(id)?;
    if json {
        return print_json(&record);
    }
    let created_local = record.created_at.with_timezone(&chrono::Local);
    let updated_local = record.updated_at.with_timezone(&chrono::Local);

    println!("\n{}", format!("Interaction ID: {}", record.id).bold());
    println!("Created:        {}", created_local.format("%Y-%m-%d %H:%M:%S %Z"));
    println!("Last Updated:   {}", updated_local.format("%Y-%m-%d %H:%M:%S %Z"));
    println!("Request:        {}", record.query);
    match &record.reply {
        Some(reply) => print_reply(reply)?,
        None => println!("\n{}", "(No reply was recorded for this request)".dimmed()),
    }
    Ok(())
}

fn handle_delete(log: &FileInteractionLog, id: Uuid, yes: bool) -> Result<()> {
    let confirmed = yes
        || Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Are you sure you want to delete interaction {}?", id))
            .default(false)
            .interact()?;
    if confirmed {
        log.delete(id)?;
        println!("Interaction {} deleted.", id);
    } else {
        println!("Deletion cancelled.");
    }
    Ok(())
}

fn handle_check(command: &str, json: bool) -> Result<ExitCode> {
    let verdict = safety::classify(command);
    let mode = mode_name(execution_mode(command));
    if json {
        print_json(&serde_json::json!({
            "command": command,
            "safety": verdict,
            "mode": mode,
        }))?;
    } else {
        let mut stdout = io::stdout().lock();
        write_verdict(&mut stdout, command, &verdict, mode)?;
    }
    Ok(if verdict.is_allowed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn open_log() -> Result<Arc<FileInteractionLog>> {
    let log = FileInteractionLog::open(FileInteractionLog::default_dir()?)?;
    debug!(dir = %log.dir().display(), "Interaction history directory");
    Ok(Arc::new(log))
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Some(Commands::Check { command }) => handle_check(&command, cli.json),
        Some(Commands::List { limit }) => {
            handle_list(&*open_log()?, limit, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::View { id }) => {
            handle_view(&*open_log()?, id, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Delete { id, yes }) => {
            handle_delete(&*open_log()?, id, yes)?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            let assistant = build_assistant(open_log()?)?;
            match cli.task {
                Some(query) => run_single_turn(assistant, query, cli.json).await,
                None => run_interactive(assistant, cli.json).await,
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    colored::control::set_override(true);

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // --- Logging Setup ---
    let default_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()));

    let log_dir = match dirs::cache_dir()
        .or_else(dirs::runtime_dir)
        .or_else(|| Some(env::temp_dir()))
        .map(|d| d.join(APP_DIR))
    {
        Some(dir) => dir,
        None => {
            eprintln!("{}", "Error: Could not determine a suitable directory for log files.".red());
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("{} Failed to create log directory {}: {}", "Error:".red(), log_dir.display(), e);
        return ExitCode::FAILURE;
    }
    let log_path = log_dir.join(LOG_FILE_NAME);

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let local_timer = LocalTime::new(time::macros::format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_timer(local_timer.clone());

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(local_timer)
        .with_target(false)
        .with_level(true);

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("{} Failed to initialize logging: {}", "Error:".red(), e);
        return ExitCode::FAILURE;
    }
    colored::control::unset_override();

    info!(
        "Logging initialized. Level determined by RUST_LOG or -v flags (default: {}). Logging to stderr and {}",
        default_level,
        log_path.display()
    );
    // --- End Logging Setup ---

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            let is_dialoguer_error = e.downcast_ref::<dialoguer::Error>().is_some();
            if !is_dialoguer_error {
                error!("Operation failed: {:#}", e);
                eprintln!("{} {:#}", "Error:".red(), e);
            }
            ExitCode::FAILURE
        }
    }
}
