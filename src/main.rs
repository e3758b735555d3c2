//! Stepflow CLI Entry Point
//!
//! Loads a workflow definition file and executes it once.
//!
//! # Usage
//!
//! ```bash
//! # Execute a definition, writing messages to ./outbox/<topic>.jsonl
//! stepflow order-intake.yaml
//!
//! # Provide the execution context inline or from a file
//! stepflow order-intake.yaml --context '{"orderId": 42}'
//! stepflow order-intake.yaml --context-file context.json
//!
//! # Dry run mode (print messages instead of writing them)
//! stepflow order-intake.yaml --dry-run
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info, warn};

use stepflow::dispatch::{MemoryPublisher, MessagePublisher, OutboxPublisher};
use stepflow::execution::{EngineConfig, WorkflowEngine, WorkflowService, DEFAULT_STARTED_BY};
use stepflow::store::{DefinitionStore, InMemoryDefinitionStore, InMemoryInstanceStore};
use stepflow::workflow::{lint_steps, load_definition, parse_definition, Context};
use stepflow::{InstanceStatus, WorkflowInstance, APP_NAME, VERSION};

/// Default directory for the file outbox.
const DEFAULT_OUTBOX_DIR: &str = "outbox";

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    definition_path: Option<String>,
    context_json: Option<String>,
    context_file: Option<PathBuf>,
    outbox_dir: PathBuf,
    started_by: String,
    dry_run: bool,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            definition_path: None,
            context_json: None,
            context_file: None,
            outbox_dir: PathBuf::from(DEFAULT_OUTBOX_DIR),
            started_by: DEFAULT_STARTED_BY.to_string(),
            dry_run: false,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Workflow Orchestration Engine");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: stepflow [OPTIONS] <DEFINITION_FILE>");
    println!();
    println!("Arguments:");
    println!("  <DEFINITION_FILE>     Path to a workflow definition (YAML or JSON)");
    println!();
    println!("Options:");
    println!("  --context JSON        Execution context as a JSON object");
    println!("  --context-file PATH   Read the execution context from a JSON file");
    println!("  --outbox DIR          Directory for published messages (default: {})", DEFAULT_OUTBOX_DIR);
    println!("  --started-by NAME     Recorded as the instance initiator (default: {})", DEFAULT_STARTED_BY);
    println!("  --dry-run             Print messages instead of writing them");
    println!("  --verbose             Enable debug logging");
    println!("  --help                Show this help message");
    println!("  --version             Show version information");
    println!();
    println!("Examples:");
    println!("  stepflow order-intake.yaml");
    println!("  stepflow order-intake.yaml --context '{{\"orderId\": 42}}' --dry-run");
    println!("  stepflow order-intake.yaml --outbox /var/spool/stepflow");
}

/// Returns the value following an option, advancing the cursor.
fn option_value<'a>(args: &'a [String], i: &mut usize, option: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires an argument", option))
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--dry-run" => {
                config.dry_run = true;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--context" => {
                config.context_json = Some(option_value(args, &mut i, "--context")?.to_string());
            }
            "--context-file" => {
                config.context_file = Some(PathBuf::from(option_value(
                    args,
                    &mut i,
                    "--context-file",
                )?));
            }
            "--outbox" => {
                config.outbox_dir = PathBuf::from(option_value(args, &mut i, "--outbox")?);
            }
            "--started-by" => {
                config.started_by = option_value(args, &mut i, "--started-by")?.to_string();
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if config.definition_path.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.definition_path = Some(arg.clone());
            }
        }
        i += 1;
    }

    if config.context_json.is_some() && config.context_file.is_some() {
        return Err("--context and --context-file cannot be combined".to_string());
    }

    Ok(config)
}

/// Builds the execution context from the inline JSON or the context file.
fn load_context(config: &Config) -> Result<Context, Box<dyn std::error::Error>> {
    let raw = match (&config.context_json, &config.context_file) {
        (Some(json), _) => json.clone(),
        (None, Some(path)) => fs::read_to_string(path).map_err(|e| {
            format!("Failed to read context file '{}': {}", path.display(), e)
        })?,
        (None, None) => return Ok(Context::new()),
    };

    let context: Context = serde_json::from_str(&raw)
        .map_err(|e| format!("Context must be a JSON object: {}", e))?;
    Ok(context)
}

/// Prints the terminal instance record.
fn print_instance(instance: &WorkflowInstance) {
    println!();
    println!("Instance:   {}", instance.instance_name);
    println!("Id:         {}", instance.id);
    println!("Status:     {}", instance.status);
    if let Some(step) = &instance.current_step {
        println!("Last step:  {}", step);
    }
    if let Some(ms) = instance.execution_time_ms {
        println!("Duration:   {} ms", ms);
    }
    if let Some(reason) = &instance.error_message {
        println!("Error:      {}", reason);
    }
    println!();
    println!("{}", instance.timeline.summary());
}

/// Main application entry point. Returns the terminal instance status.
async fn run() -> Result<InstanceStatus, Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    let definition_path = config
        .definition_path
        .clone()
        .ok_or("No definition file given")?;

    setup_logging(config.verbose);
    print_banner();

    if config.dry_run {
        info!("Mode: DRY RUN (messages will be printed, not written)");
        println!();
    }

    // Load definition
    let definition = load_definition(&definition_path).map_err(|e| {
        error!("Failed to load definition: {}", e);
        format!("Could not load definition from '{}': {}", definition_path, e)
    })?;

    match parse_definition(&definition.definition_json) {
        Ok(steps) => {
            info!("Definition loaded: {} steps", steps.len());
            for warning in lint_steps(&steps) {
                warn!("{}", warning);
            }
        }
        Err(e) => warn!("Definition will fail at execution: {}", e),
    }

    let context = load_context(&config)?;

    // Choose the publisher
    let memory = Arc::new(MemoryPublisher::new());
    let publisher: Arc<dyn MessagePublisher> = if config.dry_run {
        memory.clone()
    } else {
        info!("Outbox: {}", config.outbox_dir.display());
        Arc::new(OutboxPublisher::new(config.outbox_dir.clone()))
    };

    let engine = WorkflowEngine::with_config(
        publisher,
        EngineConfig {
            started_by: config.started_by.clone(),
        },
    );

    let definitions = Arc::new(InMemoryDefinitionStore::new());
    let service = WorkflowService::new(
        Arc::new(engine),
        definitions.clone(),
        Arc::new(InMemoryInstanceStore::new()),
    );

    let stored = definitions.create(definition).await?;

    // Execute
    let instance = service.execute_by_name(&stored.name, &context).await?;

    if config.dry_run {
        println!();
        for message in memory.messages() {
            println!("[{}] {}", message.topic, message.payload);
        }
    }

    print_instance(&instance);
    Ok(instance.status)
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(InstanceStatus::Completed) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("stepflow")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_arguments_defaults() {
        let config = parse_arguments(&args(&["flow.yaml"])).unwrap();

        assert_eq!(config.definition_path.as_deref(), Some("flow.yaml"));
        assert_eq!(config.outbox_dir, PathBuf::from(DEFAULT_OUTBOX_DIR));
        assert_eq!(config.started_by, "system");
        assert!(!config.dry_run);
    }

    #[test]
    fn test_parse_arguments_options() {
        let config = parse_arguments(&args(&[
            "flow.yaml",
            "--context",
            r#"{"a": 1}"#,
            "--outbox",
            "/tmp/out",
            "--started-by",
            "cron",
            "--dry-run",
        ]))
        .unwrap();

        assert_eq!(config.context_json.as_deref(), Some(r#"{"a": 1}"#));
        assert_eq!(config.outbox_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.started_by, "cron");
        assert!(config.dry_run);
    }

    #[test]
    fn test_parse_arguments_errors() {
        assert!(parse_arguments(&args(&["--bogus"])).is_err());
        assert!(parse_arguments(&args(&["a.yaml", "b.yaml"])).is_err());
        assert!(parse_arguments(&args(&["a.yaml", "--outbox"])).is_err());
        assert!(parse_arguments(&args(&[
            "a.yaml",
            "--context",
            "{}",
            "--context-file",
            "c.json"
        ]))
        .is_err());
    }

    #[test]
    fn test_load_context() {
        let mut config = Config::default();
        assert!(load_context(&config).unwrap().is_empty());

        config.context_json = Some(r#"{"orderId": 42}"#.to_string());
        assert_eq!(load_context(&config).unwrap()["orderId"], 42);

        config.context_json = Some("[1, 2]".to_string());
        assert!(load_context(&config).is_err());
    }
}
