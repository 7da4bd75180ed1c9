//! OpenAPI Tools CLI
//!
//! Command-line interface for generating and calling tools from API documents.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use openapi_tools::{
    lint, load_document, load_document_auto, load_document_str, normalize, ClientConfig,
    FileStatus, OperationRegistry, Severity, ToolContract, ToolSchemaBuilder, ToolSet,
};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "openapi-tools")]
#[command(about = "Generate and call tools from OpenAPI documents")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tool contract generated for every operation
    Tools {
        /// Document source: file path or URL (http:// or https://)
        document: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the document after normalization
    Normalize {
        /// Document source: file path or URL (http:// or https://)
        document: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Execute one tool call and print the response
    Call {
        /// Document source: file path or URL (http:// or https://)
        document: String,

        /// Tool name (the operation identifier)
        tool: String,

        /// Arguments as a JSON object
        #[arg(long, conflicts_with = "args_file")]
        args: Option<String>,

        /// File containing the arguments (JSON or YAML)
        #[arg(long)]
        args_file: Option<PathBuf>,

        #[command(flatten)]
        client: ClientArgs,

        /// Check arguments strictly against the input schema before sending
        #[arg(long)]
        validate: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Lint documents for errors (syntax, broken refs, duplicate operations)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

#[derive(clap::Args)]
struct ClientArgs {
    /// Base URL, overriding the document's servers
    #[arg(long, env = "OPENAPI_BASE_URL")]
    base_url: Option<String>,

    /// Extra header as NAME:VALUE (repeatable); values may contain commas
    #[arg(long = "header", short = 'H')]
    headers: Vec<String>,

    /// Headers from the environment, separated by ';' or newlines
    #[arg(long = "env-headers", env = "OPENAPI_HEADERS", hide = true)]
    env_headers: Option<String>,

    /// Basic auth username
    #[arg(long, env = "OPENAPI_USERNAME")]
    username: Option<String>,

    /// Basic auth password
    #[arg(long, env = "OPENAPI_PASSWORD")]
    password: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "OPENAPI_TIMEOUT")]
    timeout: Option<u64>,
}

impl ClientArgs {
    fn into_config(self) -> Result<ClientConfig, String> {
        let mut config = ClientConfig::new();
        if let Some(url) = self.base_url {
            config = config.base_url(url);
        }
        let from_env = self
            .env_headers
            .iter()
            .flat_map(|list| list.split(['\n', ';']))
            .map(str::trim)
            .filter(|entry| !entry.is_empty());
        // Flags come last so they win over the environment.
        for raw in from_env.chain(self.headers.iter().map(String::as_str)) {
            let (name, value) = raw
                .split_once(':')
                .ok_or_else(|| format!("header '{}' is not NAME:VALUE", raw))?;
            config = config.header(name.trim(), value.trim());
        }
        if let Some(username) = self.username {
            config = config.basic_auth(username, self.password.unwrap_or_default());
        }
        if let Some(secs) = self.timeout {
            config = config.timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Tools {
            document,
            output,
            pretty,
        } => run_tools(&document, output, pretty),

        Commands::Normalize { document, pretty } => run_normalize(&document, pretty),

        Commands::Call {
            document,
            tool,
            args,
            args_file,
            client,
            validate,
            pretty,
        } => run_call(CallArgs {
            document,
            tool,
            args,
            args_file,
            client,
            validate,
            pretty,
        }),

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_tools(source: &str, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let mut document = load(source)?;
    // Listing needs no base URL, so the executor is never built here.
    let registry = normalize(&mut document)
        .and_then(|()| OperationRegistry::index(&document))
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;
    let builder = ToolSchemaBuilder::new(&document);
    let tools: Vec<ToolContract> = registry
        .operations()
        .iter()
        .map(|op| builder.build(op))
        .collect();

    let json_output = to_json(&tools, pretty)?;
    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }
    Ok(())
}

fn run_normalize(source: &str, pretty: bool) -> Result<(), u8> {
    let mut document = load(source)?;
    normalize(&mut document).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    println!("{}", to_json(&document, pretty)?);
    Ok(())
}

struct CallArgs {
    document: String,
    tool: String,
    args: Option<String>,
    args_file: Option<PathBuf>,
    client: ClientArgs,
    validate: bool,
    pretty: bool,
}

fn run_call(call: CallArgs) -> Result<(), u8> {
    let CallArgs {
        document: source,
        tool,
        args,
        args_file,
        client,
        validate,
        pretty,
    } = call;

    let arguments = match (args, args_file) {
        (Some(raw), _) => load_document_str(&raw),
        (None, Some(path)) => load_document(&path),
        (None, None) => Ok(Value::Object(Default::default())),
    }
    .map_err(|e| {
        eprintln!("Error: loading arguments: {}", e);
        e.exit_code() as u8
    })?;

    let config = client.into_config().map_err(|msg| {
        eprintln!("Error: {}", msg);
        2u8
    })?;

    let document = load(&source)?;
    let tools = ToolSet::from_document(document, &config).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let outcome = if validate {
        tools.call_validated(&tool, &arguments)
    } else {
        tools.call(&tool, &arguments)
    };

    match outcome {
        Ok(output) => {
            println!("{}", to_json(&output, pretty)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", to_json(&e.to_json(), pretty)?);
            Err(e.exit_code() as u8)
        }
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);
    let passed = result.is_ok() && (!strict || result.warnings == 0);

    if format == "json" {
        println!("{}", to_json(&result, true)?);
        return if passed { Ok(()) } else { Err(1) };
    }

    if !quiet {
        println!("Linting {} ...\n", path.display());
    }

    for file_result in &result.results {
        let status_icon = match file_result.status {
            FileStatus::Ok => "\x1b[32m✓\x1b[0m",
            FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
            FileStatus::Error => "\x1b[31m✗\x1b[0m",
        };

        if !quiet || file_result.status != FileStatus::Ok {
            println!("  {} {}", status_icon, file_result.file.display());
        }

        for diag in &file_result.diagnostics {
            let (color, label) = match diag.severity {
                Severity::Error => ("\x1b[31m", "error"),
                Severity::Warning => ("\x1b[33m", "warning"),
            };
            if !quiet || diag.severity == Severity::Error {
                println!(
                    "    {}{}[{}]\x1b[0m: {} - {}",
                    color, label, diag.code, diag.path, diag.message
                );
            }
        }
    }

    println!();
    if passed {
        println!(
            "\x1b[32m✓ {} files checked, all passed\x1b[0m",
            result.files_checked
        );
        Ok(())
    } else {
        println!(
            "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
            result.files_checked, result.passed, result.failed, result.errors, result.warnings
        );
        Err(1)
    }
}

fn load(source: &str) -> Result<Value, u8> {
    load_document_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String, u8> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })
}
