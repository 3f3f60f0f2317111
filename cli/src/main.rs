use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use cgv_ai::batch::SessionMode;
use cgv_core::domain::{NoCitationPolicy, NoInformationPolicy};
use cgv_core::verdict::VerdictPolicy;
use cgv_stub::BackgroundStub;
use clap::{Args, Parser, Subcommand};
use groundcheck_lib::commands::{self, OutputFormat};
use groundcheck_lib::config::VerifierConfig;
use groundcheck_lib::presets::{find_preset, preset_names};
use groundcheck_lib::logging;

#[derive(Parser)]
#[command(name = "groundcheck")]
#[command(about = "Verify that cited legal articles were actually retrieved", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./groundcheck.toml when present)
    #[arg(short, long, env = "GROUNDCHECK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, env = "GROUNDCHECK_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long, env = "GROUNDCHECK_LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a batch of queries against the backend and report grounding
    Run(RunArgs),
    /// Verify one answer text against a known retrieved set, offline
    Check(CheckArgs),
    /// Probe backend liveness
    Health(BackendArgs),
    /// Serve the mock backend
    ServeStub {
        /// Listen address
        #[arg(short, long, env = "GROUNDCHECK_STUB_ADDR")]
        listen: Option<String>,
    },
}

#[derive(Args)]
struct BackendArgs {
    /// Backend base URL
    #[arg(long, env = "GROUNDCHECK_BASE_URL")]
    base_url: Option<String>,

    /// Chat endpoint path
    #[arg(long)]
    chat_path: Option<String>,

    /// Health endpoint path
    #[arg(long)]
    health_path: Option<String>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    backend: BackendArgs,

    /// Built-in query set
    #[arg(short, long)]
    preset: Option<String>,

    /// Query to run (repeatable)
    #[arg(short, long = "query")]
    queries: Vec<String>,

    /// File with one query per line
    #[arg(long)]
    queries_file: Option<PathBuf>,

    /// Per-query timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Pause between queries in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    #[arg(long)]
    session_prefix: Option<String>,

    /// Give every query its own session (`{prefix}_{n}`)
    #[arg(long)]
    per_query_sessions: bool,

    /// Pass earlier turns as conversation history (shared session only)
    #[arg(long)]
    carry_history: bool,

    #[arg(long)]
    stop_on_error: bool,

    /// Treat answers that cite nothing despite retrieved context as warnings
    #[arg(long)]
    warn_on_no_citations: bool,

    /// Treat answers that admit having no information as warnings
    #[arg(long)]
    warn_on_no_information: bool,

    /// Run against an in-process mock backend
    #[arg(long)]
    with_stub: bool,

    #[arg(long)]
    skip_health: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct CheckArgs {
    /// Answer text
    #[arg(long, conflicts_with = "answer_file", required_unless_present = "answer_file")]
    answer: Option<String>,

    /// File holding the answer text
    #[arg(long)]
    answer_file: Option<PathBuf>,

    /// Retrieved identifiers, e.g. "81,4"
    #[arg(long, default_value = "")]
    retrieved: String,

    #[arg(long)]
    warn_on_no_citations: bool,

    #[arg(long)]
    warn_on_no_information: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
    format: OutputFormat,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write per-query rows as CSV
    #[arg(long)]
    csv: Option<PathBuf>,
}

impl BackendArgs {
    fn apply(&self, config: &mut VerifierConfig) {
        if let Some(url) = &self.base_url {
            config.backend.base_url = url.clone();
        }
        if let Some(path) = &self.chat_path {
            config.backend.chat_path = path.clone();
        }
        if let Some(path) = &self.health_path {
            config.backend.health_path = path.clone();
        }
    }
}

impl RunArgs {
    fn apply(&self, config: &mut VerifierConfig) {
        self.backend.apply(config);
        if self.timeout_ms.is_some() {
            config.backend.timeout_ms = self.timeout_ms;
        }
        if self.delay_ms.is_some() {
            config.batch.inter_query_delay_ms = self.delay_ms;
        }
        if let Some(prefix) = &self.session_prefix {
            config.batch.session_id_prefix = Some(prefix.clone());
        }
        if self.per_query_sessions {
            config.batch.session_mode = Some(SessionMode::PerQuery);
        }
        config.batch.carry_history |= self.carry_history;
        config.batch.stop_on_error |= self.stop_on_error;
        if self.warn_on_no_citations {
            config.batch.no_citation_policy = NoCitationPolicy::Warn;
        }
        if self.warn_on_no_information {
            config.batch.no_information_policy = Some(NoInformationPolicy::Warn);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config =
        VerifierConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    let level = cli.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
    logging::init(&level, cli.log_json || config.logging.json);

    match cli.command {
        Command::Run(args) => {
            args.apply(&mut config);
            let preset = match args.preset.as_deref() {
                Some(name) => match find_preset(name) {
                    Some(p) => Some(p),
                    None => bail!(
                        "unknown preset `{name}` (available: {})",
                        preset_names().join(", ")
                    ),
                },
                None => None,
            };
            let queries =
                commands::collect_queries(preset, &args.queries, args.queries_file.as_deref())?;

            // Keep the stub alive until the batch is done.
            let _stub = if args.with_stub {
                let stub = BackgroundStub::start("127.0.0.1:0")?;
                config.backend.base_url = stub.base_url();
                Some(stub)
            } else {
                None
            };

            let report = commands::run_batch_command(&config, &queries, preset, args.skip_health)?;
            commands::write_outputs(
                &report,
                args.output.format,
                args.output.output.as_deref(),
                args.output.csv.as_deref(),
            )?;
            Ok(ExitCode::from(commands::exit_code(&report) as u8))
        }
        Command::Check(args) => {
            let answer = match (&args.answer, &args.answer_file) {
                (Some(text), _) => text.clone(),
                (None, Some(path)) => std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, None) => bail!("--answer or --answer-file is required"),
            };
            let retrieved = commands::parse_identifier_list(&args.retrieved)?;
            let policy = VerdictPolicy {
                no_citation: if args.warn_on_no_citations {
                    NoCitationPolicy::Warn
                } else {
                    config.batch.no_citation_policy
                },
                no_information: if args.warn_on_no_information {
                    NoInformationPolicy::Warn
                } else {
                    config.batch.no_information_policy.unwrap_or_default()
                },
            };
            let report = commands::check_answer(&answer, &retrieved, policy);
            commands::write_outputs(
                &report,
                args.output.format,
                args.output.output.as_deref(),
                args.output.csv.as_deref(),
            )?;
            Ok(ExitCode::from(commands::exit_code(&report) as u8))
        }
        Command::Health(args) => {
            args.apply(&mut config);
            let status = commands::health_command(&config)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::ServeStub { listen } => {
            let addr = listen.unwrap_or_else(|| config.stub.listen_addr.clone());
            commands::serve_stub_command(&addr)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
