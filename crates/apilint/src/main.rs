//! apilint CLI.
//!
//! `serve` runs the validation HTTP service; `lint` runs the same pipeline on
//! local files and prints the problems.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use apilint::api::ValidationResponse;
use apilint::{
    parse_origins, ProblemSeverity, ServerConfig, ValidationConfig, ValidationProblem,
    ValidationService, DEFAULT_MAX_BODY_SIZE,
};
use apilint_ruleset::remote_url;
use apilint_telemetry::{
    log_startup, LogFormat, MetricsRegistry, Telemetry, TelemetryConfig, SERVICE_NAME,
};

#[derive(Parser, Debug)]
#[command(
    name = "apilint",
    about = "Lint OpenAPI and AsyncAPI documents against Spectral-style rulesets",
    version
)]
struct Cli {
    /// Log level filter (`RUST_LOG` takes precedence).
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", default_value = "json", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the validation HTTP server.
    Serve {
        /// Listen host.
        #[arg(long, env = "HTTP_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Listen port.
        #[arg(long, env = "HTTP_PORT", default_value_t = 8080)]
        port: u16,

        /// Comma-separated list of allowed CORS origins.
        #[arg(long, env = "ALLOWED_ORIGINS")]
        allowed_origins: Option<String>,

        /// Fallback CORS origin when no allowed origins are set.
        #[arg(long, env = "APICURIO_UI_URL")]
        apicurio_ui_url: Option<String>,

        /// Maximum request body size in bytes.
        #[arg(long, env = "MAX_BODY_SIZE", default_value_t = DEFAULT_MAX_BODY_SIZE)]
        max_body_size: usize,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Lint a local document.
    ///
    /// Exit codes: 0 no high-severity problem, 1 high-severity problems found,
    /// 2 the ruleset could not be resolved or run, 3 a file could not be read.
    Lint {
        /// Document to lint (JSON or YAML).
        #[arg(long)]
        document: PathBuf,

        /// Ruleset file, or an http(s) URL.
        #[arg(long)]
        ruleset: String,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Timeout of a remote ruleset fetch, in seconds.
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 10)]
    fetch_timeout_secs: u64,

    /// Timeout of a whole validation, in seconds.
    #[arg(long, env = "VALIDATION_TIMEOUT_SECS", default_value_t = 30)]
    validation_timeout_secs: u64,

    /// Lifetime of cached remote rulesets, in seconds (0 disables the cache).
    #[arg(long, env = "RULESET_CACHE_TTL_SECS", default_value_t = 0)]
    ruleset_cache_ttl_secs: u64,
}

impl PipelineArgs {
    fn to_config(&self) -> ValidationConfig {
        ValidationConfig {
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            timeout: Duration::from_secs(self.validation_timeout_secs),
            cache_ttl: (self.ruleset_cache_ttl_secs > 0)
                .then(|| Duration::from_secs(self.ruleset_cache_ttl_secs)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            host,
            port,
            allowed_origins,
            apicurio_ui_url,
            max_body_size,
            pipeline,
        } => {
            let telemetry = match Telemetry::init(TelemetryConfig::new(cli.log_level, cli.log_format)) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("error: {}", e);
                    return ExitCode::from(1);
                }
            };

            let allowed_origins =
                parse_origins(allowed_origins.as_deref(), apicurio_ui_url.as_deref());
            match run_serve(&host, port, allowed_origins, max_body_size, &pipeline, &telemetry)
                .await
            {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::error!(error = %e, "server failed");
                    eprintln!("error: {:#}", e);
                    ExitCode::from(1)
                }
            }
        }

        Command::Lint {
            document,
            ruleset,
            format,
            pipeline,
        } => run_lint(&document, &ruleset, format, &pipeline).await,
    }
}

async fn run_serve(
    host: &str,
    port: u16,
    allowed_origins: Vec<String>,
    max_body_size: usize,
    pipeline: &PipelineArgs,
    telemetry: &Telemetry,
) -> anyhow::Result<()> {
    let listen_addr = tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| anyhow::anyhow!("cannot resolve listen address {}:{}", host, port))?;

    let config = ServerConfig {
        listen_addr,
        allowed_origins,
        max_body_size,
        validation: pipeline.to_config(),
    };

    log_startup!(
        service = SERVICE_NAME,
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.listen_addr,
        fetch_timeout_secs = pipeline.fetch_timeout_secs,
        validation_timeout_secs = pipeline.validation_timeout_secs,
        ruleset_cache_ttl_secs = pipeline.ruleset_cache_ttl_secs,
        "starting apilint"
    );

    apilint::server::run(config, telemetry.metrics_clone()).await
}

/// Run the lint command.
async fn run_lint(
    document: &Path,
    ruleset: &str,
    format: OutputFormat,
    pipeline: &PipelineArgs,
) -> ExitCode {
    let document_text = match tokio::fs::read_to_string(document).await {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: cannot read {}: {}", document.display(), e);
            return ExitCode::from(3);
        }
    };

    let reference = if remote_url(ruleset).is_some() {
        ruleset.to_string()
    } else {
        match tokio::fs::read_to_string(ruleset).await {
            Ok(text) => text,
            Err(e) => {
                eprintln!("error: cannot read {}: {}", ruleset, e);
                return ExitCode::from(3);
            }
        }
    };

    let metrics = Arc::new(MetricsRegistry::new());
    let service = match ValidationService::new(&pipeline.to_config(), metrics) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    let problems = match service.validate(document_text, &reference).await {
        Ok(problems) => problems,
        Err(e) => {
            eprintln!("error[{}]: {}", e.code().as_str(), e);
            return ExitCode::from(2);
        }
    };

    let has_high = problems.iter().any(|p| p.severity == ProblemSeverity::High);
    match format {
        OutputFormat::Json => {
            let output = ValidationResponse { items: problems };
            match serde_json::to_string_pretty(&output) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("error: {}", e);
                    return ExitCode::from(2);
                }
            }
        }
        OutputFormat::Text => print_text(document, &problems),
    }

    if has_high {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn print_text(document: &Path, problems: &[ValidationProblem]) {
    for p in problems {
        println!(
            "{}  {:<6}  {}  {}",
            p.node_path,
            p.severity.as_str(),
            p.error_code,
            p.message
        );
    }

    let count = |severity: ProblemSeverity| {
        problems.iter().filter(|p| p.severity == severity).count()
    };
    eprintln!();
    eprintln!(
        "{}: {} problem(s) ({} high, {} medium, {} low, {} ignore)",
        document.display(),
        problems.len(),
        count(ProblemSeverity::High),
        count(ProblemSeverity::Medium),
        count(ProblemSeverity::Low),
        count(ProblemSeverity::Ignore)
    );
}
