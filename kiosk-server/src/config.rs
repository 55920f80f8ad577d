//! Service configuration and CLI argument parsing
//!
//! All settings come from command-line arguments with environment variable
//! fallbacks:
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Default values (lowest priority)
//!
//! # Example Usage
//!
//! ```bash
//! # Publish workflows, sweep leftovers, then run 20 orders/s for a minute
//! export CONDUCTOR_SERVER_URL=https://conductor.example.com
//! kiosk --workflows-dir ./workflows --cleanup --load-test \
//!     --workflows-per-second 20 --duration 60
//!
//! # Mixed (CLI overrides env)
//! export KIOSK_WORKFLOWS_PER_SECOND=5
//! kiosk --load-test --workflows-per-second 50  # Uses 50
//! ```

use anyhow::{Result, anyhow};
use clap::Parser;
use kiosk::config::{DEFAULT_RATE_PER_SECOND, DEFAULT_THINK_TIME};
use kiosk::{LoadTestConfig, ThroughputAccounting, TransientRetryPolicy, WorkUnitConfig};
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

/// Default `uri` input handed to every started workflow
pub const DEFAULT_API_TEST_URI: &str = "http://127.0.0.1:8081/";

/// Workflow the load driver starts unless configured otherwise
pub const DEFAULT_WORKFLOW_NAME: &str = "KioskOrder";

/// Main configuration structure for the service
#[derive(Debug, Clone)]
pub struct Config {
    /// Orchestration service connection
    pub conductor: ConductorConfig,
    /// Workflow started by each unit
    pub workflow: WorkflowConfig,
    /// Terminate RUNNING executions before serving
    pub cleanup: bool,
    /// Present when a load test should run
    pub load_test: Option<LoadTestConfig>,
    /// HTTP listener
    pub http: HttpConfig,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct ConductorConfig {
    /// Base URL, e.g. `https://conductor.example.com`
    pub endpoint: String,
    /// Static token sent as `X-Authorization`
    pub token: Option<String>,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub name: String,
    pub version: u32,
    /// Passed to every workflow as its `uri` input
    pub api_test_uri: String,
    /// Directory of JSON definitions published at startup
    pub definitions_dir: Option<PathBuf>,
}

/// HTTP listener configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

/// Command-line arguments for the service
///
/// Every argument can also be set through the environment variable named in
/// its help. CLI arguments take precedence over environment variables.
#[derive(Parser, Debug)]
#[command(
    name = "kiosk",
    about = "Kiosk order demo service and load driver",
    long_about = "Simulates self-service kiosk orders against a workflow orchestration server.\n\nStarts an HTTP listener and, with --load-test, drives kiosk orders at a fixed rate until the run completes.\n\nCLI arguments take precedence over environment variables."
)]
pub struct Args {
    // Orchestration service
    #[arg(
        long,
        value_name = "URL",
        help = "Orchestration server base URL",
        env = "CONDUCTOR_SERVER_URL"
    )]
    pub endpoint: Option<String>,
    #[arg(
        long,
        help = "Authenticate with a static token",
        env = "KIOSK_AUTH"
    )]
    pub auth: bool,
    #[arg(
        long,
        value_name = "TOKEN",
        help = "Static access token (required with --auth)",
        env = "CONDUCTOR_SERVER_TOKEN",
        hide_env_values = true
    )]
    pub token: Option<String>,
    #[arg(
        long,
        value_name = "SECS",
        help = "Connect timeout for orchestration requests",
        default_value_t = 5,
        env = "KIOSK_CONNECT_TIMEOUT_SECS"
    )]
    pub connect_timeout_secs: u64,

    // Startup actions
    #[arg(
        long,
        help = "Terminate RUNNING workflows before starting",
        env = "KIOSK_CLEANUP"
    )]
    pub cleanup: bool,
    #[arg(
        long,
        value_name = "DIR",
        help = "Directory of JSON workflow definitions to publish",
        env = "KIOSK_WORKFLOWS_DIR"
    )]
    pub workflows_dir: Option<PathBuf>,
    #[arg(
        long,
        value_name = "NAME",
        help = "Workflow started by each order",
        default_value = DEFAULT_WORKFLOW_NAME,
        env = "KIOSK_WORKFLOW_NAME"
    )]
    pub workflow_name: String,
    #[arg(
        long,
        value_name = "VERSION",
        help = "Workflow version (overridden by a published definition)",
        default_value_t = 1,
        env = "KIOSK_WORKFLOW_VERSION"
    )]
    pub workflow_version: u32,
    #[arg(
        long,
        value_name = "URI",
        help = "URI passed to each workflow as input",
        default_value = DEFAULT_API_TEST_URI,
        env = "KIOSK_API_TEST_URI"
    )]
    pub api_test_uri: String,

    // Load test
    #[arg(long, help = "Run the load test", env = "KIOSK_LOAD_TEST")]
    pub load_test: bool,
    #[arg(
        long,
        value_name = "N",
        help = "Target workflows started per second",
        default_value_t = DEFAULT_RATE_PER_SECOND,
        allow_negative_numbers = true,
        env = "KIOSK_WORKFLOWS_PER_SECOND"
    )]
    pub workflows_per_second: i64,
    #[arg(
        long,
        value_name = "SECS",
        help = "Load test duration (runs until Ctrl-C when absent)",
        allow_negative_numbers = true,
        env = "KIOSK_DURATION"
    )]
    pub duration: Option<i64>,
    #[arg(
        long,
        help = "Retry calls that fail with a transient transport error",
        env = "KIOSK_RETRY_TRANSIENT"
    )]
    pub retry_transient: bool,
    #[arg(
        long,
        value_name = "N",
        help = "Retry cap per call with --retry-transient [default: unlimited]",
        env = "KIOSK_MAX_TRANSIENT_RETRIES"
    )]
    pub max_transient_retries: Option<u32>,
    #[arg(
        long,
        help = "Leave transient failures out of the started count",
        env = "KIOSK_EXCLUDE_TRANSIENT_FROM_STARTED"
    )]
    pub exclude_transient_from_started: bool,
    #[arg(
        long,
        value_name = "N",
        help = "AddItem signals sent before Checkout",
        default_value_t = 0,
        env = "KIOSK_ADD_ITEM_STEPS"
    )]
    pub add_item_steps: u32,
    #[arg(
        long,
        value_name = "MS",
        help = "Pause before each AddItem signal",
        default_value_t = DEFAULT_THINK_TIME.as_millis() as u64,
        env = "KIOSK_THINK_TIME_MS"
    )]
    pub think_time_ms: u64,
    #[arg(
        long,
        value_name = "MS",
        help = "Period between drain progress checks",
        default_value_t = 500,
        env = "KIOSK_DRAIN_POLL_INTERVAL_MS"
    )]
    pub drain_poll_interval_ms: u64,

    // HTTP listener
    #[arg(
        long,
        value_name = "HOST",
        help = "HTTP host",
        default_value = "127.0.0.1",
        env = "KIOSK_HTTP_HOST"
    )]
    pub http_host: String,
    #[arg(
        long,
        value_name = "PORT",
        help = "HTTP port",
        default_value_t = 3000,
        env = "KIOSK_HTTP_PORT"
    )]
    pub http_port: u16,

    // General options
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "KIOSK_LOG_LEVEL"
    )]
    pub log_level: String,

    // Utility options
    #[arg(
        long,
        help = "List all environment variables and exit",
        action = clap::ArgAction::SetTrue
    )]
    pub list_env_vars: bool,
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No endpoint is given, or it is not an http(s) URL
    /// - `--auth` is set without a token
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();

        if args.list_env_vars {
            Self::print_env_vars();
            std::process::exit(0);
        }

        Self::from_args(args)
    }

    /// Build and validate configuration from already parsed arguments
    pub fn from_args(args: Args) -> Result<Self> {
        let endpoint = args.endpoint.ok_or_else(|| {
            anyhow!(
                "An orchestration server endpoint is required.\n\n\
                Set it with:\n  \
                --endpoint <URL>\n  \
                CONDUCTOR_SERVER_URL=<URL>\n\n\
                For more information, try '--help'"
            )
        })?;

        let load_test = args.load_test.then(|| {
            let transient_retry = match (args.retry_transient, args.max_transient_retries) {
                (false, _) => TransientRetryPolicy::Never,
                (true, Some(limit)) => TransientRetryPolicy::Limited(limit),
                (true, None) => TransientRetryPolicy::Unlimited,
            };

            let accounting = if args.exclude_transient_from_started {
                ThroughputAccounting::ExcludeTransient
            } else {
                ThroughputAccounting::CountAll
            };

            LoadTestConfig {
                rate_per_second: args.workflows_per_second,
                duration_seconds: args.duration,
                drain_poll_interval: Duration::from_millis(args.drain_poll_interval_ms),
                transient_retry,
                accounting,
                work_unit: WorkUnitConfig {
                    add_item_steps: args.add_item_steps,
                    think_time: Duration::from_millis(args.think_time_ms),
                },
            }
        });

        let mut config = Config {
            conductor: ConductorConfig {
                endpoint,
                token: args.token,
                connect_timeout: Duration::from_secs(args.connect_timeout_secs),
            },
            workflow: WorkflowConfig {
                name: args.workflow_name,
                version: args.workflow_version,
                api_test_uri: args.api_test_uri,
                definitions_dir: args.workflows_dir,
            },
            cleanup: args.cleanup,
            load_test,
            http: HttpConfig {
                host: args.http_host,
                port: args.http_port,
            },
            log_level: args.log_level,
        };

        config.validate(args.auth)?;

        // Without --auth the token is never sent
        if !args.auth {
            config.conductor.token = None;
        }

        Ok(config)
    }

    /// Policy applied to transient failures by the `/start-workflow` route
    pub fn transient_retry(&self) -> TransientRetryPolicy {
        self.load_test
            .as_ref()
            .map(|load_test| load_test.transient_retry)
            .unwrap_or_default()
    }

    fn validate(&self, auth: bool) -> Result<()> {
        let url = Url::parse(&self.conductor.endpoint)
            .map_err(|e| anyhow!("Invalid endpoint '{}': {}", self.conductor.endpoint, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "Invalid endpoint '{}': scheme must be http or https",
                self.conductor.endpoint
            ));
        }

        if auth && self.conductor.token.as_deref().is_none_or(str::is_empty) {
            return Err(anyhow!(
                "--auth requires a token.\n\n\
                Set it with:\n  \
                --token <TOKEN>\n  \
                CONDUCTOR_SERVER_TOKEN=<TOKEN>"
            ));
        }

        Ok(())
    }

    /// Print all available environment variables and their descriptions
    fn print_env_vars() {
        println!("Kiosk Environment Variables");
        println!("===========================");
        println!();
        println!("CLI arguments take precedence over environment variables.");
        println!();

        println!("Orchestration Server:");
        println!("  CONDUCTOR_SERVER_URL=<url>               Server base URL [required]");
        println!("  CONDUCTOR_SERVER_TOKEN=<token>           Static access token");
        println!("  KIOSK_AUTH=true|false                    Send the access token [default: false]");
        println!("  KIOSK_CONNECT_TIMEOUT_SECS=<secs>        Connect timeout [default: 5]");
        println!();

        println!("Startup:");
        println!("  KIOSK_CLEANUP=true|false                 Terminate RUNNING workflows [default: false]");
        println!("  KIOSK_WORKFLOWS_DIR=<dir>                JSON workflow definitions to publish");
        println!("  KIOSK_WORKFLOW_NAME=<name>               Workflow to start [default: KioskOrder]");
        println!("  KIOSK_WORKFLOW_VERSION=<n>               Workflow version [default: 1]");
        println!(
            "  KIOSK_API_TEST_URI=<uri>                 Workflow uri input [default: {DEFAULT_API_TEST_URI}]"
        );
        println!();

        println!("Load Test:");
        println!("  KIOSK_LOAD_TEST=true|false               Run the load test [default: false]");
        println!("  KIOSK_WORKFLOWS_PER_SECOND=<n>           Target rate [default: 10]");
        println!("  KIOSK_DURATION=<secs>                    Duration [default: until Ctrl-C]");
        println!("  KIOSK_RETRY_TRANSIENT=true|false         Retry transient failures [default: false]");
        println!("  KIOSK_MAX_TRANSIENT_RETRIES=<n>          Retry cap [default: unlimited]");
        println!(
            "  KIOSK_EXCLUDE_TRANSIENT_FROM_STARTED=true|false   Report throughput without transient failures [default: false]"
        );
        println!("  KIOSK_ADD_ITEM_STEPS=<n>                 AddItem signals per order [default: 0]");
        println!("  KIOSK_THINK_TIME_MS=<ms>                 Pause before each AddItem [default: 3000]");
        println!("  KIOSK_DRAIN_POLL_INTERVAL_MS=<ms>        Drain polling period [default: 500]");
        println!();

        println!("HTTP Listener:");
        println!("  KIOSK_HTTP_HOST=<host>                   HTTP host [default: 127.0.0.1]");
        println!("  KIOSK_HTTP_PORT=<port>                   HTTP port [default: 3000]");
        println!();

        println!("General Configuration:");
        println!(
            "  KIOSK_LOG_LEVEL=<level>                  Log level: error, warn, info, debug, trace [default: info]"
        );
        println!();

        println!("Examples:");
        println!("  # Run 20 orders per second for one minute");
        println!("  export CONDUCTOR_SERVER_URL=https://conductor.example.com");
        println!("  export KIOSK_LOAD_TEST=true");
        println!("  export KIOSK_WORKFLOWS_PER_SECOND=20");
        println!("  export KIOSK_DURATION=60");
        println!();
        println!("  # Run (CLI args override env vars)");
        println!("  kiosk --workflows-per-second 50  # Will use 50, not 20");
    }
}
