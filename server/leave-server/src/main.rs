use clap::Parser;
use colored::Colorize;
use std::{env, net::SocketAddr};
use tracing::{info, Level};
use tracing_subscriber::{
    field::RecordFields,
    fmt::{self, time::ChronoUtc, FormatFields},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use error_common::{LeaveError, Result};
use leave_server::{create_app, retention::spawn_retention_sweep, LeaveServer, ServerConfig};

/// LeaveScheduler HTTP Server
#[derive(Parser, Debug)]
#[command(name = "leave-server")]
#[command(about = "LeaveScheduler operation log monitoring API server")]
struct Args {
    /// Server bind address (overrides the configuration file)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides the configuration file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short, long, default_value = "leave-server.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // .env is optional
    let _ = dotenvy::dotenv();

    init_tracing(args.verbose);

    info!("{}", "Starting LeaveScheduler HTTP Server".bright_cyan());
    info!("Version: {}", env!("CARGO_PKG_VERSION").bright_white());

    let mut config = ServerConfig::load(&args.config)
        .map_err(|e| LeaveError::ConfigError(format!("Failed to load {}: {e}", args.config)))?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    config.validate().map_err(LeaveError::ConfigError)?;

    let bind_address = config.bind_address();
    info!("Bind address: {}", bind_address.bright_yellow());

    let server = LeaveServer::new(config)
        .await
        .map_err(|e| LeaveError::DatabaseError(e.to_string()))?;
    let sweep = spawn_retention_sweep(&server);

    let app = create_app(server.clone());

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| LeaveError::NetworkError(format!("Failed to bind to {bind_address}: {e}")))?;

    info!("{}", format!("LeaveScheduler server running on http://{bind_address}").bright_green());
    info!("{}", format!("Health check available at: http://{bind_address}/health").bright_blue());
    info!("{}", format!("Operation logs available at: http://{bind_address}/api/app-logs").bright_blue());

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| LeaveError::ServerError(format!("HTTP server error: {e}")));

    if let Err(e) = &served {
        error_common::log_error("http_server", e).await;
    }
    if let Some(handle) = sweep {
        handle.abort();
    }
    info!("Flushing pending operation logs");
    server.shutdown().await;

    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    // Check if we're in development or production
    let is_development =
        env::var("LEAVE_ENV").unwrap_or_else(|_| "development".to_string()) == "development";
    let use_colors = env::var("NO_COLOR").is_err() && atty::is(atty::Stream::Stdout);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("leave_server={level},audit_engine={level},tower_http=info,sqlx=warn").into()
    });

    if is_development && use_colors {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true)
                    .event_format(ColoredFormatter)
                    .fmt_fields(ColoredFieldFormatter),
            )
            .init();

        print_startup_banner();
    } else {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .init();
    }
}

fn print_startup_banner() {
    println!("{}", "╔══════════════════════════════════════════════════════════════╗".bright_cyan());
    println!("{}", "║                     LEAVESCHEDULER ENGINE                    ║".bright_cyan());
    println!("{}", "║                 Operation Log Monitoring API                 ║".bright_cyan());
    println!("{}", "╚══════════════════════════════════════════════════════════════╝".bright_cyan());
    println!();
}

// Custom colored formatter for development
struct ColoredFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ColoredFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();

        write!(
            writer,
            "{} ",
            chrono::Utc::now().format("%H:%M:%S%.3f").to_string().bright_black()
        )?;

        let level_str = match *metadata.level() {
            Level::TRACE => "TRACE".bright_purple(),
            Level::DEBUG => "DEBUG".bright_blue(),
            Level::INFO => " INFO".bright_green(),
            Level::WARN => " WARN".bright_yellow(),
            Level::ERROR => "ERROR".bright_red(),
        };
        write!(writer, "[{level_str}] ")?;

        // The fallback target carries dropped audit records; keep it visible
        let target = metadata.target();
        if target == audit_engine::FALLBACK_TARGET {
            write!(writer, "{:<15} ", target.bright_red())?;
        } else if let Some(module) = target.rsplit("::").next() {
            write!(writer, "{:<15} ", module.bright_cyan())?;
        }

        ctx.format_fields(writer.by_ref(), event)?;

        if *metadata.level() >= Level::DEBUG {
            if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
                let file_short = file.rsplit('/').next().unwrap_or(file);
                write!(
                    writer,
                    " {}",
                    format!("({file_short}:{line})").bright_black()
                )?;
            }
        }

        writeln!(writer)
    }
}

// Custom field formatter for colored output
struct ColoredFieldFormatter;

impl<'a> tracing_subscriber::fmt::FormatFields<'a> for ColoredFieldFormatter {
    fn format_fields<R: RecordFields>(
        &self,
        writer: tracing_subscriber::fmt::format::Writer<'a>,
        fields: R,
    ) -> std::fmt::Result {
        let mut visitor = ColoredFieldVisitor {
            writer,
            result: Ok(()),
        };
        fields.record(&mut visitor);
        visitor.result
    }
}

struct ColoredFieldVisitor<'a> {
    writer: tracing_subscriber::fmt::format::Writer<'a>,
    result: std::fmt::Result,
}

impl ColoredFieldVisitor<'_> {
    fn write_field(&mut self, name: &str, value: &str) {
        if self.result.is_err() {
            return;
        }
        self.result = if name == "message" {
            write!(self.writer, "{}", value.white().bold())
        } else {
            write!(self.writer, " {}={}", name.bright_yellow(), value.bright_white())
        };
    }
}

impl tracing::field::Visit for ColoredFieldVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.write_field(field.name(), &format!("{value:?}"));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.write_field(field.name(), value);
    }
}
