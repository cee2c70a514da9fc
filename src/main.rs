use std::path::PathBuf;

use clap::Parser;
use tenant_reports::{
    config::ReportsConfig,
    db,
    delivery::Sinks,
    observability,
    pipeline::{Pipeline, ReportKind, execute},
};

/// CLI arguments for the tenant report runner
#[derive(Parser, Debug)]
#[command(version, about = "Per-tenant metrics reports", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config file
    #[arg(short, long, global = true, default_value = "tenant-reports.toml")]
    config: PathBuf,

    /// Render reports to stdout instead of delivering them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Skip failed accounts (true) or stop at the first one (false).
    /// Overrides `[pipeline] continue_on_error`.
    #[arg(long, global = true)]
    continue_on_error: Option<bool>,
}

#[derive(clap::Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Audience refresh counts per account
    Audience,
    /// Hours since the newest order and customer per account
    SyncLag,
    /// Failed-delivery error codes per channel for the past 24 hours
    ChannelErrors,
    /// Run every report in turn
    All,
    /// Validate the configuration file and exit
    CheckConfig,
}

impl Command {
    fn reports(self) -> &'static [ReportKind] {
        match self {
            Command::Audience => &[ReportKind::Audience],
            Command::SyncLag => &[ReportKind::SyncLag],
            Command::ChannelErrors => &[ReportKind::ChannelErrors],
            Command::All => &ReportKind::ALL,
            Command::CheckConfig => &[],
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let config = match ReportsConfig::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!(
                "Failed to load config from {}: {}",
                args.config.display(),
                e
            );
            std::process::exit(1);
        }
    };

    if args.command == Command::CheckConfig {
        println!(
            "Configuration OK: {} accounts, chat sink {}, spreadsheet sink {}",
            config.roster.accounts.len(),
            if config.chat.is_some() { "configured" } else { "not configured" },
            if config.spreadsheet.is_some() { "configured" } else { "not configured" },
        );
        std::process::exit(0);
    }

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Failed to initialize tracing: {}", e);
        std::process::exit(1);
    }

    tracing::info!(
        config_file = %args.config.display(),
        command = ?args.command,
        dry_run = args.dry_run,
        "Starting tenant reports"
    );

    let sinks = if args.dry_run {
        Sinks::default()
    } else {
        match Sinks::from_config(&config).await {
            Ok(sinks) => sinks,
            Err(e) => {
                tracing::error!(error = %e, "Failed to set up delivery sinks");
                std::process::exit(1);
            }
        }
    };
    if !config.has_sinks() && !args.dry_run {
        tracing::warn!("No delivery sink configured, reports will only be logged");
    }

    let mut store = match db::connect(&config.database).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to metric store");
            std::process::exit(1);
        }
    };

    let pipeline = Pipeline::new(config.roster.accounts.clone(), sinks)
        .with_continue_on_error(
            args.continue_on_error
                .unwrap_or(config.pipeline.continue_on_error),
        )
        .with_dry_run(args.dry_run);

    let execution = execute(&pipeline, &mut store, args.command.reports()).await;

    if args.dry_run {
        for summary in &execution.summaries {
            println!("{}\n", summary.rendered.chat_text());
        }
    }

    std::process::exit(execution.outcome.exit_code());
}
