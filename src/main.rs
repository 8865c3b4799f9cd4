//! agedist - age-distribution summaries from spreadsheets
//!
//! A CLI tool that reads the age column of a spreadsheet, groups the ages
//! into a frequency distribution and reports it together with the average
//! age. Until a spreadsheet is loaded the built-in sample set is used.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, config, writing the report)
//!   2 - The spreadsheet given on the command line was rejected; the
//!       report was produced from the previous source

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod upload;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use models::Report;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;
use upload::{Session, UploadOptions};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("agedist v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    // Run and exit with the resulting code
    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .agedist.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Initialize logging at the given level. Logs go to stderr so they never
/// mix with a report written to stdout.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
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

    Ok(Config::load_default()?.unwrap_or_default())
}

/// Run the load-and-report workflow. Returns the exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let options = UploadOptions::from_config(&config.source, !args.quiet);
    let mut session = Session::new(options);
    let exit_code = load_initial(&mut session, args.file.as_deref()).await;

    let mut stdout = std::io::stdout();
    if args.interactive {
        let stdin = BufReader::new(tokio::io::stdin());
        run_interactive(&mut session, &config, stdin, &mut stdout).await?;
    } else {
        emit_report(&session, &config, &mut stdout)?;
    }

    Ok(exit_code)
}

/// Upload the command-line file, if any. Returns the exit code for the
/// run: 2 when the file was rejected, 0 otherwise.
async fn load_initial(session: &mut Session, path: Option<&Path>) -> i32 {
    let Some(path) = path else {
        return 0;
    };

    if upload_file(session, path).await {
        0
    } else {
        2
    }
}

/// Upload one file into the session, reporting the outcome to the user.
/// Returns `false` when the file was rejected.
async fn upload_file(session: &mut Session, path: &Path) -> bool {
    let file_name = upload::session::display_name(path);
    let result = session
        .upload(path)
        .await
        .map(|active| active.samples().len());

    match result {
        Ok(count) => {
            eprintln!("✅ Loaded {} ages from {}", count, file_name);
            true
        }
        Err(e) => {
            eprintln!("\n⛔ Could not use {}: {}", file_name, e);
            eprintln!("   Still showing: {}\n", session.active());
            false
        }
    }
}

/// Read file paths from `input` and re-report after every upload attempt.
async fn run_interactive<R, W>(
    session: &mut Session,
    config: &Config,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    emit_report(session, config, out)?;

    let mut lines = input.lines();

    loop {
        eprint!("file> ");
        std::io::stderr().flush().ok();

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "quit" | "exit" => break,
            path => {
                upload_file(session, Path::new(path)).await;
                emit_report(session, config, out)?;
            }
        }
    }

    info!("Session ended on {}", session.active());
    Ok(())
}

/// Aggregate the active source and write the report to the configured
/// output file, or to `out` when none is set.
fn emit_report<W: Write>(session: &Session, config: &Config, out: &mut W) -> Result<()> {
    let distribution = Report::new(&config.report.title, session.active(), session.summary());
    let content = report::render(&distribution, config.general.format, &config.report)?;

    match config.general.output {
        Some(ref path) => {
            report::write_report(&content, path)?;
            eprintln!("📝 Report saved to: {}", path.display());
        }
        None => {
            out.write_all(content.as_bytes())
                .and_then(|_| out.flush())
                .context("Failed to write report")?;
        }
    }

    Ok(())
}
