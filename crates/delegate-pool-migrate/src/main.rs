//! pool-migrate: convert a legacy runner pool file to the current schema

use anyhow::Result;
use clap::Parser;
use delegate_common::defaults::{DEFAULT_LEGACY_POOL_FILE, MIGRATED_POOL_FILE};
use delegate_pool_migrate::{MigrateOptions, migrate};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pool-migrate")]
#[command(about = "Convert a legacy runner pool file to the current pool file schema")]
#[command(version)]
struct Args {
    /// Legacy pool file (one YAML document per pool)
    #[arg(default_value = DEFAULT_LEGACY_POOL_FILE)]
    input: PathBuf,

    /// Output file, overwritten
    #[arg(short, long, default_value = MIGRATED_POOL_FILE)]
    output: PathBuf,

    /// Print the converted file instead of writing it
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    if let Err(e) = run() {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let options = MigrateOptions {
        output: args.output,
        dry_run: args.dry_run,
    };

    let summary = migrate(&args.input, &options)?;
    if summary.written {
        println!(
            "Migrated {} pool(s) to {}",
            summary.entries,
            summary.output.display()
        );
    } else {
        print!("{}", summary.document);
    }

    Ok(())
}
