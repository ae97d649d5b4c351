#![deny(unused_must_use, clippy::dbg_macro)]

use std::{
    env,
    io::{self, Write},
    process::ExitCode,
};

use anyhow::Context;
use arguments::SqldeltaArguments;
use clap::Parser;
use log::{debug, info};
use sqldelta::{
    config::{load_config, CONFIG_FILENAME, DEFAULT_DIALECT},
    generate, Migration, SQLDELTA_VERSION,
};
use util::{read_schema, replace_file};

mod arguments;
mod util;

pub const DRY_RUN_MARKER: &str = "=== DRY RUN ===";

/// The dialect token from the command line, else the config file, else the
/// default. A flag is validated by the library; a configured dialect is
/// checked here so the error names the config file.
fn resolve_dialect(flag: Option<String>) -> anyhow::Result<String> {
    if let Some(dialect) = flag {
        return Ok(dialect);
    }
    let directory = env::current_dir()?;
    let config = load_config(&directory)?;
    let configured = config
        .dialect()
        .with_context(|| format!("Invalid dialect in {}", CONFIG_FILENAME))?;
    Ok(configured
        .map(|dialect| dialect.name())
        .unwrap_or(DEFAULT_DIALECT)
        .to_string())
}

fn print_dry_run(migration: &Migration, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}", DRY_RUN_MARKER)?;
    writeln!(out)?;
    for line in migration.changes.summary() {
        writeln!(out, "{}", line)?;
    }
    if !migration.is_empty() {
        writeln!(out)?;
    }
    out.write_all(migration.document.as_bytes())
}

fn run(args: SqldeltaArguments) -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(args.log_level.into())
        .init()?;
    debug!("sqldelta Version: {}", SQLDELTA_VERSION);

    let dialect = resolve_dialect(args.dialect)?;
    let old_sql = read_schema(&args.old)?;
    let new_sql = read_schema(&args.new)?;
    let migration = generate(&old_sql, &new_sql, &dialect)?;
    if migration.is_empty() {
        info!("No changes detected between schemas");
    }

    let mut stdout = io::stdout().lock();
    if args.dry_run {
        print_dry_run(&migration, &mut stdout)?;
    } else if let Some(output) = args.output {
        replace_file(&migration.document, &output)
            .with_context(|| format!("could not write {}", output.display()))?;
        info!("Migration written to {}", output.display());
    } else {
        stdout.write_all(migration.document.as_bytes())?;
    }
    stdout.flush()?;

    Ok(())
}

fn main() -> ExitCode {
    // Usage errors exit with 1 rather than clap's 2; help and version exit 0.
    let args = match SqldeltaArguments::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
