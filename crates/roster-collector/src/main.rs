//! `rosterc` - CLI for roster-collector
//!
//! This binary provides the command-line interface for browsing the school
//! catalog, running a collection session, and exporting saved records.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;

use roster_collector::cli::session::{self, SessionOptions};
use roster_collector::cli::{
    write_schools, write_summary, Cli, Command, ConfigCommand, ExportCommand, StoreCommand,
    SummaryCommand,
};
use roster_collector::{
    init_logging, summarize, Config, DurableStore, ExportDocument, Session, SqliteStore,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Clusters => handle_clusters(&config),
        Command::Schools(cmd) => {
            let catalog = config.load_catalog()?;
            let schools = catalog.schools_of(&cmd.cluster)?;
            write_schools(&mut io::stdout().lock(), schools)?;
            Ok(())
        }
        Command::Session => handle_session(&config),
        Command::Summary(cmd) => handle_summary(&config, &cmd),
        Command::Export(cmd) => handle_export(&config, &cmd),
        Command::Store(cmd) => handle_store(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_store(config: &Config) -> Result<DurableStore<SqliteStore>> {
    let path = config.database_path();
    let backend = SqliteStore::open(&path)
        .with_context(|| format!("opening record store at {}", path.display()))?;
    Ok(DurableStore::open(backend, config.storage.records_key.clone())?)
}

fn handle_clusters(config: &Config) -> Result<()> {
    let catalog = config.load_catalog()?;
    let mut out = io::stdout().lock();
    for cluster in catalog.clusters() {
        writeln!(out, "{:<24} {:>3} school(s)", cluster.name, cluster.schools.len())?;
    }
    writeln!(out, "{} school(s) in total", catalog.school_count())?;
    Ok(())
}

fn handle_session(config: &Config) -> Result<()> {
    let catalog = config.load_catalog()?;
    let store = open_store(config)?;
    let mut session = Session::new(&catalog, store);

    let options = SessionOptions {
        export_dir: config.export_dir(),
        file_prefix: config.export.file_prefix.clone(),
    };
    session::run(
        &mut session,
        &options,
        io::stdin().lock(),
        &mut io::stdout().lock(),
    )?;
    Ok(())
}

fn handle_summary(config: &Config, cmd: &SummaryCommand) -> Result<()> {
    let catalog = config.load_catalog()?;
    let store = open_store(config)?;
    let summary = summarize(&catalog, &store);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let mut out = io::stdout().lock();
        write_summary(&mut out, &summary)?;
        writeln!(out)?;
        writeln!(
            out,
            "Database: {} ({} bytes)",
            store.backend().path().display(),
            store.backend().size_bytes()
        )?;
    }
    Ok(())
}

fn handle_export(config: &Config, cmd: &ExportCommand) -> Result<()> {
    let catalog = config.load_catalog()?;
    let store = open_store(config)?;
    let document = roster_collector::export_all(&catalog, &store)?;

    if cmd.stdout {
        let mut out = io::stdout().lock();
        out.write_all(document.as_bytes())?;
        out.flush()?;
        return Ok(());
    }

    let dir = cmd.output.clone().unwrap_or_else(|| config.export_dir());
    let file_name = ExportDocument::file_name(
        &config.export.file_prefix,
        chrono::Local::now().date_naive(),
    );
    let path = document.save_to(&dir, &file_name)?;
    println!("Exported {} row(s) to {}", document.rows(), path.display());
    Ok(())
}

fn handle_store(config: &Config, cmd: &StoreCommand) -> Result<()> {
    match cmd {
        StoreCommand::Clear { yes } => {
            if !yes {
                println!("This will delete every saved teacher record on this device.");
                println!("Export first, then use --yes to confirm.");
                return Ok(());
            }
            let mut store = open_store(config)?;
            let removed = store.clear()?;
            println!("Deleted {removed} saved record(s).");
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Records key:        {}", config.storage.records_key);
                println!();
                println!("[Catalog]");
                match &config.catalog.path {
                    Some(path) => println!("  Catalog file:       {}", path.display()),
                    None => println!("  Catalog file:       (bundled)"),
                }
                println!();
                println!("[Export]");
                println!("  Output directory:   {}", config.export_dir().display());
                println!("  File prefix:        {}", config.export.file_prefix);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)).and_then(|c| c.load_catalog().map(|_| c)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
