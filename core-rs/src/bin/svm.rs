//! svm - simple virtuoso migrate
//!
//! Command-line front end of the migration engine

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use colored::Colorize;
use std::io::{self, Write};
use std::path::PathBuf;

use tbox_migrate::{
    ConfigValues, ConsoleLog, Destination, GitVersionSource, HttpEndpoint, IsqlClient,
    MigrateConfig, Migrator, RunAfterCommand, RunOptions, ScpTransfer, ASK_ME,
    DEFAULT_CONFIG_FILE,
};

#[derive(Parser)]
#[command(name = "svm")]
#[command(version = tbox_migrate::VERSION)]
#[command(about = "Schema (T-BOX) migrations for Virtuoso graphs", long_about = None)]
struct Cli {
    /// Config file
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Environment section of the config file to apply
    #[arg(long = "env", alias = "environment")]
    env: Option<String>,

    /// 0: no log, 1: migration log, 2: statement execution output
    #[arg(short = 'l', long = "log-level")]
    log_level: Option<u8>,

    /// Directory for execution log files
    #[arg(long = "log-dir")]
    log_dir: Option<PathBuf>,

    /// Git tag to migrate to (latest tag when omitted)
    #[arg(short = 'g', long = "git")]
    git: Option<String>,

    /// Migrate to the ontology in this turtle file
    #[arg(short = 'f', long = "file", conflicts_with = "git")]
    file: Option<PathBuf>,

    /// Load a turtle file, or every .ttl file in a directory
    #[arg(short = 'a', long = "add", conflicts_with_all = ["git", "file"])]
    add: Option<PathBuf>,

    /// Colored output
    #[arg(long)]
    color: bool,

    /// Print executed statements
    #[arg(long = "showsparql")]
    show_sparql: bool,

    /// Print statements without executing them
    #[arg(long = "showsparqlonly")]
    show_sparql_only: bool,

    #[arg(long = "db-user")]
    db_user: Option<String>,

    #[arg(long = "db-password")]
    db_password: Option<String>,

    #[arg(long = "host-user")]
    host_user: Option<String>,

    #[arg(long = "host-password")]
    host_password: Option<String>,

    #[arg(long = "db-host")]
    db_host: Option<String>,

    #[arg(long = "db-port")]
    db_port: Option<u16>,

    #[arg(long = "db-endpoint")]
    db_endpoint: Option<String>,

    #[arg(long = "db-graph")]
    db_graph: Option<String>,

    #[arg(long = "db-ontology")]
    db_ontology: Option<String>,

    /// Migrations repository (a `:`-separated list uses the first entry)
    #[arg(long = "db-migrations-dir")]
    db_migrations_dir: Option<String>,

    /// Directory the store may load files from
    #[arg(long = "virtuoso-dirs-allowed")]
    virtuoso_dirs_allowed: Option<String>,

    /// Executable run after every successful operation
    #[arg(long = "run-after")]
    run_after: Option<PathBuf>,

    /// Diagnostic verbosity on stderr (-v, -vv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> ConfigValues {
        ConfigValues {
            database_host: self.db_host.clone(),
            database_port: self.db_port,
            database_user: self.db_user.clone(),
            database_password: self.db_password.clone(),
            database_endpoint: self.db_endpoint.clone(),
            database_graph: self.db_graph.clone(),
            database_ontology: self.db_ontology.clone(),
            database_migrations_dir: self.db_migrations_dir.clone(),
            migration_graph: None,
            host_user: self.host_user.clone(),
            host_password: self.host_password.clone(),
            virtuoso_dirs_allowed: self.virtuoso_dirs_allowed.clone(),
            log_dir: self.log_dir.as_ref().map(|p| p.display().to_string()),
            log_level: self.log_level,
            run_after: self.run_after.as_ref().map(|p| p.display().to_string()),
        }
    }

    fn options(&self) -> RunOptions {
        let destination = match (&self.file, &self.git) {
            (Some(file), _) => Destination::File(file.clone()),
            (None, Some(tag)) => Destination::Tag(tag.clone()),
            (None, None) => Destination::Latest,
        };

        RunOptions {
            destination,
            load: self.add.clone(),
            show_sparql: self.show_sparql,
            show_sparql_only: self.show_sparql_only,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        let message = format!("[ERROR] {:#}", e);
        if cli.color {
            eprintln!("{}", message.red());
        } else {
            eprintln!("{}", message);
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = MigrateConfig::load(&cli.config, cli.env.as_deref(), &cli.overrides())
        .with_context(|| format!("reading {}", cli.config.display()))?;

    if config.database_password == ASK_ME {
        config.database_password =
            ask_password("virtuoso (DATABASE)", &config.database_user, &config.database_host)?;
    }

    if cli.add.is_some()
        && !config.copies_locally()
        && config.host_password.as_deref() == Some(ASK_ME)
    {
        let user = config.host_user.clone().unwrap_or_default();
        config.host_password = Some(ask_password("virtuoso (HOST)", &user, &config.database_host)?);
    }

    let mut log = ConsoleLog::new(config.log_level, cli.color);
    if let Some(dir) = &config.log_dir {
        log = log
            .with_log_dir(dir)
            .with_context(|| format!("opening log directory {}", dir.display()))?;
    }

    let client = IsqlClient::new(
        config.database_user.clone(),
        config.database_password.clone(),
        config.database_host.clone(),
        config.database_port,
    );
    let endpoint = HttpEndpoint::new(config.database_endpoint.clone());
    let versions = GitVersionSource::new(
        config.database_migrations_dir.clone(),
        config.database_ontology.clone(),
    );
    let transfer = ScpTransfer::new(
        config.database_host.clone(),
        config.host_user.clone(),
        config.host_password.clone(),
    );

    let run_after = config.run_after.as_ref().map(RunAfterCommand::new);

    let mut migrator =
        Migrator::new(&config, &client, &endpoint, &versions, &log).with_transfer(&transfer);
    if let Some(hook) = &run_after {
        migrator = migrator.with_run_after(hook);
    }
    migrator.execute(&cli.options())?;

    Ok(())
}

fn ask_password(target: &str, user: &str, host: &str) -> Result<String> {
    println!(
        "\nPlease inform password to connect to {} \"{}@{}\"",
        target, user, host
    );
    print!("Password: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("reading password from stdin")?;
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}
