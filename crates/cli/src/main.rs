//! SiteKit command-line management tool.
//!
//! Provides subcommands for generating and validating configuration files,
//! migrating the database, creating accounts, inspecting users and groups,
//! and trying out locale-prefix rewriting.

mod accounts;
mod groups;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use sitekit_core::config::AppConfig;
use sitekit_core::db::{schema, Database};
use sitekit_core::i18n::LocaleSet;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// SiteKit command-line management tool.
#[derive(Parser, Debug)]
#[command(
    name = "sitekit",
    version,
    about = "Manage the accounts, database and settings of a SiteKit site"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "./sitekit.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./sitekit.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,

    /// Create the database (if needed) and apply pending migrations.
    Migrate,

    /// Create a regular user.
    CreateUser(accounts::CreateArgs),

    /// Create a superuser (staff, superuser and active).
    CreateSuperuser(accounts::CreateArgs),

    /// Inspect user accounts.
    Users {
        #[command(subcommand)]
        action: accounts::UsersAction,
    },

    /// Manage groups and memberships.
    Groups {
        #[command(subcommand)]
        action: groups::GroupsAction,
    },

    /// Rewrite the language prefix of a URL path.
    SwitchLocale {
        /// Path starting with "/", optionally with a query string.
        path: String,

        /// Target language code.
        lang: String,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    // Minimal logging for CLI
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => cmd_init(&output),
        Commands::Validate => cmd_validate(&cli.config),
        Commands::SwitchLocale { path, lang } => {
            let config = load_config(&cli.config)?;
            cmd_switch_locale(&config, &path, &lang)
        }
        command => {
            // Everything else needs the database
            let config = load_config(&cli.config)?;
            let db = open_database(&config)?;

            match command {
                Commands::Migrate => cmd_migrate(&config, &db),
                Commands::CreateUser(args) => accounts::cmd_create(&config, &db, args, false),
                Commands::CreateSuperuser(args) => accounts::cmd_create(&config, &db, args, true),
                Commands::Users { action } => accounts::cmd_users(&config, &db, action),
                Commands::Groups { action } => groups::cmd_groups(&db, action),
                Commands::Init { .. } | Commands::Validate | Commands::SwitchLocale { .. } => {
                    unreachable!("handled above")
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load_and_resolve(path).context("failed to load configuration")
}

fn open_database(config: &AppConfig) -> Result<Database> {
    let path = config.database_path();
    debug!(path = %path.display(), "opening database");
    Database::open(&path).context("failed to open database")
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, AppConfig::default_toml()).context("failed to write config file")?;

    println!("{}", style::success(&format!("Default configuration written to {}", output.display())));
    println!();
    println!("Next steps:");
    println!("  1. Edit the languages, hosts and data directory");
    println!("  2. Export the secret key variable (SITEKIT_SECRET_KEY by default)");
    println!("  3. Create an admin: sitekit create-superuser --config {} <email>", output.display());
    println!("  4. Start the server: sitekit-server --config {}", output.display());

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    match config.resolve_env_vars() {
        Ok(()) => println!("  [OK] Environment variable references resolved"),
        Err(e) => println!("  {}", style::warn(&format!("{}", e))),
    }

    match config.validate() {
        Ok(()) => println!("  [OK] All fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    let languages: Vec<String> = config
        .i18n
        .languages
        .iter()
        .map(|l| format!("{} ({})", l.code, l.name))
        .collect();

    println!();
    println!("Configuration summary:");
    println!("  Listen        : {}", config.server.listen);
    println!("  Debug         : {}", config.server.debug);
    println!("  Allowed hosts : {}", config.server.allowed_hosts.join(", "));
    println!(
        "  Secret key    : {}",
        if config.server.secret_key.is_some() {
            "set"
        } else {
            "NOT SET"
        }
    );
    println!("  Database      : {}", config.database_path().display());
    println!("  Languages     : {}", languages.join(", "));
    println!("  Default lang  : {}", config.i18n.default_language);
    println!("  Time zone     : {}", config.i18n.time_zone);
    println!("  Validators    : {}", config.auth.password_validators.join(", "));
    println!();
    println!("{}", style::success("Configuration is valid."));

    Ok(())
}

fn cmd_migrate(config: &AppConfig, db: &Database) -> Result<()> {
    let version = schema::get_schema_version(&db.conn()).context("failed to read schema version")?;
    println!(
        "{}",
        style::success(&format!(
            "Database {} is at schema version {}",
            config.database_path().display(),
            version
        ))
    );
    Ok(())
}

fn cmd_switch_locale(config: &AppConfig, path: &str, lang: &str) -> Result<()> {
    let locales = LocaleSet::from_config(&config.i18n).context("invalid language settings")?;
    let switched = locales
        .switch(path, lang)
        .with_context(|| format!("cannot switch '{}' to '{}'", path, lang))?;
    println!("{}", switched);
    Ok(())
}
