//! # querystate
//!
//! Decode and rewrite query strings against a form manifest.
//!
//! ## Usage
//!
//! ```bash
//! # Print every field of a query string as JSON
//! querystate decode --form search.toml "tags[]=react&page=150"
//!
//! # Set one field and print the rebuilt query string
//! querystate set --form search.toml "page=3" tags '["a","b"]'
//!
//! # Fill in missing defaults
//! querystate defaults --form search.toml "page=3"
//!
//! # Check a manifest and list its fields
//! querystate check --form search.toml
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{fmt, EnvFilter};

use querystate_cli::{commands, error::CliError};

#[derive(Parser)]
#[command(name = "querystate")]
#[command(author, version, about = "Decode and rewrite query strings against a form manifest", long_about = None)]
struct Cli {
    /// Log decode and rebuild decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FormArgs {
    /// Form manifest (TOML)
    #[arg(short, long, default_value = "form.toml")]
    form: PathBuf,

    /// Evaluation instant for relative date checks (RFC 3339); defaults to now
    #[arg(long)]
    now: Option<DateTime<Utc>>,
}

impl FormArgs {
    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decode every field of a query string
    Decode {
        #[command(flatten)]
        args: FormArgs,

        /// Query string, with or without the leading '?'
        #[arg(default_value = "")]
        query: String,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Set one field and print the rebuilt query string
    Set {
        #[command(flatten)]
        args: FormArgs,

        /// Current query string
        query: String,

        /// Field key
        key: String,

        /// New value as JSON; bare text is taken as a string
        value: String,
    },

    /// Fill in defaults missing from a query string
    Defaults {
        #[command(flatten)]
        args: FormArgs,

        /// Current query string
        #[arg(default_value = "")]
        query: String,
    },

    /// Check a form manifest and list its fields
    Check {
        #[command(flatten)]
        args: FormArgs,

        /// Print the field list as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&e);
            if e.is_validation() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Decode {
            args,
            query,
            pretty,
        } => cmd_decode(args, &query, pretty),
        Commands::Set {
            args,
            query,
            key,
            value,
        } => cmd_set(args, &query, &key, &value),
        Commands::Defaults { args, query } => cmd_defaults(args, &query),
        Commands::Check { args, json } => cmd_check(args, json),
    }
}

fn cmd_decode(args: FormArgs, query: &str, pretty: bool) -> Result<(), CliError> {
    let now = args.now();
    let form = commands::load_form(&args.form, now)?;
    let values = commands::decode(&form, query, now);
    let output = if pretty {
        serde_json::to_string_pretty(&values)?
    } else {
        serde_json::to_string(&values)?
    };
    println!("{}", output);
    Ok(())
}

fn cmd_set(args: FormArgs, query: &str, key: &str, value: &str) -> Result<(), CliError> {
    let now = args.now();
    let form = commands::load_form(&args.form, now)?;
    let next = commands::set(&form, query, key, value, now)?;
    println!("{}", next);
    Ok(())
}

fn cmd_defaults(args: FormArgs, query: &str) -> Result<(), CliError> {
    let now = args.now();
    let form = commands::load_form(&args.form, now)?;
    println!("{}", commands::defaults(&form, query, now));
    Ok(())
}

fn cmd_check(args: FormArgs, json: bool) -> Result<(), CliError> {
    let now = args.now();
    let form = commands::load_form(&args.form, now)?;
    let fields = commands::check(&form, now);

    if json {
        println!("{}", serde_json::to_string_pretty(&fields)?);
        return Ok(());
    }

    println!(
        "{} {} ({} field(s))",
        "✓".green(),
        args.form.display(),
        fields.len().to_string().green()
    );
    for field in &fields {
        println!(
            "  {} {} {} default={} via {}",
            field.key.cyan(),
            field.base_type,
            field.shape,
            serde_json::to_string(&field.default)?.yellow(),
            field.setter.dimmed()
        );
    }
    Ok(())
}

/// Print an error with formatting.
fn print_error(error: &CliError) {
    eprintln!("{} {}", "Error:".red().bold(), error);
}
