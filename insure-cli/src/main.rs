//! Insure CLI - offline tooling over the policy data files

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use insure_core::auth::builtin_api_keys;
use insure_core::{check_store, KeyStatus, PolicyProduct, PolicyStatus, PolicyStore};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "insure")]
#[command(about = "Insure - inspect and check insurance policy data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding policies.json and products.json
    #[arg(short, long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Report integrity problems in the data files
    Check,

    /// Show one policy with its product
    Show {
        /// Policy id, e.g. pol_001
        id: String,
    },

    /// Find policies whose customer name contains NAME (case-insensitive)
    Search {
        /// Part of a customer name
        name: String,
    },

    /// List the compiled-in API keys
    Keys,

    /// Print the id the next created policy would receive
    NextId,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("insure=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Check => check_command(&cli.data_dir, cli.format),
        Commands::Show { id } => show_command(&cli.data_dir, &id, cli.format),
        Commands::Search { name } => search_command(&cli.data_dir, &name, cli.format),
        Commands::Keys => keys_command(cli.format),
        Commands::NextId => next_id_command(&cli.data_dir),
    }
}

fn load_store(data_dir: &Path) -> Result<PolicyStore> {
    PolicyStore::load(data_dir)
        .with_context(|| format!("Failed to load data from {}", data_dir.display()))
}

fn check_command(data_dir: &Path, format: Format) -> Result<()> {
    let store = load_store(data_dir)?;
    let problems = check_store(&store);

    match format {
        Format::Json => {
            let messages: Vec<String> = problems.iter().map(|p| p.to_string()).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "policies": store.policy_count(),
                    "products": store.product_count(),
                    "problems": messages,
                }))?
            );
        }
        Format::Text => {
            println!("{} Checking {}...", "→".blue(), data_dir.display());
            println!("  Policies: {}", store.policy_count());
            println!("  Products: {}", store.product_count());

            if problems.is_empty() {
                println!("{} Data is consistent", "✓".green());
            } else {
                println!("{} Found {} problem(s):", "✗".red(), problems.len());
                for problem in &problems {
                    println!("  {}", problem);
                }
            }
        }
    }

    if !problems.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn status_label(status: PolicyStatus) -> ColoredString {
    match status {
        PolicyStatus::Active => status.as_str().green(),
        PolicyStatus::Expired => status.as_str().yellow(),
        PolicyStatus::Cancelled => status.as_str().red(),
    }
}

fn print_policy(found: &PolicyProduct) {
    let policy = &found.policy;
    println!("\n{} Policy {}", "═".blue().bold(), policy.id.bold());
    println!("{} Customer: {}", "▸".blue(), policy.customer_name);
    println!("{} Status: {}", "▸".blue(), status_label(policy.status));
    println!("{} Cover: {} to {}", "▸".blue(), policy.start_date, policy.end_date);
    println!("{} Premium: {:.2}", "▸".blue(), policy.premium);
    println!(
        "{} Product: {} ({}, {})",
        "▸".blue(),
        found.product.name,
        found.product.id,
        found.product.category
    );
}

fn show_command(data_dir: &Path, id: &str, format: Format) -> Result<()> {
    let store = load_store(data_dir)?;

    let found = match store.find_policy_product_by_id(id)? {
        Some(found) => found,
        None => bail!("Policy with ID {} not found", id),
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&found)?),
        Format::Text => print_policy(&found),
    }
    Ok(())
}

fn search_command(data_dir: &Path, name: &str, format: Format) -> Result<()> {
    if name.is_empty() {
        bail!("Customer name is required");
    }

    let store = load_store(data_dir)?;
    let results = store
        .find_policies_by_customer_name(name)
        .into_iter()
        .map(|policy| store.resolve(policy))
        .collect::<insure_core::Result<Vec<_>>>()?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        Format::Text => {
            println!("{} {} match(es) for \"{}\"", "→".blue(), results.len(), name);
            for found in &results {
                print_policy(found);
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyRow {
    key: String,
    status: String,
    expires_at: String,
    permissions: Vec<String>,
}

fn keys_command(format: Format) -> Result<()> {
    let now = Utc::now();
    let rows: Vec<KeyRow> = builtin_api_keys()
        .iter()
        .map(|key| KeyRow {
            key: key.key.clone(),
            status: KeyStatus::of(key, now).to_string(),
            expires_at: key.expires_at.clone(),
            permissions: key.permissions.iter().map(|p| p.to_string()).collect(),
        })
        .collect();

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        Format::Text => {
            println!("\n{} API Keys", "═".blue().bold());
            for row in &rows {
                let status = match row.status.as_str() {
                    "active" => row.status.green(),
                    "expired" => row.status.yellow(),
                    _ => row.status.red(),
                };
                println!(
                    "{} {} [{}] expires {} perms: {}",
                    "▸".blue(),
                    row.key,
                    status,
                    row.expires_at,
                    row.permissions.join(",")
                );
            }
        }
    }
    Ok(())
}

fn next_id_command(data_dir: &Path) -> Result<()> {
    let store = load_store(data_dir)?;
    println!("{}", store.generate_policy_id());
    Ok(())
}
