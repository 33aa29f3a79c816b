//! CLI argument definitions for CityPulse.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `snapshot` | Aggregate every source for one city |
//! | `cities` | List the cities known to the catalog |
//! | `interactive` | Read city names from stdin, last search wins |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--catalog` | built-in | JSON file overriding the lookup tables |
//! | `--live-energy` | `false` | Call the energy endpoints instead of estimating |
//! | `--seed` | random | Seed for the estimated figures |
//! | `--log-json` | `false` | Emit logs as JSON on stderr |
//!
//! # Examples
//!
//! ```bash
//! citypulse snapshot Mumbai --pretty
//! citypulse snapshot New Delhi --format table
//! citypulse cities --traffic-only
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// City dashboard metrics from several providers in one snapshot.
#[derive(Debug, Parser)]
#[command(
    name = "citypulse",
    version,
    about = "Aggregated weather, air quality, traffic, energy and waste metrics per city"
)]
pub struct Cli {
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// JSON file with city tables replacing the built-in ones.
    #[arg(long, global = true, value_name = "PATH")]
    pub catalog: Option<PathBuf>,

    /// Query the regional energy endpoints instead of estimating locally.
    #[arg(long, global = true, default_value_t = false)]
    pub live_energy: bool,

    /// Makes estimated figures reproducible.
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Aggregate every source for one city.
    Snapshot(SnapshotArgs),
    /// List the cities the catalog has data for.
    Cities(CitiesArgs),
    /// Read city names from stdin; each line supersedes the previous search.
    ///
    /// `:clear` drops the current result, `:quit` exits.
    Interactive,
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// City name; several words are joined with spaces.
    #[arg(required = true, num_args = 1..)]
    pub city: Vec<String>,
}

impl SnapshotArgs {
    pub fn city_name(&self) -> String {
        self.city.join(" ")
    }
}

#[derive(Debug, Args)]
pub struct CitiesArgs {
    /// Only cities with coordinates, i.e. live traffic support.
    #[arg(long, default_value_t = false)]
    pub traffic_only: bool,
}
