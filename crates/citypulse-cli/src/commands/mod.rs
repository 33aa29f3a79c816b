mod cities;
mod interactive;
mod snapshot;

use std::sync::Arc;

use citypulse_core::{Aggregator, CityCatalog, CityPulseConfig};

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    let config = apply_flags(cli, CityPulseConfig::from_env()?);

    match &cli.command {
        Command::Snapshot(args) => {
            let aggregator = build_aggregator(cli, config)?;
            snapshot::run(args, &aggregator, cli.format, cli.pretty).await
        }
        Command::Cities(args) => {
            let catalog = load_catalog(&config)?;
            cities::run(args, &catalog, cli.format, cli.pretty)
        }
        Command::Interactive => {
            let aggregator = Arc::new(build_aggregator(cli, config)?);
            interactive::run(aggregator, cli.format, cli.pretty).await
        }
    }
}

/// Command-line flags win over the environment.
fn apply_flags(cli: &Cli, mut config: CityPulseConfig) -> CityPulseConfig {
    if cli.live_energy {
        config = config.with_energy_fast_fail(false);
    }
    if let Some(path) = &cli.catalog {
        config = config.with_catalog_path(path.clone());
    }
    config
}

fn build_aggregator(cli: &Cli, config: CityPulseConfig) -> Result<Aggregator, CliError> {
    let mut builder = Aggregator::builder(config);
    if let Some(seed) = cli.seed {
        builder = builder.with_seed(seed);
    }
    Ok(builder.build()?)
}

fn load_catalog(config: &CityPulseConfig) -> Result<CityCatalog, CliError> {
    match &config.catalog_path {
        Some(path) => Ok(CityCatalog::load(path)?),
        None => Ok(CityCatalog::default()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;

    use super::*;

    #[test]
    fn flags_override_environment() {
        let cli = Cli::try_parse_from([
            "citypulse",
            "--live-energy",
            "--catalog",
            "/tmp/cities.json",
            "cities",
        ])
        .expect("valid arguments");

        let config = apply_flags(&cli, CityPulseConfig::default());

        assert!(!config.energy_fast_fail);
        assert_eq!(
            config.catalog_path.as_deref(),
            Some(std::path::Path::new("/tmp/cities.json"))
        );
    }

    #[test]
    fn catalog_file_replaces_built_in_tables() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"coordinates": {{"Atlantis": {{"lat": 1.5, "lon": 2.5}}}}}}"#
        )
        .expect("write catalog");
        let config = CityPulseConfig::default().with_catalog_path(file.path());

        let catalog = load_catalog(&config).expect("valid catalog");

        assert_eq!(catalog.available_cities(), vec!["Atlantis"]);
    }

    #[test]
    fn missing_catalog_file_is_a_usage_error() {
        let config = CityPulseConfig::default().with_catalog_path("/nonexistent/cities.json");

        let error = load_catalog(&config).expect_err("missing file");

        assert_eq!(error.exit_code(), 2);
    }
}
