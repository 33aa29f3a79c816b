use citypulse_core::{CityCatalog, CityEntry};

use crate::cli::{CitiesArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

pub fn run(
    args: &CitiesArgs,
    catalog: &CityCatalog,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    println!("{}", render(args, catalog, format, pretty)?.trim_end());
    Ok(())
}

fn render(
    args: &CitiesArgs,
    catalog: &CityCatalog,
    format: OutputFormat,
    pretty: bool,
) -> Result<String, CliError> {
    let entries: Vec<CityEntry> = catalog
        .entries()
        .into_iter()
        .filter(|entry| !args.traffic_only || entry.coordinates.is_some())
        .collect();
    output::render_cities(&entries, format, pretty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traffic_only_keeps_cities_with_coordinates() {
        let catalog = CityCatalog::default();
        let args = CitiesArgs { traffic_only: true };

        let rendered = render(&args, &catalog, OutputFormat::Json, false).expect("json");
        let rows: Vec<serde_json::Value> = serde_json::from_str(&rendered).expect("array");

        assert_eq!(rows.len(), catalog.available_cities().len());
        assert!(rows.iter().all(|row| !row["coordinates"].is_null()));
    }

    #[test]
    fn full_listing_includes_population_only_cities() {
        let catalog = CityCatalog::default();
        let args = CitiesArgs {
            traffic_only: false,
        };

        let rendered = render(&args, &catalog, OutputFormat::Json, false).expect("json");
        let rows: Vec<serde_json::Value> = serde_json::from_str(&rendered).expect("array");

        let surat = rows
            .iter()
            .find(|row| row["name"] == "Surat")
            .expect("Surat is in the population table");
        assert!(surat["coordinates"].is_null());
        assert_eq!(surat["region"], "Gujarat");
    }
}
