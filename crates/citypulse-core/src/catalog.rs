//! Immutable lookup tables keyed by city or region name.
//!
//! The built-in tables cover the cities the dashboard knows about. A JSON
//! file can replace any table wholesale; tables it omits keep their built-in
//! contents.
//!
//! ```json
//! {
//!   "coordinates": { "Springfield": { "lat": 39.8, "lon": -89.6 } },
//!   "populations_thousands": { "Springfield": 114 }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::Coordinates;
use crate::error::CatalogError;

/// Typical traffic for a city, used when live flow data is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficPattern {
    pub avg_speed_kmh: f64,
    pub free_flow_speed_kmh: f64,
    pub incidents: u32,
}

impl TrafficPattern {
    pub const fn new(avg_speed_kmh: f64, free_flow_speed_kmh: f64, incidents: u32) -> Self {
        Self {
            avg_speed_kmh,
            free_flow_speed_kmh,
            incidents,
        }
    }
}

/// Population (millions) and daily waste generated per person (kg).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WasteProfile {
    pub population_millions: f64,
    pub kg_per_person: f64,
}

impl WasteProfile {
    pub const fn new(population_millions: f64, kg_per_person: f64) -> Self {
        Self {
            population_millions,
            kg_per_person,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityCatalog {
    pub coordinates: BTreeMap<String, Coordinates>,
    pub traffic_patterns: BTreeMap<String, TrafficPattern>,
    pub default_traffic_pattern: TrafficPattern,
    pub populations_thousands: BTreeMap<String, f64>,
    pub regions: BTreeMap<String, String>,
    pub per_capita_kwh: BTreeMap<String, f64>,
    pub default_per_capita_kwh: f64,
    pub waste_profiles: BTreeMap<String, WasteProfile>,
    pub default_waste_profile: WasteProfile,
}

/// Catalog data for one city, as listed by the `cities` command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityEntry {
    pub name: String,
    pub coordinates: Option<Coordinates>,
    pub population_thousands: Option<f64>,
    pub region: Option<String>,
    pub traffic_pattern: Option<TrafficPattern>,
    pub waste_profile: Option<WasteProfile>,
}

impl CityCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn coordinates(&self, city: &str) -> Option<Coordinates> {
        lookup(&self.coordinates, city).copied()
    }

    /// Pattern for `city`, or `None` when only the default pattern applies.
    pub fn traffic_pattern(&self, city: &str) -> Option<TrafficPattern> {
        lookup(&self.traffic_patterns, city).copied()
    }

    pub fn traffic_pattern_or_default(&self, city: &str) -> TrafficPattern {
        self.traffic_pattern(city)
            .unwrap_or(self.default_traffic_pattern)
    }

    pub fn population_thousands(&self, city: &str) -> Option<f64> {
        lookup(&self.populations_thousands, city).copied()
    }

    pub fn region(&self, city: &str) -> Option<&str> {
        lookup(&self.regions, city).map(String::as_str)
    }

    pub fn known_per_capita_kwh(&self, region: &str) -> Option<f64> {
        lookup(&self.per_capita_kwh, region).copied()
    }

    pub fn per_capita_kwh(&self, region: &str) -> f64 {
        self.known_per_capita_kwh(region)
            .unwrap_or(self.default_per_capita_kwh)
    }

    pub fn waste_profile(&self, city: &str) -> Option<WasteProfile> {
        lookup(&self.waste_profiles, city).copied()
    }

    /// Cities with known coordinates, i.e. the ones live traffic can serve.
    pub fn available_cities(&self) -> Vec<&str> {
        self.coordinates.keys().map(String::as_str).collect()
    }

    /// Every city named by any table, with whatever each table knows about it.
    pub fn entries(&self) -> Vec<CityEntry> {
        let names: BTreeSet<&String> = self
            .coordinates
            .keys()
            .chain(self.traffic_patterns.keys())
            .chain(self.populations_thousands.keys())
            .chain(self.regions.keys())
            .chain(self.waste_profiles.keys())
            .collect();

        names
            .into_iter()
            .map(|name| CityEntry {
                name: name.clone(),
                coordinates: self.coordinates.get(name).copied(),
                population_thousands: self.populations_thousands.get(name).copied(),
                region: self.regions.get(name).cloned(),
                traffic_pattern: self.traffic_patterns.get(name).copied(),
                waste_profile: self.waste_profiles.get(name).copied(),
            })
            .collect()
    }
}

/// Exact key first, then a case-insensitive scan.
fn lookup<'a, V>(table: &'a BTreeMap<String, V>, key: &str) -> Option<&'a V> {
    let key = key.trim();
    table.get(key).or_else(|| {
        let lowered = key.to_lowercase();
        table
            .iter()
            .find(|(candidate, _)| candidate.to_lowercase() == lowered)
            .map(|(_, value)| value)
    })
}

fn table<V: Clone>(rows: &[(&str, V)]) -> BTreeMap<String, V> {
    rows.iter()
        .map(|(name, value)| ((*name).to_owned(), value.clone()))
        .collect()
}

impl Default for CityCatalog {
    fn default() -> Self {
        let coordinates = table(&[
            ("Mumbai", Coordinates::new(19.0760, 72.8777)),
            ("Delhi", Coordinates::new(28.7041, 77.1025)),
            ("New Delhi", Coordinates::new(28.7041, 77.1025)),
            ("Bangalore", Coordinates::new(12.9716, 77.5946)),
            ("Bengaluru", Coordinates::new(12.9716, 77.5946)),
            ("Kolkata", Coordinates::new(22.5726, 88.3639)),
            ("Calcutta", Coordinates::new(22.5726, 88.3639)),
            ("London", Coordinates::new(51.5074, -0.1278)),
            ("New York", Coordinates::new(40.7128, -74.0060)),
            ("Tokyo", Coordinates::new(35.6762, 139.6503)),
            ("Paris", Coordinates::new(48.8566, 2.3522)),
            ("Chennai", Coordinates::new(13.0827, 80.2707)),
            ("Hyderabad", Coordinates::new(17.3850, 78.4867)),
            ("Pune", Coordinates::new(18.5204, 73.8567)),
            ("Ahmedabad", Coordinates::new(23.0225, 72.5714)),
            ("Jaipur", Coordinates::new(26.9124, 75.7873)),
        ]);

        let traffic_patterns = table(&[
            ("Mumbai", TrafficPattern::new(25.0, 50.0, 8)),
            ("Delhi", TrafficPattern::new(30.0, 60.0, 12)),
            ("Bangalore", TrafficPattern::new(28.0, 55.0, 6)),
            ("Bengaluru", TrafficPattern::new(28.0, 55.0, 6)),
            ("Kolkata", TrafficPattern::new(22.0, 45.0, 5)),
            ("Chennai", TrafficPattern::new(32.0, 60.0, 4)),
            ("Hyderabad", TrafficPattern::new(35.0, 60.0, 3)),
            ("Pune", TrafficPattern::new(38.0, 60.0, 2)),
            ("London", TrafficPattern::new(20.0, 50.0, 15)),
            ("New York", TrafficPattern::new(18.0, 50.0, 20)),
            ("Tokyo", TrafficPattern::new(15.0, 40.0, 10)),
            ("Paris", TrafficPattern::new(22.0, 50.0, 12)),
        ]);

        let populations_thousands = table(&[
            ("Mumbai", 12_478.0),
            ("Delhi", 11_034.0),
            ("Bangalore", 8_443.0),
            ("Hyderabad", 6_993.0),
            ("Chennai", 7_088.0),
            ("Kolkata", 4_486.0),
            ("Pune", 3_124.0),
            ("Ahmedabad", 5_570.0),
            ("Jaipur", 3_071.0),
            ("Surat", 4_467.0),
            ("Lucknow", 2_815.0),
            ("Kanpur", 2_767.0),
            ("Nagpur", 2_405.0),
            ("Indore", 1_996.0),
            ("Thane", 1_841.0),
            ("Bhopal", 1_798.0),
            ("Visakhapatnam", 1_728.0),
            ("Patna", 1_683.0),
            ("Vadodara", 1_671.0),
            ("Ghaziabad", 1_648.0),
            ("Ludhiana", 1_618.0),
            ("Agra", 1_584.0),
            ("Nashik", 1_486.0),
            ("Faridabad", 1_404.0),
            ("Meerut", 1_305.0),
            ("Rajkot", 1_286.0),
            ("Varanasi", 1_198.0),
            ("Srinagar", 1_180.0),
            ("Amritsar", 1_132.0),
            ("Chandigarh", 1_055.0),
            ("New Delhi", 11_034.0),
            ("Bombay", 12_478.0),
            ("Bengaluru", 8_443.0),
            ("Madras", 7_088.0),
            ("Calcutta", 4_486.0),
            ("Baroda", 1_671.0),
        ]);

        let regions = table(&[
            ("Delhi", "Delhi"),
            ("New Delhi", "Delhi"),
            ("Mumbai", "Maharashtra"),
            ("Bombay", "Maharashtra"),
            ("Bangalore", "Karnataka"),
            ("Bengaluru", "Karnataka"),
            ("Hyderabad", "Telangana"),
            ("Chennai", "Tamil Nadu"),
            ("Madras", "Tamil Nadu"),
            ("Kolkata", "West Bengal"),
            ("Calcutta", "West Bengal"),
            ("Pune", "Maharashtra"),
            ("Ahmedabad", "Gujarat"),
            ("Jaipur", "Rajasthan"),
            ("Surat", "Gujarat"),
            ("Lucknow", "Uttar Pradesh"),
            ("Kanpur", "Uttar Pradesh"),
            ("Nagpur", "Maharashtra"),
            ("Indore", "Madhya Pradesh"),
            ("Thane", "Maharashtra"),
            ("Bhopal", "Madhya Pradesh"),
            ("Visakhapatnam", "Andhra Pradesh"),
            ("Patna", "Bihar"),
            ("Vadodara", "Gujarat"),
            ("Ghaziabad", "Uttar Pradesh"),
            ("Ludhiana", "Punjab"),
            ("Agra", "Uttar Pradesh"),
            ("Nashik", "Maharashtra"),
            ("Faridabad", "Haryana"),
            ("Meerut", "Uttar Pradesh"),
            ("Rajkot", "Gujarat"),
            ("Varanasi", "Uttar Pradesh"),
            ("Srinagar", "Jammu and Kashmir"),
            ("Amritsar", "Punjab"),
            ("Chandigarh", "Chandigarh"),
        ])
        .into_iter()
        .map(|(city, region)| (city, region.to_owned()))
        .collect();

        let per_capita_kwh = table(&[
            ("Maharashtra", 1200.0),
            ("Delhi", 1500.0),
            ("Karnataka", 1100.0),
            ("Telangana", 1000.0),
            ("Tamil Nadu", 1300.0),
            ("West Bengal", 900.0),
            ("Gujarat", 1400.0),
            ("Rajasthan", 800.0),
            ("Uttar Pradesh", 700.0),
            ("Madhya Pradesh", 750.0),
            ("Andhra Pradesh", 950.0),
            ("Bihar", 600.0),
            ("Punjab", 1100.0),
            ("Haryana", 1200.0),
            ("Jammu and Kashmir", 700.0),
            ("Chandigarh", 1500.0),
        ]);

        let waste_profiles = table(&[
            ("Mumbai", WasteProfile::new(20.4, 0.5)),
            ("Delhi", WasteProfile::new(30.3, 0.6)),
            ("Bangalore", WasteProfile::new(12.8, 0.45)),
            ("Kolkata", WasteProfile::new(14.9, 0.5)),
            ("London", WasteProfile::new(9.0, 1.2)),
            ("New York", WasteProfile::new(8.3, 1.8)),
            ("Tokyo", WasteProfile::new(14.0, 0.8)),
            ("Paris", WasteProfile::new(2.2, 1.1)),
        ]);

        Self {
            coordinates,
            traffic_patterns,
            default_traffic_pattern: TrafficPattern::new(30.0, 55.0, 5),
            populations_thousands,
            regions,
            per_capita_kwh,
            default_per_capita_kwh: 1000.0,
            waste_profiles,
            default_waste_profile: WasteProfile::new(10.0, 0.5),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn lookup_is_exact_then_case_insensitive() {
        let catalog = CityCatalog::default();

        assert_eq!(
            catalog.coordinates("Mumbai"),
            Some(Coordinates::new(19.0760, 72.8777))
        );
        assert_eq!(
            catalog.coordinates("nEW yORK"),
            Some(Coordinates::new(40.7128, -74.0060))
        );
        assert_eq!(catalog.region(" bombay "), Some("Maharashtra"));
        assert_eq!(catalog.coordinates("UnknownVille"), None);
    }

    #[test]
    fn unknown_cities_get_defaults() {
        let catalog = CityCatalog::default();

        let pattern = catalog.traffic_pattern_or_default("UnknownVille");
        assert_eq!(pattern, TrafficPattern::new(30.0, 55.0, 5));
        assert_eq!(catalog.per_capita_kwh("Atlantis"), 1000.0);
        assert_eq!(catalog.population_thousands("UnknownVille"), None);
        assert_eq!(catalog.waste_profile("UnknownVille"), None);
    }

    #[test]
    fn regional_figures_resolve_through_region_table() {
        let catalog = CityCatalog::default();

        let region = catalog.region("Delhi").expect("delhi has a region");
        assert_eq!(catalog.per_capita_kwh(region), 1500.0);
        assert_eq!(catalog.population_thousands("delhi"), Some(11_034.0));
    }

    #[test]
    fn available_cities_lists_coordinate_table() {
        let catalog = CityCatalog::default();
        let cities = catalog.available_cities();

        assert_eq!(cities.len(), 16);
        assert!(cities.contains(&"Jaipur"));
        assert!(!cities.contains(&"Surat"));
    }

    #[test]
    fn entries_merge_all_tables() {
        let catalog = CityCatalog::default();
        let entries = catalog.entries();

        let surat = entries
            .iter()
            .find(|entry| entry.name == "Surat")
            .expect("surat listed from population table");
        assert_eq!(surat.coordinates, None);
        assert_eq!(surat.region.as_deref(), Some("Gujarat"));

        let tokyo = entries
            .iter()
            .find(|entry| entry.name == "Tokyo")
            .expect("tokyo listed");
        assert!(tokyo.traffic_pattern.is_some());
        assert!(tokyo.waste_profile.is_some());
    }

    #[test]
    fn json_override_replaces_only_named_tables() {
        let catalog = CityCatalog::from_json_str(
            r#"{
                "coordinates": { "Springfield": { "lat": 39.8, "lon": -89.6 } },
                "default_per_capita_kwh": 900
            }"#,
        )
        .expect("valid override");

        assert_eq!(catalog.available_cities(), vec!["Springfield"]);
        assert_eq!(catalog.per_capita_kwh("Nowhere"), 900.0);
        assert_eq!(catalog.region("Mumbai"), Some("Maharashtra"));
    }

    #[test]
    fn load_reads_file_and_reports_errors() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "regions": {{ "Springfield": "Illinois" }} }}"#).expect("write");

        let catalog = CityCatalog::load(file.path()).expect("catalog loads");
        assert_eq!(catalog.region("springfield"), Some("Illinois"));

        let missing = CityCatalog::load("/definitely/not/here.json").expect_err("missing file");
        assert!(matches!(missing, CatalogError::Read { .. }));

        let bad = CityCatalog::from_json_str("{ nope").expect_err("bad json");
        assert!(matches!(bad, CatalogError::Parse(_)));
    }
}
