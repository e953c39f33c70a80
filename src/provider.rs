//! Input ingestion
//! Price and emission tables reach the engine through a `DataProvider`; malformed values
//! are rejected here, before any solve.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;

use crate::error::ProviderError;
use crate::models::{EmissionRecord, PriceRecord};

/// The raw tables a run works on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineInputs {
    pub prices: Vec<PriceRecord>,
    pub emissions: Vec<EmissionRecord>,
}

/// Source of the price and emission tables
pub trait DataProvider {
    fn load(&self) -> Result<EngineInputs, ProviderError>;
}

/// Tables already in memory
impl DataProvider for EngineInputs {
    fn load(&self) -> Result<EngineInputs, ProviderError> {
        Ok(self.clone())
    }
}

#[derive(Deserialize)]
struct PriceRow {
    year: u32,
    scenario: String,
    reporting_fuel: String,
    #[serde(rename = "price_USDperGJ")]
    price_usd_per_gj: f64,
    #[serde(rename = "Biomass Supply", default)]
    biomass_supply: Option<String>,
}

impl From<PriceRow> for PriceRecord {
    fn from(row: PriceRow) -> Self {
        PriceRecord {
            year: row.year,
            scenario: row.scenario,
            fuel: row.reporting_fuel,
            price_per_gj: row.price_usd_per_gj,
            biomass_supply: row.biomass_supply.filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Deserialize)]
struct EmissionRow {
    year: u32,
    scenario: String,
    fuel: String,
    #[serde(rename = "kgCO2e_GJ")]
    kg_co2e_gj: f64,
}

impl From<EmissionRow> for EmissionRecord {
    fn from(row: EmissionRow) -> Self {
        EmissionRecord {
            year: row.year,
            scenario: row.scenario,
            fuel: row.fuel,
            kg_co2e_per_gj: row.kg_co2e_gj,
        }
    }
}

fn read_rows<R, Row, T>(reader: R, table: &'static str) -> Result<Vec<T>, ProviderError>
where
    R: io::Read,
    Row: for<'de> Deserialize<'de> + Into<T>,
{
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let mut out = Vec::new();
    for result in rdr.deserialize::<Row>() {
        let row = result.map_err(|source| ProviderError::Record { table, source })?;
        out.push(row.into());
    }
    Ok(out)
}

/// Read a price table (`year, scenario, reporting_fuel, price_USDperGJ, Biomass Supply`)
pub fn read_prices<R: io::Read>(reader: R) -> Result<Vec<PriceRecord>, ProviderError> {
    read_rows::<R, PriceRow, PriceRecord>(reader, "price")
}

/// Read an emission table (`year, scenario, fuel, kgCO2e_GJ`)
pub fn read_emissions<R: io::Read>(reader: R) -> Result<Vec<EmissionRecord>, ProviderError> {
    read_rows::<R, EmissionRow, EmissionRecord>(reader, "emissions")
}

fn load_table<T>(
    path: &Path,
    table: &'static str,
    read: fn(File) -> Result<Vec<T>, ProviderError>,
) -> Result<Vec<T>, ProviderError> {
    let file = File::open(path).map_err(|err| ProviderError::Csv {
        table,
        path: path.to_path_buf(),
        source: err.into(),
    })?;
    read(file).map_err(|err| match err {
        ProviderError::Record { source, .. } => ProviderError::Csv {
            table,
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

/// CSV files on disk
#[derive(Debug, Clone)]
pub struct CsvDataProvider {
    prices_path: PathBuf,
    emissions_path: PathBuf,
}

impl CsvDataProvider {
    pub fn new(prices_path: impl Into<PathBuf>, emissions_path: impl Into<PathBuf>) -> Self {
        Self {
            prices_path: prices_path.into(),
            emissions_path: emissions_path.into(),
        }
    }
}

impl DataProvider for CsvDataProvider {
    fn load(&self) -> Result<EngineInputs, ProviderError> {
        let prices = load_table(&self.prices_path, "price", read_prices::<File>)?;
        let emissions = load_table(&self.emissions_path, "emissions", read_emissions::<File>)?;

        tracing::debug!(
            prices = prices.len(),
            emissions = emissions.len(),
            "loaded input tables"
        );
        Ok(EngineInputs { prices, emissions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const PRICES: &str = "\
scenario,year,reporting_fuel,price_USDperGJ,Biomass Supply,units
Reference,2050,petroleum diesel,21.5,Reference,USD/GJ
Reference,2050,FT biofuels,30.0,Reference,USD/GJ
LowBio,2050,FT biofuels,30.0,Constrained,USD/GJ
";

    const EMISSIONS: &str = "\
year,scenario,fuel,kgCO2e_GJ,stage
2050,Reference,petroleum diesel,75.0,combustion
2050,Reference,petroleum diesel,18.5,upstream
";

    #[test]
    fn test_read_prices_ignores_extra_columns() {
        let prices = read_prices(PRICES.as_bytes()).unwrap();
        assert_eq!(prices.len(), 3);
        assert_eq!(prices[0].fuel, "petroleum diesel");
        assert_eq!(prices[0].price_per_gj, 21.5);
        assert!(prices[2].is_biomass_constrained());
    }

    #[test]
    fn test_read_emissions() {
        let emissions = read_emissions(EMISSIONS.as_bytes()).unwrap();
        assert_eq!(emissions.len(), 2);
        assert_eq!(emissions[1].kg_co2e_per_gj, 18.5);
    }

    #[test]
    fn test_biomass_column_is_optional() {
        let csv = "year,scenario,reporting_fuel,price_USDperGJ\n2050,s1,LNG,12\n";
        let prices = read_prices(csv.as_bytes()).unwrap();
        assert_eq!(prices[0].biomass_supply, None);
    }

    #[test]
    fn test_non_numeric_value_fails_ingestion() {
        let csv = "year,scenario,fuel,kgCO2e_GJ\n2050,s1,LNG,lots\n";
        assert!(matches!(
            read_emissions(csv.as_bytes()),
            Err(ProviderError::Record { table: "emissions", .. })
        ));
    }

    #[test]
    fn test_csv_provider_reads_files() {
        let dir = tempdir().unwrap();
        let prices_path = dir.path().join("prices.csv");
        let emissions_path = dir.path().join("ghg.csv");
        std::fs::File::create(&prices_path)
            .unwrap()
            .write_all(PRICES.as_bytes())
            .unwrap();
        std::fs::File::create(&emissions_path)
            .unwrap()
            .write_all(EMISSIONS.as_bytes())
            .unwrap();

        let inputs = CsvDataProvider::new(&prices_path, &emissions_path).load().unwrap();
        assert_eq!(inputs.prices.len(), 3);
        assert_eq!(inputs.emissions.len(), 2);

        let missing = CsvDataProvider::new(dir.path().join("nope.csv"), &emissions_path).load();
        assert!(matches!(missing, Err(ProviderError::Csv { table: "price", .. })));
    }
}
