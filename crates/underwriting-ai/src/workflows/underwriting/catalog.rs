use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use tracing::warn;

use super::domain::{ConstructionRisk, Property, PropertyId};

/// The fixed set of properties reviewed in one round of the game.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyCatalog {
    properties: Vec<Property>,
}

impl PropertyCatalog {
    pub const ROUND_SIZE: usize = 6;

    pub fn standard() -> Self {
        Self {
            properties: standard_properties(),
        }
    }

    pub fn from_properties(properties: Vec<Property>) -> Self {
        Self { properties }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Overlay the first six CSV rows onto the built-in records.
    ///
    /// Letters are always assigned by position. Empty cells and unrecognised construction-risk
    /// labels keep the built-in value and are logged; state and image URLs always come from the
    /// built-in record.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let base = standard_properties();
        let mut properties = Vec::with_capacity(Self::ROUND_SIZE);

        for (index, row) in csv_reader
            .deserialize::<CatalogRow>()
            .take(Self::ROUND_SIZE)
            .enumerate()
        {
            let row = row?;
            let fallback = &base[index % base.len()];
            properties.push(row.overlay(index, fallback)?);
        }

        if properties.is_empty() {
            return Err(CatalogImportError::Empty);
        }

        Ok(Self { properties })
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn ids(&self) -> Vec<PropertyId> {
        self.properties.iter().map(|property| property.id).collect()
    }

    pub fn get(&self, id: PropertyId) -> Option<&Property> {
        self.properties.iter().find(|property| property.id == id)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl Default for PropertyCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidField {
        row: usize,
        field: &'static str,
        value: String,
    },
    Empty,
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read property export: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid property CSV data: {}", err),
            CatalogImportError::InvalidField { row, field, value } => write!(
                f,
                "row {}: column '{}' holds '{}', expected a whole number",
                row, field, value
            ),
            CatalogImportError::Empty => write!(f, "property export contains no rows"),
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
            CatalogImportError::InvalidField { .. } | CatalogImportError::Empty => None,
        }
    }
}

impl From<std::io::Error> for CatalogImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    submission_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    submission_channel: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    occupancy_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    property_age: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    property_value: Option<String>,
    #[serde(
        rename = "Property_county",
        alias = "property_county",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    property_county: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    cover_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    building_coverage_limit: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    contents_coverage_limit: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    broker_company: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    construction_risk: Option<String>,
}

impl CatalogRow {
    fn overlay(self, index: usize, fallback: &Property) -> Result<Property, CatalogImportError> {
        let row = index + 1;
        let id = PropertyId(row as u32);

        let text = |value: Option<String>, field: &'static str, default: &str| {
            value.unwrap_or_else(|| {
                warn!(row, field, "empty cell in property export; using built-in value");
                default.to_string()
            })
        };

        // The column is optional in exports, so an absent cell is not worth a warning.
        let construction_risk = match self.construction_risk.as_deref() {
            Some(raw) => ConstructionRisk::parse(raw).unwrap_or_else(|| {
                warn!(
                    row,
                    field = "construction_risk",
                    value = raw,
                    "unrecognised label in property export; using built-in value"
                );
                fallback.construction_risk
            }),
            None => fallback.construction_risk,
        };

        Ok(Property {
            id,
            letter: id.letter(),
            submission_id: text(self.submission_id, "submission_id", &fallback.submission_id),
            submission_channel: text(
                self.submission_channel,
                "submission_channel",
                &fallback.submission_channel,
            ),
            occupancy_type: text(
                self.occupancy_type,
                "occupancy_type",
                &fallback.occupancy_type,
            ),
            property_age: narrow_to_u32(
                row,
                "property_age",
                whole_number(
                    row,
                    self.property_age,
                    "property_age",
                    u64::from(fallback.property_age),
                )?,
            )?,
            property_value: whole_number(
                row,
                self.property_value,
                "property_value",
                fallback.property_value,
            )?,
            property_county: text(
                self.property_county,
                "Property_county",
                &fallback.property_county,
            ),
            state: fallback.state.clone(),
            cover_type: text(self.cover_type, "cover_type", &fallback.cover_type),
            building_coverage_limit: whole_number(
                row,
                self.building_coverage_limit,
                "building_coverage_limit",
                fallback.building_coverage_limit,
            )?,
            contents_coverage_limit: whole_number(
                row,
                self.contents_coverage_limit,
                "contents_coverage_limit",
                fallback.contents_coverage_limit,
            )?,
            broker_company: text(
                self.broker_company,
                "broker_company",
                &fallback.broker_company,
            ),
            construction_risk,
            image_url: fallback.image_url.clone(),
            roof_image_url: fallback.roof_image_url.clone(),
        })
    }
}

/// Spreadsheet exports render integers as `18.0`; accept that, reject anything else.
fn whole_number(
    row: usize,
    value: Option<String>,
    field: &'static str,
    default: u64,
) -> Result<u64, CatalogImportError> {
    let Some(raw) = value else {
        warn!(row, field, "empty cell in property export; using built-in value");
        return Ok(default);
    };

    let parsed = raw
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|number| {
            number.is_finite()
                && *number >= 0.0
                && *number < U64_CEILING
                && number.fract() == 0.0
        });

    match parsed {
        Some(number) => Ok(number as u64),
        None => Err(CatalogImportError::InvalidField {
            row,
            field,
            value: raw,
        }),
    }
}

/// 2^64; every whole float below it fits a `u64`.
const U64_CEILING: f64 = 18_446_744_073_709_551_616.0;

fn narrow_to_u32(row: usize, field: &'static str, value: u64) -> Result<u32, CatalogImportError> {
    u32::try_from(value).map_err(|_| CatalogImportError::InvalidField {
        row,
        field,
        value: value.to_string(),
    })
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty() && !value.eq_ignore_ascii_case("nan")))
}

#[allow(clippy::too_many_arguments)]
fn property(
    id: u32,
    submission_id: &str,
    channel: &str,
    occupancy: &str,
    age: u32,
    value: u64,
    county: &str,
    cover: &str,
    building_limit: u64,
    contents_limit: u64,
    broker: &str,
    construction_risk: ConstructionRisk,
    image: &str,
    roof_image: &str,
) -> Property {
    let id = PropertyId(id);
    Property {
        id,
        letter: id.letter(),
        submission_id: submission_id.to_string(),
        submission_channel: channel.to_string(),
        occupancy_type: occupancy.to_string(),
        property_age: age,
        property_value: value,
        property_county: county.to_string(),
        state: "CA".to_string(),
        cover_type: cover.to_string(),
        building_coverage_limit: building_limit,
        contents_coverage_limit: contents_limit,
        broker_company: broker.to_string(),
        construction_risk,
        image_url: format!("https://images.unsplash.com/photo-{image}?w=800&h=600&fit=crop"),
        roof_image_url: format!(
            "https://images.unsplash.com/photo-{roof_image}?w=800&h=600&fit=crop"
        ),
    }
}

fn standard_properties() -> Vec<Property> {
    use ConstructionRisk::{High, Low, Medium};

    vec![
        property(
            1,
            "SUB-1001",
            "Broker",
            "Owner Occupied",
            18,
            850_000,
            "Orange County",
            "Comprehensive",
            600_000,
            150_000,
            "ABC Insurance",
            Medium,
            "1568605114967-8130f3a36994",
            "1558618666-fcd25c85cd64",
        ),
        property(
            2,
            "SUB-1002",
            "Direct",
            "Tenant Occupied",
            25,
            620_000,
            "Los Angeles County",
            "Basic",
            450_000,
            100_000,
            "Direct Underwriting",
            High,
            "1570129477492-45c003edd2be",
            "1504307651254-35680f356dfd",
        ),
        property(
            3,
            "SUB-1003",
            "Broker",
            "Owner Occupied",
            5,
            1_200_000,
            "San Diego County",
            "Premium",
            900_000,
            250_000,
            "XYZ Brokers",
            Low,
            "1564013799919-ab600027ffc6",
            "1622021142947-da7dedc7c39a",
        ),
        property(
            4,
            "SUB-1004",
            "Broker",
            "Vacation Home",
            35,
            450_000,
            "Riverside County",
            "Comprehensive",
            350_000,
            75_000,
            "Coastal Insurance Group",
            High,
            "1580587771525-78b9dba3b914",
            "1512917774080-9991f1c4c750",
        ),
        property(
            5,
            "SUB-1005",
            "Direct",
            "Owner Occupied",
            12,
            975_000,
            "Ventura County",
            "Comprehensive",
            700_000,
            200_000,
            "Direct Underwriting",
            Low,
            "1600596542815-ffad4c1539a9",
            "1605146769289-440113cc3d00",
        ),
        property(
            6,
            "SUB-1006",
            "Broker",
            "Owner Occupied",
            8,
            725_000,
            "Orange County",
            "Basic",
            550_000,
            125_000,
            "Premier Property Insurance",
            Low,
            "1600585154340-be6161a56a0c",
            "1513584684374-8bab748fbf90",
        ),
    ]
}
