//! TEMPO Level-3 trace-gas column products.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-cell data-integrity flag; 0 marks a usable value.
pub const QUALITY_FLAG_VARIABLE: &str = "main_data_quality_flag";

/// Units reported for every column product.
pub const UNITS: &str = "molecules/cm^2";

/// Catalog schema version shared by the three L3 collections.
pub const DEFAULT_VERSION: &str = "V03";

/// A trace-gas column product served by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Product {
    #[serde(rename = "NO2")]
    No2,
    #[serde(rename = "HCHO")]
    Hcho,
    #[serde(rename = "O3")]
    O3,
}

impl Product {
    /// All products, in the order they are fetched.
    pub const ALL: [Product; 3] = [Product::No2, Product::Hcho, Product::O3];

    /// Display name used in responses.
    pub fn name(&self) -> &'static str {
        match self {
            Product::No2 => "NO2",
            Product::Hcho => "HCHO",
            Product::O3 => "O3",
        }
    }

    /// Catalog collection short name.
    pub fn short_name(&self) -> &'static str {
        match self {
            Product::No2 => "TEMPO_NO2_L3",
            Product::Hcho => "TEMPO_HCHO_L3",
            Product::O3 => "TEMPO_O3_L3",
        }
    }

    /// Name of the column variable reported for this product.
    pub fn result_variable(&self) -> &'static str {
        match self {
            Product::No2 => "vertical_column_troposphere",
            Product::Hcho => "vertical_column",
            Product::O3 => "vertical_column_troposphere",
        }
    }

}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
