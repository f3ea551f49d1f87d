//! Display configuration: category palette and optional CSV exports.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation::{validate_color, validate_palette};

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    /// `#RRGGBB` color per category.
    #[validate(custom(function = validate_palette))]
    pub palette: BTreeMap<String, String>,

    /// Color for categories missing from the palette.
    #[validate(custom(function = validate_color))]
    pub fallback_color: String,

    /// Write the cumulative time series to this CSV file when a run ends.
    pub series_out: Option<PathBuf>,

    /// Stream every counted event to this CSV file, stamped with its display time.
    pub arrivals_out: Option<PathBuf>,
}

impl DisplayConfig {
    pub fn color_for(&self, category: &str) -> &str {
        self.palette
            .get(category)
            .map(String::as_str)
            .unwrap_or(&self.fallback_color)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let palette = [
            ("X-Ray", "#FF6F61"),
            ("CT", "#6A5ACD"),
            ("MRI", "#20B2AA"),
            ("US", "#FFA500"),
        ]
        .into_iter()
        .map(|(category, color)| (category.to_string(), color.to_string()))
        .collect();

        Self {
            palette,
            fallback_color: "#888888".into(),
            series_out: None,
            arrivals_out: None,
        }
    }
}
