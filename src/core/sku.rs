use crate::utils::error::{CutsheetError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of hyphen-separated fields in a product SKU:
/// format, size, hole type, material, color, quantity, art style.
pub const SKU_FIELD_COUNT: usize = 7;

/// The SKU fields the layout groups on.
///
/// Example: `PLAC-3010-2FH-AC-DOU-070-00000` parses to format `PLAC`,
/// size `3010`, hole type `2FH` and color `DOU`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sku {
    pub format: String,
    pub size: String,
    pub hole_type: String,
    pub color: String,
}

impl Sku {
    pub fn parse(sku: &str) -> Result<Self> {
        let parts: Vec<&str> = sku.split('-').collect();
        if parts.len() != SKU_FIELD_COUNT {
            return Err(CutsheetError::InvalidSku {
                sku: sku.to_string(),
                reason: format!(
                    "expected {} fields separated by '-', found {}",
                    SKU_FIELD_COUNT,
                    parts.len()
                ),
            });
        }

        const FIELD_NAMES: [&str; SKU_FIELD_COUNT] = [
            "format",
            "size",
            "hole type",
            "material",
            "color",
            "quantity",
            "art style",
        ];
        for (part, name) in parts.iter().zip(FIELD_NAMES) {
            if part.is_empty() {
                return Err(CutsheetError::InvalidSku {
                    sku: sku.to_string(),
                    reason: format!("{} field is empty", name),
                });
            }
        }

        Ok(Self {
            format: parts[0].to_string(),
            size: parts[1].to_string(),
            hole_type: parts[2].to_string(),
            color: parts[4].to_string(),
        })
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "color={} format={} size={} hole={}",
            self.color, self.format, self.size, self.hole_type
        )
    }
}
