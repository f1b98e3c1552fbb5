use crate::core::composer::PlacedPlan;
use crate::utils::error::{CutsheetError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_unique, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One item to place: the remote identifier of its drawing plus its SKU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    pub item_id: String,
    pub sku: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSpec {
    pub name: String,
    /// Logical folder the item drawings are resolved in.
    pub source_folder: String,
    #[serde(default)]
    pub items: Vec<ItemSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeRequest {
    pub plans: Vec<PlanSpec>,
    pub destination_folder: String,
    #[serde(default)]
    pub output_filename: Option<String>,
}

impl ComposeRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        let request: ComposeRequest = serde_json::from_str(json)?;
        request.validate()?;
        Ok(request)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CutsheetError::ConfigError {
                message: format!(
                    "Failed to read request file '{}': {}",
                    path.as_ref().display(),
                    e
                ),
            }
        })?;
        Self::from_json(&content)
    }

    pub fn item_count(&self) -> usize {
        self.plans.iter().map(|p| p.items.len()).sum()
    }

    pub fn plan_names(&self) -> Vec<&str> {
        self.plans.iter().map(|p| p.name.as_str()).collect()
    }
}

impl Validate for ComposeRequest {
    fn validate(&self) -> Result<()> {
        if self.plans.is_empty() {
            return Err(CutsheetError::ValidationError {
                message: "A compose request needs at least one plan".to_string(),
            });
        }
        validate_non_empty_string("destination_folder", &self.destination_folder)?;
        if let Some(name) = &self.output_filename {
            validate_non_empty_string("output_filename", name)?;
        }
        validate_unique("plans.name", self.plans.iter().map(|p| p.name.as_str()))?;

        for plan in &self.plans {
            validate_non_empty_string("plans.name", &plan.name)?;
            if plan.name.contains(['/', '\\']) || plan.name == "." || plan.name == ".." {
                return Err(CutsheetError::ValidationError {
                    message: format!("Plan name '{}' must not be a path", plan.name),
                });
            }
            if !plan.items.is_empty() {
                validate_non_empty_string(
                    &format!("plans[{}].source_folder", plan.name),
                    &plan.source_folder,
                )?;
            }
            for item in &plan.items {
                validate_non_empty_string(&format!("plans[{}].items.item_id", plan.name), &item.item_id)?;
            }
        }
        Ok(())
    }
}

/// An object found in a drawing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub id: String,
    pub name: String,
}

/// Where an uploaded document can be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    InvalidSku,
    NotFound,
    FetchFailed,
    Timeout,
    CorruptDrawing,
}

impl FailureReason {
    /// Maps a per-item error onto the reason reported back to the caller.
    pub fn from_error(error: &CutsheetError) -> Self {
        match error {
            CutsheetError::InvalidSku { .. } => Self::InvalidSku,
            CutsheetError::ObjectNotFound { .. } => Self::NotFound,
            CutsheetError::FetchTimeout { .. } => Self::Timeout,
            CutsheetError::DxfError(_) => Self::CorruptDrawing,
            _ => Self::FetchFailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedItem {
    pub plan: String,
    pub item_id: String,
    pub sku: String,
    pub reason: FailureReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeReport {
    pub destination: UploadReceipt,
    pub output_name: String,
    pub failed_items: Vec<FailedItem>,
    pub skipped_plans: Vec<String>,
    pub plans: Vec<PlacedPlan>,
    pub width: f64,
    pub height: f64,
}

impl ComposeReport {
    pub fn placed_items(&self) -> usize {
        self.plans.iter().map(|p| p.placed_items).sum()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed_items.iter().map(|f| f.item_id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &str = r#"{
        "plans": [
            {
                "name": "01",
                "source_folder": "orders-2024",
                "items": [
                    { "item_id": "A1", "sku": "PLAC-3010-2FH-AC-DOU-070-00000" },
                    { "item_id": "A2", "sku": "PLAC-3010-2FH" }
                ]
            },
            { "name": "02", "source_folder": "", "items": [] }
        ],
        "destination_folder": "out"
    }"#;

    #[test]
    fn test_parse_request() {
        let request = ComposeRequest::from_json(REQUEST).unwrap();

        assert_eq!(request.plan_names(), vec!["01", "02"]);
        assert_eq!(request.item_count(), 2);
        assert!(request.output_filename.is_none());
    }

    #[test]
    fn test_rejects_duplicate_plan_names() {
        let json = REQUEST.replace("\"02\"", "\"01\"");
        assert!(ComposeRequest::from_json(&json).is_err());
    }

    #[test]
    fn test_rejects_empty_request() {
        let json = r#"{ "plans": [], "destination_folder": "out" }"#;
        let err = ComposeRequest::from_json(json).unwrap_err();
        assert!(matches!(err, CutsheetError::ValidationError { .. }));
    }

    #[test]
    fn test_rejects_plan_names_that_are_paths() {
        for name in ["../x", "a/b", "a\\\\b", ".."] {
            let json = REQUEST.replace("\"02\"", &format!("\"{}\"", name));
            let err = ComposeRequest::from_json(&json).unwrap_err();
            assert!(matches!(err, CutsheetError::ValidationError { .. }), "{name}");
        }
    }

    #[test]
    fn test_rejects_empty_item_id() {
        let json = REQUEST.replace("\"A1\"", "\"  \"");
        assert!(ComposeRequest::from_json(&json).is_err());
    }

    #[test]
    fn test_failure_reason_serializes_snake_case() {
        let item = FailedItem {
            plan: "01".to_string(),
            item_id: "A2".to_string(),
            sku: "PLAC-3010-2FH".to_string(),
            reason: FailureReason::InvalidSku,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["reason"], "invalid_sku");

        let timeout = CutsheetError::FetchTimeout {
            identifier: "A1".to_string(),
            seconds: 1,
        };
        assert_eq!(FailureReason::from_error(&timeout), FailureReason::Timeout);
    }
}
