//! Extracted receipt fields

use serde::{Deserialize, Serialize};

/// One labeled datum extracted from a receipt image (e.g. "Vendor" -> "Acme Corp").
///
/// Receipts are carried as an ordered `Vec<ReceiptField>`. Labels are not
/// guaranteed to be unique and are matched case-insensitively by substring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptField {
    /// Client-side identifier used by the upload form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Field label as produced by the extractor
    pub label: String,

    /// Raw field value
    pub value: String,
}

impl ReceiptField {
    /// Create a field without a client id
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            label: label.into(),
            value: value.into(),
        }
    }

    /// Whether the lowercased label contains `needle` (expected lowercase)
    pub fn label_contains(&self, needle: &str) -> bool {
        self.label.to_lowercase().contains(needle)
    }

    /// Whether the value carries usable data: non-blank and not an
    /// extractor "not found" placeholder.
    pub fn has_usable_value(&self) -> bool {
        !self.value.trim().is_empty() && !self.value.to_lowercase().contains("not found")
    }
}

/// First field, in document order, whose label contains `needle`.
pub fn find_by_label<'a>(fields: &'a [ReceiptField], needle: &str) -> Option<&'a ReceiptField> {
    fields.iter().find(|field| field.label_contains(needle))
}

/// Render fields as `- label: value` lines for prompts and logs.
pub fn render_fields(fields: &[ReceiptField]) -> String {
    fields
        .iter()
        .map(|field| format!("- {}: {}", field.label, field.value))
        .collect::<Vec<_>>()
        .join("\n")
}
