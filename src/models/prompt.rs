//! Prompt and response schema for the fraud judge

use serde_json::{json, Value};

use crate::models::judge::JudgeRequest;

const INSTRUCTIONS: &str = "\
You review employee expense receipts for fraud. Work in two passes.

Pass 1, integrity check. Using the image and the extracted data, look for obvious red flags:
- the image does not look like a genuine receipt
- signs of digital editing or manipulation
- extracted items that are grossly inconsistent with a normal receipt
- vendor, date or total missing or nonsensical

Pass 2, fraud analysis. Using everything provided, look for subtler problems:
- an amount that is unusually high for the listed items
- a likely duplicate submission
- a personal expense presented as a business one, an altered receipt, or any other anomaly

Combine both passes and answer with a JSON object:
- \"fraudulent\": true if either pass raises high suspicion
- \"fraudProbability\": overall probability from 0 to 1 that the receipt is fraudulent
- \"explanation\": a short summary of the findings from both passes for the human reviewer";

/// Render the text part of the judge prompt.
pub fn render_prompt(request: &JudgeRequest) -> String {
    let items = if request.fields.is_empty() {
        "(no fields extracted)".to_string()
    } else {
        request.receipt_text()
    };
    let history = request
        .transaction_history
        .as_deref()
        .unwrap_or("None provided");
    let image_note = if request.image.is_some() {
        "attached"
    } else {
        "not available"
    };

    format!(
        "{INSTRUCTIONS}\n\nReceipt Items:\n{items}\nTransaction History: {history}\nReceipt Image: {image_note}\n"
    )
}

/// JSON schema the model output is constrained to.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "fraudulent": { "type": "BOOLEAN" },
            "fraudProbability": { "type": "NUMBER", "minimum": 0, "maximum": 1 },
            "explanation": { "type": "STRING" }
        },
        "required": ["fraudulent", "fraudProbability", "explanation"]
    })
}
