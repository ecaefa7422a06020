use serde::Serialize;
use serde_json::{json, Value};

pub const SKIPPED_MESSAGE: &str = "Skipped - marked already";

/// What the Lambda returns to the webhook sender.
///
/// Exactly one of `body`, `message` or `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeResponse {
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutcomeResponse {
    /// 200 with a pretty-printed `{ message, input }` body echoing the decoded record.
    pub fn processed(title: &str, input: &Value) -> Self {
        let body = json!({
            "message": format!("Image {title} watermarked successfully"),
            "input": input,
        });

        Self {
            status_code: 200,
            body: Some(serde_json::to_string_pretty(&body).unwrap_or_default()),
            message: None,
            error: None,
        }
    }

    pub fn skipped() -> Self {
        Self {
            status_code: 200,
            body: None,
            message: Some(SKIPPED_MESSAGE.to_string()),
            error: None,
        }
    }

    pub fn failed(err: &impl std::fmt::Display) -> Self {
        Self {
            status_code: 500,
            body: None,
            message: None,
            error: Some(err.to_string()),
        }
    }

    /// Parse `body` back into JSON. `None` for skip and failure responses.
    pub fn body_json(&self) -> Option<Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
    }
}
