use serde::{Deserialize, Serialize};

/// Error body a backend may return alongside a non-success status.
///
/// Backends disagree on the field name, so the detail is read from whichever
/// of `detail`, `error` or `message` is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiErrorBody {
    pub fn detail_text(&self) -> Option<&str> {
        [&self.detail, &self.error, &self.message]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .map(str::trim)
            .find(|text| !text.is_empty())
    }
}
