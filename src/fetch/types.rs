use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Every open-api response is wrapped in `{code, msg, data}`; `code == 0` is success.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// A response that arrived intact but declared failure.
#[derive(Debug, thiserror::Error)]
#[error("remote rejected request: code {code}: {msg}")]
pub struct RemoteRejection {
    pub code: i64,
    pub msg: String,
}

impl<T: Default> Envelope<T> {
    pub fn into_data(self) -> Result<T, RemoteRejection> {
        if self.code != 0 {
            return Err(RemoteRejection {
                code: self.code,
                msg: self.msg,
            });
        }
        Ok(self.data.unwrap_or_default())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordItem {
    pub record_id: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchData {
    pub items: Option<Vec<RecordItem>>,
    #[serde(default)]
    pub has_more: bool,
    pub page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BatchCreateData {
    pub records: Option<Vec<RecordItem>>,
}

#[derive(Debug, Serialize)]
pub struct SearchRequest<'a> {
    pub field_names: [&'a str; 1],
}

#[derive(Debug, Serialize)]
pub struct NewRecord {
    pub fields: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct BatchCreateRequest {
    pub records: Vec<NewRecord>,
}

#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub app_id: &'a str,
    pub app_secret: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub tenant_access_token: Option<String>,
    /// Lifetime in seconds.
    pub expire: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct MessageRequest<'a> {
    pub receive_id: &'a str,
    pub msg_type: &'a str,
    /// The card, itself JSON-encoded into a string.
    pub content: String,
}
