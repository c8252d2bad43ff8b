use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize)]
pub(crate) struct TranslationsResponse {
    pub(crate) translations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TabUpdateRequest {
    pub(crate) tab_id: u32,
    pub(crate) enabled: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct TabStateResponse {
    pub(crate) state: HashMap<u32, bool>,
}
