use serde::Serialize;

/// Everything a browser needs to upload an image straight to the image host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUpload {
    pub upload_url: String,
    pub api_key: String,
    pub timestamp: i64,
    pub signature: String,
}
