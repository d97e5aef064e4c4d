//! HTTP client for the document→text/layout service.

use async_trait::async_trait;
use docstruct::{DocumentReader, ExtractError, Sheet};
use serde::Deserialize;
use serde_json::json;

/// Thin client over the layout service. Conversion quality is the
/// service's concern; this client only preserves page and sheet order.
pub struct HttpDocumentReader {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ConvertResponse {
    pages: Vec<Page>,
}

#[derive(Deserialize)]
struct Page {
    content: String,
}

#[derive(Deserialize)]
struct WorkbookResponse {
    sheets: Vec<Sheet>,
}

impl HttpDocumentReader {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl DocumentReader for HttpDocumentReader {
    async fn read_text(&self, location: &str, extension: &str) -> docstruct::Result<Vec<String>> {
        let response: ConvertResponse = self
            .client
            .post(format!("{}/convert", self.base_url))
            .json(&json!({ "location": location, "extension": extension }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ExtractError::Reader(Box::new(e)))?
            .json()
            .await
            .map_err(|e| ExtractError::Reader(Box::new(e)))?;

        Ok(response.pages.into_iter().map(|p| p.content).collect())
    }

    async fn read_workbook(&self, location: &str) -> docstruct::Result<Vec<Sheet>> {
        let response: WorkbookResponse = self
            .client
            .post(format!("{}/workbook", self.base_url))
            .json(&json!({ "location": location }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ExtractError::Reader(Box::new(e)))?
            .json()
            .await
            .map_err(|e| ExtractError::Reader(Box::new(e)))?;

        Ok(response.sheets)
    }
}
