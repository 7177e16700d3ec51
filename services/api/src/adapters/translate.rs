//! services/api/src/adapters/translate.rs
//!
//! This module contains the adapter for the MyMemory translation API.
//! It implements the `Translator` port from the `core` crate.

use async_trait::async_trait;
use eduverse_core::ports::{PortError, PortResult, Translator};
use reqwest::Client;
use serde::Deserialize;

const API_URL: &str = "https://api.mymemory.translated.net/get";

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "responseData")]
    response_data: ResponseData,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// An adapter that implements the `Translator` port using the free MyMemory
/// REST API.
#[derive(Clone)]
pub struct MyMemoryTranslator {
    client: Client,
}

impl MyMemoryTranslator {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Translator for MyMemoryTranslator {
    async fn translate(&self, text: &str, source: &str, target: &str) -> PortResult<String> {
        let response = self
            .client
            .get(API_URL)
            .query(&[("q", text), ("langpair", &format!("{}|{}", source, target))])
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Unexpected(format!(
                "Unexpected translation response code {}",
                status.as_u16()
            )));
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(parsed.response_data.translated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parsing_reads_the_nested_text() {
        let body = r#"{
            "responseData": {"translatedText": "नमस्ते", "match": 1},
            "responseStatus": 200
        }"#;
        let parsed: TranslateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.response_data.translated_text, "नमस्ते");
    }
}
