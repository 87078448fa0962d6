//! Google Cloud Vision OCR over HTTP.

use std::time::Duration;

use base64::Engine as _;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::OcrProvider;
use crate::error::OcrError;
use crate::models::config::CloudOcrConfig;

const PROVIDER: &str = "cloud";

/// OCR provider calling the Vision `images:annotate` endpoint.
pub struct CloudOcrProvider {
    client: Client,
    url: String,
    api_key: String,
    language_hints: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateRequest<'a> {
    requests: [ImageRequest<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageRequest<'a> {
    image: ImageContent,
    features: [Feature; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    image_context: Option<ImageContext<'a>>,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext<'a> {
    language_hints: &'a [String],
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    message: String,
}

impl CloudOcrProvider {
    pub fn from_config(config: &CloudOcrConfig) -> Result<Self, OcrError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(OcrError::MissingApiKey)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OcrError::Provider {
                provider: PROVIDER.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url: format!(
                "{}/v1/images:annotate",
                config.endpoint.trim_end_matches('/')
            ),
            api_key,
            language_hints: config.language_hints.clone(),
        })
    }

    fn request_body(&self, image: &[u8]) -> AnnotateRequest<'_> {
        AnnotateRequest {
            requests: [ImageRequest {
                image: ImageContent {
                    content: base64::engine::general_purpose::STANDARD.encode(image),
                },
                features: [Feature {
                    kind: "DOCUMENT_TEXT_DETECTION",
                }],
                image_context: (!self.language_hints.is_empty()).then_some(ImageContext {
                    language_hints: &self.language_hints,
                }),
            }],
        }
    }
}

impl OcrProvider for CloudOcrProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        debug!("Sending {} bytes to {}", image.len(), self.url);

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(image))
            .send()
            .map_err(|e| {
                let message = e.to_string();
                if e.is_connect() || e.is_timeout() {
                    OcrError::Unreachable {
                        provider: PROVIDER.to_string(),
                        message,
                    }
                } else {
                    OcrError::Provider {
                        provider: PROVIDER.to_string(),
                        message,
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OcrError::Provider {
                provider: PROVIDER.to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let parsed: AnnotateResponse = response.json().map_err(|e| OcrError::Provider {
            provider: PROVIDER.to_string(),
            message: format!("invalid response: {}", e),
        })?;

        let text = extract_text(parsed)?;
        info!("Cloud OCR returned {} characters", text.len());
        Ok(text)
    }
}

fn extract_text(response: AnnotateResponse) -> Result<String, OcrError> {
    let first = response.responses.into_iter().next();
    match first {
        Some(ImageResponse {
            error: Some(status), ..
        }) => Err(OcrError::Provider {
            provider: PROVIDER.to_string(),
            message: status.message,
        }),
        Some(ImageResponse {
            full_text_annotation: Some(annotation),
            ..
        }) => Ok(annotation.text),
        _ => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> CloudOcrProvider {
        CloudOcrProvider::from_config(&CloudOcrConfig {
            api_key: Some("k".to_string()),
            endpoint: "https://vision.example.com/".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_missing_api_key() {
        let err = CloudOcrProvider::from_config(&CloudOcrConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, OcrError::MissingApiKey));
    }

    #[test]
    fn test_request_body_shape() {
        let p = provider();
        assert_eq!(p.url, "https://vision.example.com/v1/images:annotate");

        let body = serde_json::to_value(p.request_body(b"img")).unwrap();
        let request = &body["requests"][0];
        assert_eq!(request["image"]["content"], "aW1n");
        assert_eq!(request["features"][0]["type"], "DOCUMENT_TEXT_DETECTION");
        assert_eq!(request["imageContext"]["languageHints"][0], "pt");
    }

    #[test]
    fn test_extract_text_from_response() {
        let ok: AnnotateResponse = serde_json::from_str(
            r#"{"responses":[{"fullTextAnnotation":{"text":"Nome: Ana\n"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(ok).unwrap(), "Nome: Ana\n");

        let empty: AnnotateResponse = serde_json::from_str(r#"{"responses":[{}]}"#).unwrap();
        assert_eq!(extract_text(empty).unwrap(), "");

        let failed: AnnotateResponse = serde_json::from_str(
            r#"{"responses":[{"error":{"code":3,"message":"Bad image data."}}]}"#,
        )
        .unwrap();
        assert!(matches!(
            extract_text(failed),
            Err(OcrError::Provider { message, .. }) if message == "Bad image data."
        ));
    }
}
