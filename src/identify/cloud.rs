//! Gemini `generateContent` client.
//!
//! The captured frame is shrunk to the payload side limit, JPEG encoded and
//! sent inline with a prompt that lists the density table's ingredients. The
//! model's answer comes back verbatim; any failure becomes
//! [`BakeError::Backend`] with the service's own message.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use frame_scale::presets::{AspectMode, ScaleTarget, build_plan};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Identification, IngredientIdentifier, prompt};
use crate::config::CloudConfig;
use crate::density::DensityTable;
use crate::error::{BakeError, BakeResult};
use crate::frame::Frame;

const BACKEND: &str = "gemini";

pub struct CloudIdentifier {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
    payload_max_side: Option<u32>,
    jpeg_quality: u8,
    table: Arc<DensityTable>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Image {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ApiError {
    message: String,
}

impl CloudIdentifier {
    pub fn from_config(config: &CloudConfig, table: Arc<DensityTable>) -> BakeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BakeError::backend(BACKEND, e))?;
        let base = config.base_url.trim_end_matches('/');

        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            endpoint: format!("{base}/v1beta/models/{}:generateContent", config.model),
            model: config.model.clone(),
            payload_max_side: config.payload_max_side,
            jpeg_quality: config.jpeg_quality,
            table,
        })
    }

    async fn generate(&self, api_key: &str, jpeg: Vec<u8>) -> BakeResult<String> {
        let prompt = prompt(&self.table);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Image {
                        inline_data: InlineData {
                            mime_type: "image/jpeg",
                            data: STANDARD.encode(&jpeg),
                        },
                    },
                    Part::Text { text: &prompt },
                ],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BakeError::backend(BACKEND, e))?;
        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| BakeError::backend(BACKEND, e))?;
        debug!(%status, bytes = raw.len(), "gemini response");

        let parsed: GenerateResponse = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(BakeError::backend(BACKEND, format!("HTTP {status}: {raw}")));
            }
            Err(e) => {
                return Err(BakeError::backend(BACKEND, format!("malformed response: {e}")));
            }
        };
        if let Some(error) = parsed.error {
            return Err(BakeError::backend(BACKEND, error.message));
        }
        if !status.is_success() {
            return Err(BakeError::backend(BACKEND, format!("HTTP {status}")));
        }

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(BakeError::backend(BACKEND, "response contained no text"));
        }
        Ok(text)
    }
}

/// JPEG bytes actually uploaded for `frame`.
fn encode_payload(frame: &Frame, max_side: Option<u32>, quality: u8) -> BakeResult<Vec<u8>> {
    let Some(max_side) = max_side else {
        return frame.encode_jpeg(quality);
    };
    let plan = build_plan(frame.size(), ScaleTarget::MaxLongSide(max_side), AspectMode::Preserve);
    if plan.is_identity() {
        return frame.encode_jpeg(quality);
    }
    let pixels = frame_scale::cpu::scale_rgb(&frame.pixels, frame.size(), &plan)?;
    Frame::from_rgb(plan.out.w, plan.out.h, pixels)?.encode_jpeg(quality)
}

#[async_trait]
impl IngredientIdentifier for CloudIdentifier {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn identify(&self, frame: Arc<Frame>) -> BakeResult<Option<Identification>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(BakeError::backend(
                BACKEND,
                "no API key configured; set GEMINI_API_KEY",
            ));
        };

        let (max_side, quality) = (self.payload_max_side, self.jpeg_quality);
        let jpeg = tokio::task::spawn_blocking(move || encode_payload(&frame, max_side, quality))
            .await
            .map_err(|e| BakeError::backend(BACKEND, format!("payload encoding did not complete: {e}")))??;
        info!(
            model = %self.model,
            bytes = jpeg.len(),
            "sending frame for identification"
        );

        let text = self.generate(api_key, jpeg).await?;
        Ok(Some(Identification::describe(text, &self.table)))
    }
}
