//! Core `TutorAi` trait and the `GeminiClient` implementation.
//!
//! `GeminiClient` calls the Generative Language REST API
//! (`/v1beta/models/{model}:generateContent`).  All connection details come
//! from [`AiConfig`]; nothing is hardcoded.  Every response is checked
//! strictly: any shape mismatch is an [`AiError`], which the
//! [`FallbackTutor`](crate::ai::FallbackTutor) turns into a local result.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::ai::image::{AspectRatio, ImageData, ImageRef};
use crate::ai::prompt;
use crate::config::AiConfig;
use crate::lesson::{fresh_id, Lesson, Tier};

// ---------------------------------------------------------------------------
// AiError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum AiError {
    /// No API key in the config file or the environment.
    #[error("no API key configured")]
    MissingApiKey,

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("AI request timed out")]
    Timeout,

    /// Non-success HTTP status.
    #[error("AI service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response was not the JSON shape we asked for.
    #[error("failed to parse AI response: {0}")]
    Parse(String),

    /// The response contained no usable text part.
    #[error("AI returned an empty response")]
    EmptyResponse,

    /// The image model answered without an image part.
    #[error("AI response contained no image")]
    NoImage,
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AiError::Timeout
        } else {
            AiError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// FeedbackResponse
// ---------------------------------------------------------------------------

/// Pass/fail verdict on one captured frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction_prompt: Option<String>,
}

// ---------------------------------------------------------------------------
// TutorAi trait
// ---------------------------------------------------------------------------

/// The three remote operations behind the tutor.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn TutorAi>` between the orchestrator and its spawned requests.
#[async_trait]
pub trait TutorAi: Send + Sync {
    /// Grade `image` as an attempt at `target`, optionally answering a
    /// question the student asked aloud.
    async fn analyze_hand_shape(
        &self,
        target: &str,
        image: &ImageData,
        spoken_question: Option<&str>,
    ) -> Result<FeedbackResponse, AiError>;

    /// Draw an image for `prompt` at `aspect_ratio`.
    async fn generate_reference_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<ImageRef, AiError>;

    /// Turn free-form speech ("teach me how to sign coffee") into a lesson.
    async fn create_lesson_from_intent(&self, free_text: &str) -> Result<Lesson, AiError>;
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

pub struct GeminiClient {
    client: reqwest::Client,
    config: AiConfig,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Build a client from application config.
    ///
    /// A timeout is applied only when `config.timeout_secs` is set.
    pub fn from_config(config: &AiConfig) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder.build().unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key: config.resolved_api_key(),
            config: config.clone(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, model: &str, body: Value) -> Result<Value, AiError> {
        let key = self.api_key.as_deref().ok_or(AiError::MissingApiKey)?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        log::debug!("ai: POST {url}");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl TutorAi for GeminiClient {
    async fn analyze_hand_shape(
        &self,
        target: &str,
        image: &ImageData,
        spoken_question: Option<&str>,
    ) -> Result<FeedbackResponse, AiError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "inlineData": { "mimeType": image.mime_type, "data": image.data } },
                    { "text": prompt::analysis_prompt(target, spoken_question) }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema":   prompt::feedback_schema()
            }
        });

        let json = self.generate(&self.config.analysis_model, body).await?;
        parse_feedback(first_text(&json).ok_or(AiError::EmptyResponse)?)
    }

    async fn generate_reference_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<ImageRef, AiError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": { "aspectRatio": aspect_ratio.as_str() }
            }
        });

        let json = self.generate(&self.config.image_model, body).await?;
        first_inline_image(&json)
            .map(ImageRef::Inline)
            .ok_or(AiError::NoImage)
    }

    async fn create_lesson_from_intent(&self, free_text: &str) -> Result<Lesson, AiError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt::lesson_prompt(free_text) }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema":   prompt::lesson_schema()
            }
        });

        let json = self.generate(&self.config.lesson_model, body).await?;
        parse_lesson(first_text(&json).ok_or(AiError::EmptyResponse)?)
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

fn parts(response: &Value) -> impl Iterator<Item = &Value> {
    response["candidates"][0]["content"]["parts"]
        .as_array()
        .into_iter()
        .flatten()
}

/// First non-empty text part of a `generateContent` response.
pub fn first_text(response: &Value) -> Option<&str> {
    parts(response)
        .filter_map(|p| p["text"].as_str())
        .map(str::trim)
        .find(|t| !t.is_empty())
}

/// First inline image part of a `generateContent` response.
pub fn first_inline_image(response: &Value) -> Option<ImageData> {
    parts(response).find_map(|p| {
        let inline = &p["inlineData"];
        let data = inline["data"].as_str().filter(|d| !d.is_empty())?;
        let mime_type = inline["mimeType"].as_str().unwrap_or("image/png");
        Some(ImageData {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    })
}

/// Models occasionally wrap JSON in a Markdown fence even when told not to.
fn strip_fence(text: &str) -> &str {
    let t = text.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse and validate structured feedback.
pub fn parse_feedback(text: &str) -> Result<FeedbackResponse, AiError> {
    let mut feedback: FeedbackResponse =
        serde_json::from_str(strip_fence(text)).map_err(|e| AiError::Parse(e.to_string()))?;

    feedback.message = feedback.message.trim().to_string();
    if feedback.message.is_empty() {
        return Err(AiError::Parse("feedback message is empty".into()));
    }
    feedback.correction_prompt = feedback
        .correction_prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    Ok(feedback)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LessonPayload {
    target: String,
    description: String,
    difficulty: String,
    image_prompt: String,
}

/// Parse a generated lesson.  The identifier is always freshly generated,
/// whatever the model sent.
pub fn parse_lesson(text: &str) -> Result<Lesson, AiError> {
    let payload: LessonPayload =
        serde_json::from_str(strip_fence(text)).map_err(|e| AiError::Parse(e.to_string()))?;

    let target = payload.target.trim().to_uppercase();
    if target.is_empty() {
        return Err(AiError::Parse("lesson target is empty".into()));
    }
    let image_prompt = payload.image_prompt.trim().to_string();
    if image_prompt.is_empty() {
        return Err(AiError::Parse("lesson image prompt is empty".into()));
    }

    Ok(Lesson {
        id: fresh_id("custom"),
        target,
        description: payload.description.trim().to_string(),
        difficulty: Tier::parse(&payload.difficulty).unwrap_or(Tier::Intermediate),
        image_prompt,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn text_response(text: &str) -> Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
    }

    #[test]
    fn first_text_skips_empty_parts() {
        let resp = json!({ "candidates": [{ "content": { "parts": [
            { "text": "  " },
            { "text": "{\"a\":1}" }
        ] } }] });
        assert_eq!(first_text(&resp), Some("{\"a\":1}"));
    }

    #[test]
    fn first_text_on_missing_candidates() {
        assert_eq!(first_text(&json!({ "error": "quota" })), None);
    }

    #[test]
    fn first_inline_image_finds_image_after_text() {
        let resp = json!({ "candidates": [{ "content": { "parts": [
            { "text": "here you go" },
            { "inlineData": { "mimeType": "image/png", "data": "iVBORw0K" } }
        ] } }] });
        let img = first_inline_image(&resp).unwrap();
        assert_eq!(img.mime_type, "image/png");
        assert_eq!(img.data, "iVBORw0K");
    }

    #[test]
    fn first_inline_image_none_without_image() {
        assert!(first_inline_image(&text_response("sorry, no image")).is_none());
    }

    #[test]
    fn parse_feedback_accepts_valid_json() {
        let f = parse_feedback(
            r#"{"success": false, "message": "Tuck your thumb.", "correctionPrompt": "thumb tucked"}"#,
        )
        .unwrap();
        assert!(!f.success);
        assert_eq!(f.message, "Tuck your thumb.");
        assert_eq!(f.correction_prompt.as_deref(), Some("thumb tucked"));
    }

    #[test]
    fn parse_feedback_accepts_fenced_json() {
        let f = parse_feedback("```json\n{\"success\": true, \"message\": \"Great!\"}\n```").unwrap();
        assert!(f.success);
        assert!(f.correction_prompt.is_none());
    }

    #[test]
    fn parse_feedback_rejects_malformed() {
        assert!(matches!(parse_feedback("not json"), Err(AiError::Parse(_))));
        assert!(matches!(
            parse_feedback(r#"{"message": "missing success"}"#),
            Err(AiError::Parse(_))
        ));
        assert!(matches!(
            parse_feedback(r#"{"success": true, "message": "  "}"#),
            Err(AiError::Parse(_))
        ));
    }

    #[test]
    fn parse_lesson_generates_fresh_id() {
        let text = r#"{"id": "model-id", "target": "coffee", "description": "Grind.",
                       "difficulty": "intermediate", "imagePrompt": "person signing coffee"}"#;
        let a = parse_lesson(text).unwrap();
        let b = parse_lesson(text).unwrap();
        assert_eq!(a.target, "COFFEE");
        assert_eq!(a.difficulty, Tier::Intermediate);
        assert_ne!(a.id, "model-id");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn parse_lesson_unknown_difficulty_defaults() {
        let text = r#"{"target": "x", "description": "", "difficulty": "expert", "imagePrompt": "p"}"#;
        assert_eq!(parse_lesson(text).unwrap().difficulty, Tier::Intermediate);
    }

    #[test]
    fn parse_lesson_rejects_blank_target() {
        let text = r#"{"target": " ", "description": "d", "difficulty": "Beginner", "imagePrompt": "p"}"#;
        assert!(matches!(parse_lesson(text), Err(AiError::Parse(_))));
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let config = AiConfig {
            api_key: None,
            base_url: "http://127.0.0.1:9".into(),
            ..AiConfig::default()
        };
        let mut client = GeminiClient::from_config(&config);
        // Environment keys must not leak into this test.
        client.api_key = None;

        let img = ImageData::from_bytes("image/jpeg", b"frame");
        let err = client.analyze_hand_shape("A", &img, None).await.unwrap_err();
        assert!(matches!(err, AiError::MissingApiKey));
    }

    #[test]
    fn client_is_object_safe() {
        let client: Box<dyn TutorAi> = Box::new(GeminiClient::from_config(&AiConfig::default()));
        drop(client);
    }
}
