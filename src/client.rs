//! Client for image quality checks
//!
//! [`QcClient`] turns a prompt and two images into one chat completion call:
//!
//! ```text
//! check_quality(reference, check, prompt)
//!     │
//!     ├─> any input missing? ──> "## QC Result from AI:" (no request)
//!     │
//!     ├─> encode both images as data URIs
//!     │
//!     ├─> system instruction + [prompt, reference image, check image]
//!     │
//!     ├─> POST {base_url}/chat/completions
//!     │
//!     └─> choices[0].message.content rendered under the result header
//! ```
//!
//! The HTTP client is built once and reused across checks. Failed calls are
//! retried according to [`QcOptions::retry`], which defaults to a single
//! attempt.
//!
//! # Examples
//!
//! ```rust,no_run
//! use qc_vision::{QcClient, QcOptions, DEFAULT_QC_PROMPT};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = QcClient::new(QcOptions::from_env()?)?;
//!
//!     let markdown = client
//!         .check_quality(
//!             Some(Path::new("img/reference.jpg")),
//!             Some(Path::new("img/check.jpg")),
//!             DEFAULT_QC_PROMPT,
//!         )
//!         .await?;
//!
//!     println!("{}", markdown);
//!     Ok(())
//! }
//! ```

use crate::config::QcOptions;
use crate::image::ImageBlock;
use crate::prompts::{RESULT_HEADER, render_result};
use crate::retry::retry_with_backoff;
use crate::types::{ChatCompletion, ChatMessage, ChatRequest, ContentPart, MessageRole};
use crate::{Error, Result};
use std::path::Path;
use std::time::Duration;

/// Sends QC requests to an OpenAI-compatible completion API
#[derive(Debug, Clone)]
pub struct QcClient {
    options: QcOptions,
    http_client: reqwest::Client,
}

impl QcClient {
    /// Creates a client with a pooled HTTP connection and the configured timeout.
    pub fn new(options: QcOptions) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout()))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            options,
            http_client,
        })
    }

    pub fn options(&self) -> &QcOptions {
        &self.options
    }

    /// Assembles the request: the system instruction, then one user message
    /// holding the query text followed by the reference and check images.
    pub fn build_request(
        &self,
        query: &str,
        reference: &ImageBlock,
        check: &ImageBlock,
    ) -> ChatRequest {
        let user = ChatMessage::new(
            MessageRole::User,
            vec![
                ContentPart::text(query),
                ContentPart::from_image(reference),
                ContentPart::from_image(check),
            ],
        );

        ChatRequest {
            model: self.options.model().to_string(),
            messages: vec![ChatMessage::system(self.options.system_prompt()), user],
            max_tokens: self.options.max_tokens(),
            temperature: self.options.temperature(),
        }
    }

    /// Encodes both image files and returns the raw JSON body of the completion.
    pub async fn perform_qc_check(
        &self,
        query: &str,
        reference_path: impl AsRef<Path>,
        check_path: impl AsRef<Path>,
    ) -> Result<String> {
        let detail = self.options.detail();
        let reference = ImageBlock::from_path(reference_path)?.with_detail(detail);
        let check = ImageBlock::from_path(check_path)?.with_detail(detail);
        self.perform_qc_check_images(query, &reference, &check).await
    }

    /// Same as [`perform_qc_check`](Self::perform_qc_check) for images that are
    /// already encoded, e.g. uploads. Each image keeps its own detail level.
    #[tracing::instrument(skip_all, fields(model = %self.options.model()))]
    pub async fn perform_qc_check_images(
        &self,
        query: &str,
        reference: &ImageBlock,
        check: &ImageBlock,
    ) -> Result<String> {
        tracing::debug!(
            "Reference image: {} (detail: {})",
            reference.display_url(),
            reference.detail()
        );
        tracing::debug!(
            "Check image: {} (detail: {})",
            check.display_url(),
            check.detail()
        );

        let request = self.build_request(query, reference, check);
        let raw = retry_with_backoff(self.options.retry().clone(), || {
            self.send(&request)
        })
        .await?;

        tracing::debug!("Completion payload: {}", raw);
        Ok(raw)
    }

    /// Runs a check from file paths and renders the answer as markdown.
    ///
    /// When either image or the prompt is missing, the bare result header is
    /// returned and no request is made.
    pub async fn check_quality(
        &self,
        reference: Option<&Path>,
        check: Option<&Path>,
        prompt: &str,
    ) -> Result<String> {
        match (reference, check) {
            (Some(reference), Some(check)) if !prompt.is_empty() => {
                let raw = self.perform_qc_check(prompt, reference, check).await?;
                extract_result(&raw)
            }
            _ => {
                tracing::info!("Skipping check, an image or the prompt is missing");
                Ok(RESULT_HEADER.to_string())
            }
        }
    }

    /// Runs a check from already built images and renders the answer as markdown.
    pub async fn check_quality_images(
        &self,
        reference: Option<ImageBlock>,
        check: Option<ImageBlock>,
        prompt: &str,
    ) -> Result<String> {
        match (reference, check) {
            (Some(reference), Some(check)) if !prompt.is_empty() => {
                let raw = self
                    .perform_qc_check_images(prompt, &reference, &check)
                    .await?;
                extract_result(&raw)
            }
            _ => {
                tracing::info!("Skipping check, an image or the prompt is missing");
                Ok(RESULT_HEADER.to_string())
            }
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.options.base_url());
        let response = self
            .http_client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.options.api_key()),
            )
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(Error::from_transport)?;

        // Authentication, rate limits, unknown models, oversized images
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|e| {
                tracing::warn!("Failed to read error response body: {}", e);
                "Unknown error (failed to read response body)".to_string()
            });
            return Err(Error::status(status.as_u16(), body));
        }

        response.text().await.map_err(Error::from_transport)
    }
}

/// Parses a raw completion payload and renders its first message under the
/// result header.
pub fn extract_result(raw: &str) -> Result<String> {
    let completion: ChatCompletion = serde_json::from_str(raw)?;

    if let Some(usage) = completion.usage {
        tracing::info!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "Completion received from {}",
            completion.model
        );
    }

    completion
        .first_message_text()
        .map(render_result)
        .ok_or_else(|| Error::api("response contained no message content"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageDetail;

    fn client() -> QcClient {
        let options = QcOptions::builder()
            .api_key("sk-test")
            .base_url("http://localhost:1234/v1")
            .build()
            .unwrap();
        QcClient::new(options).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = client();
        assert_eq!(client.options().model(), "gpt-4o");
    }

    #[test]
    fn test_build_request_layout() {
        let client = client();
        let reference = ImageBlock::from_base64("AAAA", "image/jpeg").unwrap();
        let check = ImageBlock::from_base64("BBBB", "image/jpeg").unwrap();

        let request = client.build_request("Compare them", &reference, &check);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["max_tokens"], 300);
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);

        let system = &json["messages"][0];
        assert_eq!(system["role"], "system");
        assert_eq!(system["content"][0]["text"], crate::prompts::SYSTEM_PROMPT);

        let user = &json["messages"][1];
        assert_eq!(user["role"], "user");
        assert_eq!(user["content"][0]["type"], "text");
        assert_eq!(user["content"][0]["text"], "Compare them");
        assert_eq!(
            user["content"][1]["image_url"]["url"],
            "data:image/jpeg;base64,AAAA"
        );
        assert_eq!(user["content"][1]["image_url"]["detail"], "low");
        assert_eq!(
            user["content"][2]["image_url"]["url"],
            "data:image/jpeg;base64,BBBB"
        );
    }

    #[test]
    fn test_build_request_keeps_image_detail() {
        let client = client();
        let reference = ImageBlock::from_base64("AAAA", "image/png")
            .unwrap()
            .with_detail(ImageDetail::High);
        let check = ImageBlock::from_base64("AAAA", "image/png").unwrap();

        let request = client.build_request("q", &reference, &check);
        assert_eq!(request.messages[1].image_count(), 2);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][1]["content"][1]["image_url"]["detail"], "high");
        assert_eq!(json["messages"][1]["content"][2]["image_url"]["detail"], "low");
    }

    #[tokio::test]
    async fn test_check_quality_missing_inputs_skips_request() {
        // Nothing listens on this port; reaching the network would fail the test
        let client = client();
        let img = Path::new("unused.jpg");

        for (reference, check, prompt) in [
            (None, Some(img), "prompt"),
            (Some(img), None, "prompt"),
            (Some(img), Some(img), ""),
            (None, None, ""),
        ] {
            let result = client.check_quality(reference, check, prompt).await.unwrap();
            assert_eq!(result, "## QC Result from AI:");
        }
    }

    #[tokio::test]
    async fn test_check_quality_images_missing_inputs() {
        let client = client();
        let image = ImageBlock::from_base64("AAAA", "image/jpeg").unwrap();
        let result = client
            .check_quality_images(Some(image), None, "prompt")
            .await
            .unwrap();
        assert_eq!(result, RESULT_HEADER);
    }

    #[tokio::test]
    async fn test_perform_qc_check_missing_file() {
        let client = client();
        let err = client
            .perform_qc_check("q", "/no/such/reference.jpg", "/no/such/check.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_extract_result() {
        let raw = r#"{"id":"chatcmpl-1","object":"chat.completion","created":1,"model":"gpt-4o",
            "choices":[{"index":0,"finish_reason":"stop","message":{"role":"assistant","content":"All good."}}],
            "usage":{"prompt_tokens":10,"completion_tokens":3,"total_tokens":13}}"#;
        assert_eq!(
            extract_result(raw).unwrap(),
            "## QC Result from AI:\nAll good."
        );
    }

    #[test]
    fn test_extract_result_without_role() {
        let raw = r#"{"choices":[{"message":{"content":"Two items missing."}}]}"#;
        assert_eq!(
            extract_result(raw).unwrap(),
            "## QC Result from AI:\nTwo items missing."
        );
    }

    #[test]
    fn test_extract_result_errors() {
        assert!(matches!(extract_result("not json"), Err(Error::Json(_))));
        assert!(matches!(
            extract_result(r#"{"choices":[]}"#),
            Err(Error::Api(_))
        ));
    }
}
