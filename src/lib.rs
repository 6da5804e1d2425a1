//! # qc-vision
//!
//! Quality-check a product image against a reference image using a hosted,
//! OpenAI-compatible vision model.
//!
//! ## Overview
//!
//! A check takes two images and a prompt. Both images are base64-encoded into
//! `data:` URIs, sent together with the prompt and a QC-expert system
//! instruction to the chat completion endpoint, and the model's answer is
//! rendered under a `## QC Result from AI:` heading.
//!
//! The comparison itself happens entirely in the remote model. This crate
//! handles encoding, request assembly, configuration and the two surfaces
//! around them: the `qc-vision` command line tool and a small HTTP endpoint.
//!
//! ## Example
//!
//! ```rust,no_run
//! use qc_vision::{QcClient, QcOptions, ImageDetail, DEFAULT_QC_PROMPT};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = QcOptions::builder()
//!         .api_key(std::env::var("OPENAI_API_KEY")?)
//!         .detail(ImageDetail::High)
//!         .build()?;
//!
//!     let client = QcClient::new(options)?;
//!
//!     // Raw completion JSON
//!     let raw = client
//!         .perform_qc_check(DEFAULT_QC_PROMPT, "img/reference.jpg", "img/check.jpg")
//!         .await?;
//!
//!     // Rendered markdown
//!     println!("{}", qc_vision::extract_result(&raw)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **client**: request assembly, the API call and result extraction
//! - **image**: base64 encoding and image validation
//! - **types**: chat completion wire types
//! - **config**: options builder and environment loading
//! - **prompts**: built-in system instruction and default QC prompt
//! - **retry**: exponential backoff with jitter
//! - **server**: axum routes for multipart uploads
//! - **logging**: tracing subscriber setup
//! - **error**: the `Error` enum and `Result` alias

mod client;
mod config;
mod error;
mod image;
mod prompts;
mod types;

pub mod logging;
pub mod retry;
pub mod server;

// --- Client ---

pub use client::{QcClient, extract_result};

// --- Configuration ---

pub use config::{
    DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, QcOptions,
    QcOptionsBuilder,
};

// --- Error Handling ---

pub use error::{Error, Result};

// --- Images ---

pub use image::{ImageBlock, ImageDetail, encode_bytes, encode_image, mime_type_for_path};

// --- Prompts ---

pub use prompts::{DEFAULT_QC_PROMPT, RESULT_HEADER, SYSTEM_PROMPT, render_result};

// --- Wire Types ---

pub use types::{
    ChatCompletion, ChatMessage, ChatRequest, Choice, ContentPart, ImageUrl, MessageRole,
    ResponseMessage, Usage,
};
