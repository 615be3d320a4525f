// src/models.rs
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Base64 image payload paired with its MIME type, ready to embed in a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImagePart {
    pub data: String,
    pub mime_type: String,
}

impl EncodedImagePart {
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// A user-picked input image held in memory until the flow resets.
#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl SelectedImage {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn preview_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    pub fn summary(&self) -> SelectedImageSummary {
        SelectedImageSummary {
            file_name: self.file_name.clone(),
            mime_type: self.mime_type.clone(),
            size: self.bytes.len(),
            preview_url: self.preview_url(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSlot {
    Model,
    Clothing,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectedImageSummary {
    pub file_name: String,
    pub mime_type: String,
    pub size: usize,
    pub preview_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleAdvice {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<GroundingSource>,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            sources: Vec::new(),
            sent_at: Utc::now(),
        }
    }

    pub fn assistant(advice: StyleAdvice) -> Self {
        Self {
            sender: Sender::Assistant,
            text: advice.text,
            sources: advice.sources,
            sent_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tab {
    #[default]
    #[serde(rename = "try-on")]
    TryOn,
    #[serde(rename = "advisor")]
    Advisor,
}

impl Tab {
    pub fn label(&self) -> &'static str {
        match self {
            Tab::TryOn => "Virtual Try-On",
            Tab::Advisor => "Style Advisor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TryOnPhase {
    Idle,
    ComposeInFlight,
    Ready,
    EditInFlight,
    Failed,
}

impl TryOnPhase {
    pub fn is_busy(&self) -> bool {
        matches!(self, TryOnPhase::ComposeInFlight | TryOnPhase::EditInFlight)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TryOnSnapshot {
    pub phase: TryOnPhase,
    pub status_message: Option<String>,
    pub status_step: Option<usize>,
    pub error: Option<String>,
    pub model_image: Option<SelectedImageSummary>,
    pub clothing_image: Option<SelectedImageSummary>,
    pub generated_image: Option<EncodedImagePart>,
    pub edit_prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorPhase {
    Idle,
    RequestInFlight,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvisorSnapshot {
    pub phase: AdvisorPhase,
    pub error: Option<String>,
    pub history: Vec<ChatMessage>,
    pub pending_input: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub active_tab: Tab,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunOptions {
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub instruction: String,
}

#[derive(Debug, Deserialize)]
pub struct AdviceRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct TabRequest {
    pub tab: Tab,
}
