// src/services/gemini_service.rs
use crate::config::AppConfig;
use crate::errors::{ADVICE_FAILED, EDIT_FAILED, StyleError, TRY_ON_FAILED};
use crate::models::{DEFAULT_IMAGE_MIME, EncodedImagePart, GroundingSource, StyleAdvice};
use crate::services::StyleService;
use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const TRY_ON_PROMPT: &str = r#"
You are a virtual fitting room. The first image shows a person; the second image shows a clothing item.
Analyze the clothing in the second image (cut, fabric, color, pattern, and details) and realistically place
it on the person in the first image.

Requirements:
- Preserve the person's identity, face, hair, body shape, and skin tone exactly.
- Keep the person's pose and the original background unchanged.
- The clothing must fit naturally: follow the body's contours, with believable folds, drape, and scale.
- Match the lighting, shadows, and color temperature of the original photo.
- Replace only the garment the item corresponds to; leave everything else as it is.

Output only the resulting image, with no text.
"#;

const STYLE_ADVISOR_PERSONA: &str = "You are a friendly, knowledgeable style advisor. \
Give practical fashion advice tailored to the question, and cite your sources when possible.";

fn edit_prompt(instruction: &str) -> String {
    format!(
        "Edit this photo according to the following request: \"{}\". \
         Apply only the requested change and keep everything else identical, including the person, \
         their pose, the clothing that was not mentioned, and the background. \
         The result must remain photorealistic. Output only the edited image.",
        instruction
    )
}

pub struct GeminiService {
    api_key: Option<String>,
    api_base: String,
    image_model: String,
    text_model: String,
    client: Client,
}

impl GeminiService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
            image_model: config.image_model.clone(),
            text_model: config.text_model.clone(),
            client: Client::new(),
        }
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, StyleError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| StyleError::Upstream("Gemini API key not configured".to_string()))?;

        let start = Instant::now();
        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.api_base, model
            ))
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| StyleError::Upstream(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(StyleError::Upstream(format!(
                "Gemini error ({}): {}",
                status, error_text
            )));
        }

        let result = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| StyleError::Upstream(format!("Failed to parse Gemini response: {}", e)))?;

        debug!(
            "Gemini {} answered in {} ms",
            model,
            start.elapsed().as_millis()
        );
        Ok(result)
    }

    async fn generate_image(
        &self,
        request: GenerateContentRequest,
    ) -> Result<EncodedImagePart, StyleError> {
        let response = self.generate_content(&self.image_model, &request).await?;
        first_image(response)
    }
}

#[async_trait]
impl StyleService for GeminiService {
    async fn compose_try_on(
        &self,
        model: &EncodedImagePart,
        clothing: &EncodedImagePart,
    ) -> Result<EncodedImagePart, StyleError> {
        self.generate_image(try_on_request(model, clothing))
            .await
            .map_err(|e| {
                error!("Error in compose_try_on: {}", e);
                StyleError::Generation(TRY_ON_FAILED.to_string())
            })
    }

    async fn edit_image(
        &self,
        base: &EncodedImagePart,
        instruction: &str,
    ) -> Result<EncodedImagePart, StyleError> {
        self.generate_image(edit_request(base, instruction))
            .await
            .map_err(|e| {
                error!("Error in edit_image: {}", e);
                StyleError::Generation(EDIT_FAILED.to_string())
            })
    }

    async fn style_advice(&self, prompt: &str) -> Result<StyleAdvice, StyleError> {
        let request = advice_request(prompt);
        self.generate_content(&self.text_model, &request)
            .await
            .and_then(advice_from)
            .map_err(|e| {
                error!("Error in style_advice: {}", e);
                StyleError::Advice(ADVICE_FAILED.to_string())
            })
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// Wire types for the generateContent endpoint.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

fn image_part(image: &EncodedImagePart) -> Part {
    Part {
        text: None,
        inline_data: Some(InlineData {
            mime_type: Some(image.mime_type.clone()),
            data: image.data.clone(),
        }),
    }
}

fn text_part(text: impl Into<String>) -> Part {
    Part {
        text: Some(text.into()),
        inline_data: None,
    }
}

fn image_only_request(parts: Vec<Part>) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
        system_instruction: None,
        generation_config: Some(GenerationConfig {
            response_modalities: vec!["IMAGE"],
        }),
        tools: Vec::new(),
    }
}

fn try_on_request(model: &EncodedImagePart, clothing: &EncodedImagePart) -> GenerateContentRequest {
    image_only_request(vec![
        image_part(model),
        image_part(clothing),
        text_part(TRY_ON_PROMPT.trim()),
    ])
}

fn edit_request(base: &EncodedImagePart, instruction: &str) -> GenerateContentRequest {
    image_only_request(vec![image_part(base), text_part(edit_prompt(instruction))])
}

fn advice_request(prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![text_part(prompt)],
        }],
        system_instruction: Some(Content {
            role: None,
            parts: vec![text_part(STYLE_ADVISOR_PERSONA)],
        }),
        generation_config: None,
        tools: vec![Tool {
            google_search: GoogleSearch {},
        }],
    }
}

/// First inline image in the first candidate. A missing MIME type is assumed to be PNG.
fn first_image(response: GenerateContentResponse) -> Result<EncodedImagePart, StyleError> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.inline_data)
                .find(|inline| !inline.data.is_empty())
        })
        .map(|inline| {
            let mime_type = inline
                .mime_type
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
            EncodedImagePart::new(inline.data, mime_type)
        })
        .ok_or_else(|| {
            StyleError::Upstream(
                "No image data in response. The model may not have been able to process the request."
                    .to_string(),
            )
        })
}

fn advice_from(response: GenerateContentResponse) -> Result<StyleAdvice, StyleError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| StyleError::Upstream("No candidates in response".to_string()))?;

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(StyleError::Upstream("No text in response".to_string()));
    }

    let chunks = candidate
        .grounding_metadata
        .map(|metadata| metadata.grounding_chunks)
        .unwrap_or_default();

    Ok(StyleAdvice {
        text,
        sources: filter_sources(chunks.into_iter().filter_map(|chunk| chunk.web).map(
            |web| (web.uri.unwrap_or_default(), web.title.unwrap_or_default()),
        )),
    })
}

/// Keeps only citations with both a URI and a title, in their original order.
pub fn filter_sources<I>(raw: I) -> Vec<GroundingSource>
where
    I: IntoIterator<Item = (String, String)>,
{
    raw.into_iter()
        .filter(|(uri, title)| !uri.is_empty() && !title.is_empty())
        .map(|(uri, title)| GroundingSource { uri, title })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    fn offline_service() -> GeminiService {
        GeminiService::new(&AppConfig::from_lookup(|_| None))
    }

    #[test]
    fn sources_missing_uri_or_title_are_dropped() {
        let sources = filter_sources(vec![
            ("a".to_string(), "A".to_string()),
            ("".to_string(), "B".to_string()),
            ("c".to_string(), "".to_string()),
        ]);
        assert_eq!(
            sources,
            vec![GroundingSource {
                uri: "a".to_string(),
                title: "A".to_string()
            }]
        );
    }

    #[test]
    fn try_on_request_declares_image_only_output() {
        let model = EncodedImagePart::new("TU9ERUw=", "image/jpeg");
        let clothing = EncodedImagePart::new("Q0xPVEg=", "image/png");
        let body = serde_json::to_value(try_on_request(&model, &clothing)).unwrap();

        assert_eq!(body["generationConfig"]["responseModalities"], json!(["IMAGE"]));
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["inlineData"]["data"], "TU9ERUw=");
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "Q0xPVEg=");
        assert!(parts[2]["text"].as_str().unwrap().contains("Output only the resulting image"));
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn edit_request_embeds_instruction() {
        let base = EncodedImagePart::new("QkFTRQ==", "image/png");
        let body = serde_json::to_value(edit_request(&base, "make the shirt blue")).unwrap();

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert!(parts[1]["text"].as_str().unwrap().contains("\"make the shirt blue\""));
        assert_eq!(body["generationConfig"]["responseModalities"], json!(["IMAGE"]));
    }

    #[test]
    fn advice_request_enables_search_with_persona() {
        let body = serde_json::to_value(advice_request("what goes with olive?")).unwrap();

        assert_eq!(body["tools"], json!([{ "googleSearch": {} }]));
        assert_eq!(body["contents"][0]["parts"][0]["text"], "what goes with olive?");
        assert!(
            body["systemInstruction"]["parts"][0]["text"]
                .as_str()
                .unwrap()
                .contains("style advisor")
        );
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn first_image_skips_leading_text_parts() {
        let parsed = first_image(response(json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "Here you go" },
                    { "inlineData": { "mimeType": "image/jpeg", "data": "XYZ" } }
                ]}
            }]
        })))
        .unwrap();
        assert_eq!(parsed, EncodedImagePart::new("XYZ", "image/jpeg"));
    }

    #[test]
    fn first_image_defaults_mime_to_png() {
        let parsed = first_image(response(json!({
            "candidates": [{ "content": { "parts": [{ "inlineData": { "data": "XYZ" } }] } }]
        })))
        .unwrap();
        assert_eq!(parsed, EncodedImagePart::new("XYZ", "image/png"));
    }

    #[test]
    fn response_without_image_is_an_error() {
        let text_only = response(json!({
            "candidates": [{ "content": { "parts": [{ "text": "I can't do that" }] } }]
        }));
        assert!(matches!(first_image(text_only), Err(StyleError::Upstream(_))));
        assert!(matches!(
            first_image(response(json!({}))),
            Err(StyleError::Upstream(_))
        ));
    }

    #[test]
    fn advice_collects_text_and_filtered_sources() {
        let advice = advice_from(response(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Try rust " }, { "text": "and mustard." }] },
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "https://a.example", "title": "A" } },
                    { "web": { "uri": "", "title": "B" } },
                    { "web": { "title": "C" } },
                    { "retrievedContext": {} }
                ]}
            }]
        })))
        .unwrap();

        assert_eq!(advice.text, "Try rust and mustard.");
        assert_eq!(
            advice.sources,
            vec![GroundingSource {
                uri: "https://a.example".to_string(),
                title: "A".to_string()
            }]
        );
    }

    #[test]
    fn advice_without_text_is_malformed() {
        let empty = response(json!({ "candidates": [{ "content": { "parts": [] } }] }));
        assert!(matches!(advice_from(empty), Err(StyleError::Upstream(_))));
    }

    #[tokio::test]
    async fn missing_api_key_fails_with_user_facing_messages() {
        let service = offline_service();
        let part = EncodedImagePart::new("QQ==", "image/png");

        assert_eq!(
            service.compose_try_on(&part, &part).await.unwrap_err(),
            StyleError::Generation(TRY_ON_FAILED.to_string())
        );
        assert_eq!(
            service.edit_image(&part, "brighter").await.unwrap_err(),
            StyleError::Generation(EDIT_FAILED.to_string())
        );
        assert_eq!(
            service.style_advice("hi").await.unwrap_err(),
            StyleError::Advice(ADVICE_FAILED.to_string())
        );
    }
}
