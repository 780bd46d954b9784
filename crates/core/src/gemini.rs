use crate::config::Config;
use crate::error::{AppError, Result};
use crate::history::ImageDescription;
use crate::image_processing::ImageProcessor;
use crate::services::{
    DescriptionService, Dials, EnhancementOutput, EnhancementRequest, EnhancementService,
    SettingsAdvisor,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use gemini_rust::{Blob, ClientError, Content, Gemini, Message, Part, Role};
use image::DynamicImage;
use tracing::{debug, info, instrument};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

/// Token the image model is asked to emit when it hid the easter egg.
pub const EASTER_EGG_MARKER: &str = "EASTER_EGG_FOUND";

const DESCRIBE_INSTRUCTIONS: &str = "You are helping a photo editor zoom into a picture. \
Describe what the selected region shows and write a short instruction for an image model \
that will upscale it into a sharp, detailed, photorealistic close-up. \
Answer with JSON only: {\"selectionDescription\": string, \"prompt\": string}.";

const ADVISOR_INSTRUCTIONS: &str = "Suggest enhancement settings for this photo. \
Answer with JSON only: {\"sharpness\": 0-100, \"denoise\": 0-100, \"imagination\": 0-100}.";

/// Gemini-backed description, enhancement and advisor services.
pub struct GeminiClient {
    text: Gemini,
    image: Gemini,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            text: Self::client_for(config, &config.model_name)?,
            image: Self::client_for(config, &config.image_model_name)?,
        })
    }

    fn client_for(config: &Config, model: &str) -> Result<Gemini> {
        // Explicit base URL avoids the BadScheme error of the default one
        let base_url = url::Url::parse(BASE_URL)
            .map_err(|e| AppError::Config(format!("Invalid base URL: {}", e)))?;

        let model_name = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };
        let model_url = format!("{}{}", BASE_URL, model_name);

        Gemini::with_model_and_base_url(&config.gemini_api_key, model_url, base_url)
            .map_err(|e| AppError::Config(format!("Failed to create Gemini client: {}", e)))
    }

    fn build_message(text: String, image: &DynamicImage) -> Result<Message> {
        let blob = Blob {
            mime_type: "image/png".to_string(),
            data: ImageProcessor::encode_to_base64_png(image)?,
        };

        let content = Content {
            role: Some(Role::User),
            parts: Some(vec![
                Part::Text {
                    text,
                    thought: None,
                    thought_signature: None,
                },
                Part::InlineData { inline_data: blob },
            ]),
        };

        Ok(Message {
            role: Role::User,
            content,
        })
    }

    async fn send(client: &Gemini, message: Message) -> Result<Vec<Part>> {
        let response = client
            .generate_content()
            .with_messages(vec![message])
            .execute()
            .await
            .map_err(|e| match e {
                ClientError::BadResponse { code, description } => {
                    AppError::from_backend(Some(code), description.unwrap_or_default())
                }
                other => AppError::from_backend(None, format!("API request failed: {}", other)),
            })?;

        response
            .candidates
            .first()
            .and_then(|candidate| candidate.content.parts.clone())
            .ok_or_else(|| AppError::malformed("no candidates in Gemini response"))
    }

    fn collect_text(parts: &[Part]) -> String {
        parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text, thought, .. } if !thought.unwrap_or(false) => {
                    Some(text.as_str())
                }
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Pulls the JSON object out of a reply that may be wrapped in a markdown fence.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn describe_prompt(prior: &[ImageDescription], is_full_image: bool) -> String {
    let mut prompt = String::from(DESCRIBE_INSTRUCTIONS);
    if is_full_image {
        prompt.push_str("\nThe image is the whole photo, not a zoomed region.");
    }
    if !prior.is_empty() {
        prompt.push_str("\nEarlier zoom steps, outermost first:");
        for (i, d) in prior.iter().enumerate() {
            prompt.push_str(&format!("\n{}. {}", i + 1, d.selection_description));
        }
    }
    prompt
}

fn enhance_prompt(request: &EnhancementRequest) -> String {
    let mut prompt = String::from(
        "Enhance this image crop. Keep the composition, upscale it and add plausible detail.",
    );
    prompt.push_str(&format!(
        "\nSharpness: {}/100. Denoise: {}/100. Imagination: {}/100.",
        request.dials.sharpness, request.dials.denoise, request.dials.imagination
    ));
    for p in &request.prompt_history {
        prompt.push_str("\n- ");
        prompt.push_str(p);
    }
    if request.seek_easter_egg {
        prompt.push_str(&format!(
            "\nIf you can, hide a small surprising easter egg in the result \
             and reply with the word {}.",
            EASTER_EGG_MARKER
        ));
    }
    prompt
}

impl DescriptionService for GeminiClient {
    #[instrument(skip_all, fields(prior = prior.len(), is_full_image = is_full_image))]
    async fn describe(
        &self,
        image: &DynamicImage,
        prior: &[ImageDescription],
        is_full_image: bool,
    ) -> Result<ImageDescription> {
        let message = Self::build_message(describe_prompt(prior, is_full_image), image)?;
        let parts = Self::send(&self.text, message).await?;
        let text = Self::collect_text(&parts);
        debug!(chars = text.len(), "description reply received");

        let json = extract_json(&text)
            .ok_or_else(|| AppError::malformed("description reply has no JSON object"))?;
        let description: ImageDescription = serde_json::from_str(json)
            .map_err(|e| AppError::malformed(format!("description reply is not valid: {}", e)))?;
        Ok(description)
    }
}

impl EnhancementService for GeminiClient {
    #[instrument(
        skip_all,
        fields(
            prompts = request.prompt_history.len(),
            w = request.image.width(),
            h = request.image.height()
        )
    )]
    async fn enhance(&self, request: EnhancementRequest) -> Result<EnhancementOutput> {
        let message = Self::build_message(enhance_prompt(&request), &request.image)?;
        let parts = Self::send(&self.image, message).await?;

        let blob = parts
            .iter()
            .find_map(|part| match part {
                Part::InlineData { inline_data, .. } => Some(inline_data),
                _ => None,
            })
            .ok_or_else(|| AppError::malformed("enhancement reply contains no image"))?;

        let image_bytes = BASE64
            .decode(blob.data.trim())
            .map_err(|e| AppError::malformed(format!("enhancement image is not base64: {}", e)))?;
        let found_easter_egg =
            request.seek_easter_egg && Self::collect_text(&parts).contains(EASTER_EGG_MARKER);

        info!(
            bytes = image_bytes.len(),
            mime = %blob.mime_type,
            found_easter_egg,
            "enhanced image received"
        );
        Ok(EnhancementOutput {
            image_bytes,
            found_easter_egg,
        })
    }
}

impl SettingsAdvisor for GeminiClient {
    #[instrument(skip_all)]
    async fn recommend(&self, image: &DynamicImage) -> Result<Dials> {
        let message = Self::build_message(ADVISOR_INSTRUCTIONS.to_string(), image)?;
        let parts = Self::send(&self.text, message).await?;
        let text = Self::collect_text(&parts);
        let json = extract_json(&text)
            .ok_or_else(|| AppError::malformed("advisor reply has no JSON object"))?;
        Dials::from_json(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_extracted_from_fenced_reply() {
        let reply =
            "```json\n{\"selectionDescription\": \"a cat\", \"prompt\": \"sharpen fur\"}\n```";
        let json = extract_json(reply).unwrap();
        let d: ImageDescription = serde_json::from_str(json).unwrap();
        assert_eq!(d.prompt, "sharpen fur");
        assert_eq!(extract_json("no braces here"), None);
    }

    #[test]
    fn enhance_prompt_lists_history_and_dials() {
        let request = EnhancementRequest {
            image: DynamicImage::new_rgba8(1, 1),
            prompt_history: vec!["first".into(), "second".into()],
            seek_easter_egg: true,
            dials: Dials::new(10, 20, 30),
        };
        let prompt = enhance_prompt(&request);
        assert!(prompt.contains("- first\n- second"));
        assert!(prompt.contains("Imagination: 30/100"));
        assert!(prompt.contains(EASTER_EGG_MARKER));
    }

    #[test]
    fn describe_prompt_mentions_prior_steps() {
        let prior = vec![ImageDescription {
            selection_description: "a harbour".into(),
            prompt: "p".into(),
        }];
        let prompt = describe_prompt(&prior, false);
        assert!(prompt.contains("1. a harbour"));
        assert!(!prompt.contains("whole photo"));
    }
}
