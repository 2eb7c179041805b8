//! Single-image edit instructions: appearance colours, clothing swaps and
//! retouching. Each one is a fixed preamble, zero or more conditional
//! clauses, and a fixed closing sentence.

use serde::{Deserialize, Serialize};

use crate::llm::media::ImageData;
use crate::studio::phrases::{color_name, EYE_COLOR_LABELS, HAIR_COLOR_LABELS};

pub const MAX_CLOTHING_REFERENCES: usize = 5;

const APPEARANCE_PREAMBLE: &str = "Edit this photo of a person. Keep the person, pose, background, and clothing EXACTLY the same. ONLY change the following specific features:";
const APPEARANCE_NO_CHANGES: &str = "No changes specified — return the image as-is.";
const APPEARANCE_CLOSING: &str = "Do NOT change anything else about the person — same face, same expression, same body, same clothing, same background. Output a single photorealistic image.";

const CLOTHING_PREAMBLE: &str = "Edit this photo of a person. Change ONLY the clothing they are wearing. Keep the person's face, expression, hair, body, pose, and background EXACTLY the same — do NOT alter anything other than the clothes.";
const CLOTHING_REFERENCE_CLAUSE: &str = "Dress the person in the exact clothing shown in the provided clothing reference image(s). Match the style, color, fit, and details precisely.";
const CLOTHING_CLOSING: &str = "Output a single photorealistic image. The person must look identical except for the clothing.";

const RETOUCH_WHOLE_IMAGE: &str = "Retouch this photo. Remove all blemishes, acne, spots, scars, dark circles, uneven skin texture, and any visible skin imperfections. Smooth and even out the skin tone while keeping it looking completely natural and photorealistic. Do NOT change the person's facial features, face shape, eye color, hair, expression, pose, clothing, or background. Only clean up and retouch the skin. Output a single photorealistic image.";
const RETOUCH_MASKED: &str = "Look at the second image — it is a black and white mask. The WHITE areas indicate the regions that need retouching on the first image. ONLY retouch those specific white-masked areas: remove blemishes, acne, spots, scars, dark circles, and skin imperfections in those regions. Keep ALL other areas completely untouched. Do NOT change facial features, face shape, eye color, hair, expression, pose, clothing, or background. Output a single photorealistic image.";

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|value| value.trim()).filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppearanceEdit {
    #[serde(default)]
    pub skin_color: Option<String>,
    #[serde(default)]
    pub hair_color: Option<String>,
    #[serde(default)]
    pub eye_color: Option<String>,
    #[serde(default)]
    pub hair_reference: Option<ImageData>,
    #[serde(default)]
    pub eye_reference: Option<ImageData>,
}

impl AppearanceEdit {
    pub fn has_changes(&self) -> bool {
        non_empty(self.skin_color.as_ref()).is_some()
            || non_empty(self.hair_color.as_ref()).is_some()
            || non_empty(self.eye_color.as_ref()).is_some()
            || self.hair_reference.is_some()
            || self.eye_reference.is_some()
    }

    pub fn prompt(&self) -> String {
        let mut parts = vec![APPEARANCE_PREAMBLE.to_string()];

        if let Some(skin) = non_empty(self.skin_color.as_ref()) {
            parts.push(format!("- Change their skin color to: {}.", skin));
        }
        if let Some(hair) = non_empty(self.hair_color.as_ref()) {
            parts.push(format!(
                "- Change their hair color to: {} ({}).",
                color_name(hair, HAIR_COLOR_LABELS),
                hair
            ));
        }
        if self.hair_reference.is_some() {
            parts.push("- Change their hair to match the color and style shown in the provided hair reference image.".to_string());
        }
        if let Some(eye) = non_empty(self.eye_color.as_ref()) {
            parts.push(format!(
                "- Change their eye color to: {} ({}).",
                color_name(eye, EYE_COLOR_LABELS),
                eye
            ));
        }
        if self.eye_reference.is_some() {
            parts.push(
                "- Change their eyes to match the color shown in the provided eye reference image."
                    .to_string(),
            );
        }
        if !self.has_changes() {
            parts.push(APPEARANCE_NO_CHANGES.to_string());
        }

        parts.push(APPEARANCE_CLOSING.to_string());
        parts.join("\n")
    }

    pub fn reference_images(&self, source: &ImageData) -> Vec<ImageData> {
        let mut images = vec![source.clone()];
        images.extend(self.hair_reference.iter().cloned());
        images.extend(self.eye_reference.iter().cloned());
        images
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClothingEdit {
    #[serde(default)]
    pub clothing_images: Vec<ImageData>,
    #[serde(default)]
    pub description: String,
}

impl ClothingEdit {
    pub fn has_changes(&self) -> bool {
        !self.clothing_images.is_empty() || !self.description.trim().is_empty()
    }

    pub fn prompt(&self) -> String {
        let mut parts = vec![CLOTHING_PREAMBLE.to_string()];
        if !self.clothing_images.is_empty() {
            parts.push(CLOTHING_REFERENCE_CLAUSE.to_string());
        }
        let description = self.description.trim();
        if !description.is_empty() {
            parts.push(format!("Clothing description: {}.", description));
        }
        parts.push(CLOTHING_CLOSING.to_string());
        parts.join("\n")
    }

    /// Source image first, then at most [`MAX_CLOTHING_REFERENCES`] clothing images.
    pub fn reference_images(&self, source: &ImageData) -> Vec<ImageData> {
        let mut images = vec![source.clone()];
        images.extend(
            self.clothing_images
                .iter()
                .take(MAX_CLOTHING_REFERENCES)
                .cloned(),
        );
        images
    }
}

pub fn retouch_instruction(has_mask: bool) -> &'static str {
    if has_mask {
        RETOUCH_MASKED
    } else {
        RETOUCH_WHOLE_IMAGE
    }
}
