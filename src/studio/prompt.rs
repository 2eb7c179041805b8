//! Compiles a session configuration into the natural-language generation prompt.
//!
//! Fragment order is stable for identical input: lead sentence, scene settings,
//! then one tagged fragment per character in list order. Absent or blank fields
//! are omitted; nothing here can fail.

use crate::studio::phrases::{
    camera_angle_phrase, eye_detail_phrase, lighting_phrase, pose_phrase, skin_detail_phrase,
    skin_tone_label, LEAD_SENTENCE,
};
use crate::studio::types::{
    AspectRatio, CameraAngle, CharacterConfig, DetailLevel, ExpressionPreset, GenerationSettings,
    HairstyleOption, LightingOption, PosePreset,
};

const TOP_LEVEL_SEPARATOR: &str = "\n\n";

const EXACT_HEAD_INSTRUCTION: &str = "CRITICAL: Perfectly replicate this person's EXACT head, face, hair, and all facial features from the provided face reference image with ZERO modifications. The head must be an identical copy — same face shape, jawline, hairline, hair color, hair length, hairstyle, eyebrows, eyes, nose, mouth, ears, skin texture, and every detail. Do NOT alter, stylize, or reinterpret any part of the head. Generate a full body below the head.";
const FACE_REFERENCE_INSTRUCTION: &str = "Use the provided face reference image to recreate this person's exact facial features, skin tone, and details.";
const KEEP_HAIRSTYLE_INSTRUCTION: &str = "Keep the exact hairstyle from the face reference image.";
const HAIRSTYLE_IMAGE_INSTRUCTION: &str = "Use the provided hairstyle reference image.";
const CLOTHING_IMAGE_INSTRUCTION: &str = "Dress this person in the exact clothing shown in the provided clothing reference image.";
const KEEP_EXPRESSION_INSTRUCTION: &str = "Keep the natural expression from the face reference.";
const POSE_REFERENCE_INSTRUCTION: &str = "Match the body pose from the provided pose reference image.";
const PROP_IMAGE_INSTRUCTION: &str = " Use the provided prop reference image.";
const BACKGROUND_IMAGE_INSTRUCTION: &str = "Use the provided background image as the scene background.";
const CONFINE_TO_BACKGROUND_INSTRUCTION: &str = "Keep every person fully inside the provided background scene. Do not extend, replace, or add to the background.";

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn non_empty_opt(value: Option<&String>) -> Option<&str> {
    value.and_then(|value| non_empty(value))
}

pub fn build_prompt(characters: &[CharacterConfig], settings: &GenerationSettings) -> String {
    let mut parts = vec![LEAD_SENTENCE.to_string()];
    parts.extend(settings_fragments(settings));
    parts.extend(
        characters
            .iter()
            .enumerate()
            .map(|(index, character)| character_fragment(character, index)),
    );
    parts.join(TOP_LEVEL_SEPARATOR)
}

/// Scene-level fragments in emission order, excluding the lead sentence.
pub fn settings_fragments(settings: &GenerationSettings) -> Vec<String> {
    let mut parts = Vec::new();

    let custom_ratio = non_empty(&settings.custom_aspect_ratio);
    match (settings.aspect_ratio, custom_ratio) {
        (AspectRatio::Custom, Some(custom)) => {
            parts.push(format!("Image aspect ratio: {}.", custom));
        }
        (AspectRatio::Custom | AspectRatio::Auto, _) => {}
        (ratio, _) => parts.push(format!("Image aspect ratio: {}.", ratio.as_str())),
    }

    let custom_angle = non_empty(&settings.custom_camera_angle);
    match (settings.camera_angle, custom_angle) {
        (CameraAngle::Custom, Some(custom)) => {
            parts.push(format!("Camera angle: {}.", custom));
        }
        (CameraAngle::Custom | CameraAngle::Auto, _) => {}
        (angle, _) => parts.push(format!("Camera angle: {}.", camera_angle_phrase(angle))),
    }

    if settings.lighting != LightingOption::Auto {
        parts.push(format!("Lighting: {}.", lighting_phrase(settings.lighting)));
    }

    if settings.skin_detail != DetailLevel::Auto {
        parts.push(format!("{}.", skin_detail_phrase(settings.skin_detail)));
    }
    if settings.eye_detail != DetailLevel::Auto {
        parts.push(format!("{}.", eye_detail_phrase(settings.eye_detail)));
    }

    let background_text = non_empty(&settings.background_text);
    if settings.background_image.is_some() {
        parts.push(BACKGROUND_IMAGE_INSTRUCTION.to_string());
    }
    if let Some(text) = background_text {
        parts.push(format!("Background/setting: {}.", text));
    }
    if settings.confine_to_background
        && (settings.background_image.is_some() || background_text.is_some())
    {
        parts.push(CONFINE_TO_BACKGROUND_INSTRUCTION.to_string());
    }

    parts
}

/// The tagged fragment for the character at zero-based position `index`.
pub fn character_fragment(character: &CharacterConfig, index: usize) -> String {
    let mut parts = vec![format!("[{}]:", character.display_label(index))];

    if character.face_image.is_some() {
        if character.preserve_exact_head {
            parts.push(EXACT_HEAD_INSTRUCTION.to_string());
        } else {
            parts.push(FACE_REFERENCE_INSTRUCTION.to_string());
        }
    }

    match character.hairstyle_option {
        HairstyleOption::Default => parts.push(KEEP_HAIRSTYLE_INSTRUCTION.to_string()),
        HairstyleOption::CustomText => {
            if let Some(text) = non_empty(&character.hairstyle_text) {
                parts.push(format!("Hairstyle: {}.", text));
            }
        }
        HairstyleOption::CustomImage => parts.push(HAIRSTYLE_IMAGE_INSTRUCTION.to_string()),
    }

    if character.clothing_image.is_some() {
        parts.push(CLOTHING_IMAGE_INSTRUCTION.to_string());
    }
    if let Some(text) = non_empty(&character.clothing_text) {
        parts.push(format!("Clothing: {}.", text));
    }

    parts.push(format!(
        "Body proportions: chest size {}, butt size {}, stomach size {}.",
        character.chest_size, character.butt_size, character.stomach_size
    ));
    parts.push(format!("Skin tone: {}.", skin_tone_label(character.skin_tone)));

    match (
        character.expression_preset,
        non_empty(&character.custom_expression),
    ) {
        (ExpressionPreset::Default, _) => parts.push(KEEP_EXPRESSION_INSTRUCTION.to_string()),
        (ExpressionPreset::Custom, Some(custom)) => {
            parts.push(format!("Expression: {}.", custom));
        }
        (preset, _) => parts.push(format!("Expression: {}.", preset.as_str())),
    }

    if !matches!(character.pose_preset, PosePreset::None | PosePreset::Custom) {
        parts.push(format!("Pose: {}.", pose_phrase(character.pose_preset)));
    }

    if let Some(action) = non_empty(&character.action_prompt) {
        parts.push(format!("Action/pose: {}.", action));
    }

    if character.pose_reference_image.is_some() {
        parts.push(POSE_REFERENCE_INSTRUCTION.to_string());
    }

    for prop in &character.props {
        let Some(name) = non_empty(&prop.name) else {
            continue;
        };
        let mut clause = format!("Prop: {}", name);
        if let Some(placement) = non_empty(&prop.placement) {
            clause.push_str(&format!(" placed {}", placement));
        }
        clause.push('.');
        if prop.image_data.is_some() {
            clause.push_str(PROP_IMAGE_INSTRUCTION);
        }
        parts.push(clause);
    }

    if character.height_enabled {
        let inches = character.height_inches;
        parts.push(format!(
            "Height: {}'{}\" ({} inches).",
            inches / 12,
            inches % 12,
            inches
        ));
    }

    for mark in &character.marks {
        if let Some(description) = non_empty(&mark.description) {
            parts.push(format!(
                "Distinguishing mark ({}): {}.",
                mark.kind.as_str(),
                description
            ));
        }
    }

    if let Some(color) = non_empty_opt(character.skin_color.as_ref()) {
        parts.push(format!("Skin color: {}.", color));
    }
    if let Some(color) = non_empty_opt(character.hair_color.as_ref()) {
        parts.push(format!("Hair color: {}.", color));
    }
    if let Some(color) = non_empty_opt(character.eye_color.as_ref()) {
        parts.push(format!("Eye color: {}.", color));
    }

    parts.join(" ")
}
