use crate::llm::media::ImageData;
use crate::studio::types::{CharacterConfig, GenerationSettings, HairstyleOption};

/// Reference images in the positional order the gateway attaches them:
/// background, then per character face, clothing, pose reference, hairstyle
/// (custom-image mode only) and prop images. Missing images are skipped and
/// repeated payloads are kept.
pub fn collect_reference_images(
    characters: &[CharacterConfig],
    settings: &GenerationSettings,
) -> Vec<ImageData> {
    let mut images = Vec::new();

    if let Some(background) = &settings.background_image {
        images.push(background.clone());
    }

    for character in characters {
        images.extend(character.face_image.iter().cloned());
        images.extend(character.clothing_image.iter().cloned());
        images.extend(character.pose_reference_image.iter().cloned());
        if character.hairstyle_option == HairstyleOption::CustomImage {
            images.extend(character.hairstyle_image.iter().cloned());
        }
        images.extend(
            character
                .props
                .iter()
                .filter_map(|prop| prop.image_data.clone()),
        );
    }

    images
}
