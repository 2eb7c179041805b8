//! Fixed preset-to-phrase tables used by the prompt builders.
//!
//! Each table is an explicit finite mapping keyed by the preset enum. A key
//! that is absent from its table (`auto`, `none`, `custom`) is never looked up
//! by the prompt builder; callers fall back to the preset's wire name.

use crate::studio::types::{CameraAngle, DetailLevel, LightingOption, PosePreset};

pub const LEAD_SENTENCE: &str = "Generate a 4K ultra HD realistic photograph with perfect attention to lighting, skin detail, and natural appearance.";

pub const CAMERA_ANGLE_PHRASES: &[(CameraAngle, &str)] = &[
    (CameraAngle::Front, "front view"),
    (CameraAngle::Side, "side view"),
    (CameraAngle::Back, "from behind"),
    (CameraAngle::OverShoulder, "over the shoulder view from behind"),
    (CameraAngle::BehindClose, "close-up from behind"),
    (CameraAngle::LowAngle, "low angle looking up"),
    (CameraAngle::HighAngle, "high angle looking down"),
    (CameraAngle::TopDown, "top-down bird's eye view"),
    (CameraAngle::DutchAngle, "dutch angle tilted view"),
];

pub const LIGHTING_PHRASES: &[(LightingOption, &str)] = &[
    (LightingOption::Natural, "natural daylight"),
    (
        LightingOption::Studio,
        "professional studio lighting with soft boxes",
    ),
    (LightingOption::GoldenHour, "warm golden hour sunlight"),
    (
        LightingOption::Dramatic,
        "dramatic high-contrast lighting with deep shadows",
    ),
    (LightingOption::Neon, "colorful neon lighting"),
    (LightingOption::Soft, "soft diffused lighting"),
    (
        LightingOption::Backlit,
        "backlit with rim light creating a glowing outline",
    ),
    (LightingOption::Candlelight, "warm candlelight ambiance"),
    (LightingOption::Moody, "moody low-key atmospheric lighting"),
];

pub const SKIN_DETAIL_PHRASES: &[(DetailLevel, &str)] = &[
    (
        DetailLevel::Ultra,
        "Ultra-realistic skin with visible pores, micro-textures, fine hair, and natural skin imperfections",
    ),
    (
        DetailLevel::High,
        "Highly detailed skin with natural texture and subtle imperfections",
    ),
    (DetailLevel::Medium, "Standard realistic skin detail"),
    (DetailLevel::Low, "Smooth, simplified skin rendering"),
];

pub const EYE_DETAIL_PHRASES: &[(DetailLevel, &str)] = &[
    (
        DetailLevel::Ultra,
        "Ultra-detailed eyes with visible iris patterns, reflections, catch lights, and micro-detail in the pupils",
    ),
    (
        DetailLevel::High,
        "Highly detailed eyes with clear iris detail and natural reflections",
    ),
    (DetailLevel::Medium, "Standard realistic eye detail"),
    (DetailLevel::Low, "Simplified eye rendering"),
];

pub const POSE_PHRASES: &[(PosePreset, &str)] = &[
    (PosePreset::Standing, "standing upright"),
    (PosePreset::Sitting, "sitting down"),
    (PosePreset::LyingDown, "lying down"),
    (PosePreset::Kneeling, "kneeling"),
    (PosePreset::Crawling, "crawling on the ground"),
    (PosePreset::Squatting, "squatting down"),
    (PosePreset::Leaning, "leaning seductively"),
    (PosePreset::ArchedBack, "with arched back pose"),
    (PosePreset::OnAllFours, "on all fours position"),
    (PosePreset::SideLying, "lying on side"),
    (PosePreset::BentOver, "bent over"),
    (PosePreset::LookingBack, "looking back over shoulder"),
    (PosePreset::HandsAndKnees, "on hands and knees"),
];

/// Skin-tone slider labels, indexed by slider position 0..=10.
pub const SKIN_TONE_LABELS: [&str; 11] = [
    "very fair porcelain white",
    "fair light",
    "light peach",
    "light tan",
    "medium light",
    "medium olive",
    "medium tan",
    "tan brown",
    "medium dark brown",
    "dark brown",
    "very dark deep brown",
];

pub const SKIN_TONE_FALLBACK: &str = "medium";

pub const HAIR_COLOR_LABELS: &[(&str, &str)] = &[
    ("#FAFAD2", "Platinum Blonde"),
    ("#F5DEB3", "Light Blonde"),
    ("#DAA520", "Golden"),
    ("#D2691E", "Auburn"),
    ("#CD853F", "Light Brown"),
    ("#A0522D", "Medium Brown"),
    ("#8B4513", "Dark Brown"),
    ("#654321", "Espresso"),
    ("#3B2F2F", "Near Black"),
    ("#1C1C1C", "Jet Black"),
    ("#000000", "Black"),
    ("#B22222", "Deep Red"),
    ("#DC143C", "Crimson"),
    ("#FF6347", "Strawberry"),
    ("#FF69B4", "Pink"),
    ("#DA70D6", "Lavender"),
    ("#9370DB", "Purple"),
    ("#4169E1", "Blue"),
    ("#00CED1", "Teal"),
    ("#32CD32", "Green"),
    ("#808080", "Silver/Gray"),
];

pub const EYE_COLOR_LABELS: &[(&str, &str)] = &[
    ("#8B4513", "Dark Brown"),
    ("#654321", "Brown"),
    ("#3B2F2F", "Deep Brown"),
    ("#1C1C1C", "Near Black"),
    ("#006400", "Dark Green"),
    ("#228B22", "Green"),
    ("#6B8E23", "Olive Green"),
    ("#9ACD32", "Light Green"),
    ("#4169E1", "Blue"),
    ("#1E90FF", "Light Blue"),
    ("#87CEEB", "Sky Blue"),
    ("#ADD8E6", "Pale Blue"),
    ("#708090", "Slate Gray"),
    ("#808080", "Gray"),
    ("#A9A9A9", "Light Gray"),
    ("#C0C0C0", "Silver"),
    ("#DAA520", "Amber"),
    ("#B8860B", "Dark Amber"),
    ("#FF8C00", "Hazel"),
    ("#9370DB", "Violet"),
];

pub fn lookup<K: PartialEq + Copy>(table: &[(K, &'static str)], key: K) -> Option<&'static str> {
    table
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, phrase)| *phrase)
}

pub fn camera_angle_phrase(angle: CameraAngle) -> &'static str {
    lookup(CAMERA_ANGLE_PHRASES, angle).unwrap_or(angle.as_str())
}

pub fn lighting_phrase(lighting: LightingOption) -> &'static str {
    lookup(LIGHTING_PHRASES, lighting).unwrap_or(lighting.as_str())
}

pub fn skin_detail_phrase(level: DetailLevel) -> &'static str {
    lookup(SKIN_DETAIL_PHRASES, level).unwrap_or(level.as_str())
}

pub fn eye_detail_phrase(level: DetailLevel) -> &'static str {
    lookup(EYE_DETAIL_PHRASES, level).unwrap_or(level.as_str())
}

pub fn pose_phrase(pose: PosePreset) -> &'static str {
    lookup(POSE_PHRASES, pose).unwrap_or(pose.as_str())
}

pub fn skin_tone_label(index: u8) -> &'static str {
    SKIN_TONE_LABELS
        .get(index as usize)
        .copied()
        .unwrap_or(SKIN_TONE_FALLBACK)
}

/// Human name for a palette colour, or the raw value when it is not a palette entry.
pub fn color_name<'a>(value: &'a str, labels: &[(&str, &'static str)]) -> &'a str {
    let trimmed = value.trim();
    labels
        .iter()
        .find(|(hex, _)| hex.eq_ignore_ascii_case(trimmed))
        .map(|(_, name)| *name)
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_named_angle_is_tabulated() {
        for angle in [
            CameraAngle::Front,
            CameraAngle::Side,
            CameraAngle::Back,
            CameraAngle::OverShoulder,
            CameraAngle::BehindClose,
            CameraAngle::LowAngle,
            CameraAngle::HighAngle,
            CameraAngle::TopDown,
            CameraAngle::DutchAngle,
        ] {
            assert!(lookup(CAMERA_ANGLE_PHRASES, angle).is_some(), "{angle}");
        }
        assert_eq!(lookup(CAMERA_ANGLE_PHRASES, CameraAngle::Auto), None);
        assert_eq!(camera_angle_phrase(CameraAngle::Custom), "custom");
    }

    #[test]
    fn pose_table_skips_none_and_custom() {
        assert_eq!(POSE_PHRASES.len(), 13);
        assert_eq!(pose_phrase(PosePreset::Crawling), "crawling on the ground");
        assert_eq!(lookup(POSE_PHRASES, PosePreset::None), None);
        assert_eq!(lookup(POSE_PHRASES, PosePreset::Custom), None);
    }

    #[test]
    fn detail_tables_cover_four_levels() {
        assert_eq!(SKIN_DETAIL_PHRASES.len(), 4);
        assert_eq!(EYE_DETAIL_PHRASES.len(), 4);
        assert_eq!(skin_detail_phrase(DetailLevel::Low), "Smooth, simplified skin rendering");
        assert_eq!(eye_detail_phrase(DetailLevel::Medium), "Standard realistic eye detail");
    }

    #[test]
    fn skin_tone_out_of_range_uses_fallback() {
        assert_eq!(skin_tone_label(0), "very fair porcelain white");
        assert_eq!(skin_tone_label(5), "medium olive");
        assert_eq!(skin_tone_label(10), "very dark deep brown");
        assert_eq!(skin_tone_label(11), "medium");
    }

    #[test]
    fn color_names_ignore_case() {
        assert_eq!(color_name("#daa520", HAIR_COLOR_LABELS), "Golden");
        assert_eq!(color_name("#DAA520", EYE_COLOR_LABELS), "Amber");
        assert_eq!(color_name("teal green", EYE_COLOR_LABELS), "teal green");
    }
}
