use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::llm::media::ImageData;

pub const MAX_CHARACTERS: usize = 5;
pub const MAX_ADDITIONAL_FACE_IMAGES: usize = 4;
pub const SKIN_TONE_MIN: u8 = 0;
pub const SKIN_TONE_MAX: u8 = 10;
pub const DEFAULT_SKIN_TONE: u8 = 5;
pub const HEIGHT_MIN_INCHES: u8 = 48;
pub const HEIGHT_MAX_INCHES: u8 = 78;
pub const DEFAULT_HEIGHT_INCHES: u8 = 66;
pub const MAX_IMAGE_COUNT: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BodySize {
    ExtraSmall,
    Small,
    #[default]
    Medium,
    Large,
    ExtraLarge,
}

impl BodySize {
    pub fn as_str(self) -> &'static str {
        match self {
            BodySize::ExtraSmall => "extra-small",
            BodySize::Small => "small",
            BodySize::Medium => "medium",
            BodySize::Large => "large",
            BodySize::ExtraLarge => "extra-large",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpressionPreset {
    #[default]
    Default,
    Smiling,
    Angry,
    Seductive,
    Custom,
}

impl ExpressionPreset {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpressionPreset::Default => "default",
            ExpressionPreset::Smiling => "smiling",
            ExpressionPreset::Angry => "angry",
            ExpressionPreset::Seductive => "seductive",
            ExpressionPreset::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HairstyleOption {
    #[default]
    Default,
    CustomText,
    CustomImage,
}

impl HairstyleOption {
    pub fn as_str(self) -> &'static str {
        match self {
            HairstyleOption::Default => "default",
            HairstyleOption::CustomText => "custom-text",
            HairstyleOption::CustomImage => "custom-image",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PosePreset {
    #[default]
    None,
    Standing,
    Sitting,
    LyingDown,
    Kneeling,
    Crawling,
    Squatting,
    Leaning,
    ArchedBack,
    OnAllFours,
    SideLying,
    BentOver,
    LookingBack,
    HandsAndKnees,
    Custom,
}

impl PosePreset {
    pub fn as_str(self) -> &'static str {
        match self {
            PosePreset::None => "none",
            PosePreset::Standing => "standing",
            PosePreset::Sitting => "sitting",
            PosePreset::LyingDown => "lying-down",
            PosePreset::Kneeling => "kneeling",
            PosePreset::Crawling => "crawling",
            PosePreset::Squatting => "squatting",
            PosePreset::Leaning => "leaning",
            PosePreset::ArchedBack => "arched-back",
            PosePreset::OnAllFours => "on-all-fours",
            PosePreset::SideLying => "side-lying",
            PosePreset::BentOver => "bent-over",
            PosePreset::LookingBack => "looking-back",
            PosePreset::HandsAndKnees => "hands-and-knees",
            PosePreset::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraAngle {
    #[default]
    Auto,
    Front,
    Side,
    Back,
    OverShoulder,
    BehindClose,
    LowAngle,
    HighAngle,
    TopDown,
    DutchAngle,
    Custom,
}

impl CameraAngle {
    pub fn as_str(self) -> &'static str {
        match self {
            CameraAngle::Auto => "auto",
            CameraAngle::Front => "front",
            CameraAngle::Side => "side",
            CameraAngle::Back => "back",
            CameraAngle::OverShoulder => "over-shoulder",
            CameraAngle::BehindClose => "behind-close",
            CameraAngle::LowAngle => "low-angle",
            CameraAngle::HighAngle => "high-angle",
            CameraAngle::TopDown => "top-down",
            CameraAngle::DutchAngle => "dutch-angle",
            CameraAngle::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "16:9")]
    Landscape16x9,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "3:2")]
    Landscape3x2,
    #[serde(rename = "2:3")]
    Portrait2x3,
    #[serde(rename = "21:9")]
    Ultrawide21x9,
    #[serde(rename = "4:5")]
    Portrait4x5,
    #[serde(rename = "5:4")]
    Landscape5x4,
    #[serde(rename = "7:5")]
    Landscape7x5,
    #[serde(rename = "5:7")]
    Portrait5x7,
    #[serde(rename = "custom")]
    Custom,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Auto => "auto",
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape16x9 => "16:9",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape3x2 => "3:2",
            AspectRatio::Portrait2x3 => "2:3",
            AspectRatio::Ultrawide21x9 => "21:9",
            AspectRatio::Portrait4x5 => "4:5",
            AspectRatio::Landscape5x4 => "5:4",
            AspectRatio::Landscape7x5 => "7:5",
            AspectRatio::Portrait5x7 => "5:7",
            AspectRatio::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LightingOption {
    #[default]
    Auto,
    Natural,
    Studio,
    GoldenHour,
    Dramatic,
    Neon,
    Soft,
    Backlit,
    Candlelight,
    Moody,
}

impl LightingOption {
    pub fn as_str(self) -> &'static str {
        match self {
            LightingOption::Auto => "auto",
            LightingOption::Natural => "natural",
            LightingOption::Studio => "studio",
            LightingOption::GoldenHour => "golden-hour",
            LightingOption::Dramatic => "dramatic",
            LightingOption::Neon => "neon",
            LightingOption::Soft => "soft",
            LightingOption::Backlit => "backlit",
            LightingOption::Candlelight => "candlelight",
            LightingOption::Moody => "moody",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetailLevel {
    #[default]
    Auto,
    Ultra,
    High,
    Medium,
    Low,
}

impl DetailLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            DetailLevel::Auto => "auto",
            DetailLevel::Ultra => "ultra",
            DetailLevel::High => "high",
            DetailLevel::Medium => "medium",
            DetailLevel::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkKind {
    #[default]
    Tattoo,
    Birthmark,
    Scar,
    Piercing,
    Other,
}

impl MarkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MarkKind::Tattoo => "tattoo",
            MarkKind::Birthmark => "birthmark",
            MarkKind::Scar => "scar",
            MarkKind::Piercing => "piercing",
            MarkKind::Other => "other",
        }
    }
}

/// Which backing model serves a request. The concrete model ids come from
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelChoice {
    #[default]
    HighQuality,
    Fast,
}

impl ModelChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelChoice::HighQuality => "high-quality",
            ModelChoice::Fast => "fast",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

display_as_str!(
    BodySize,
    ExpressionPreset,
    HairstyleOption,
    PosePreset,
    CameraAngle,
    AspectRatio,
    LightingOption,
    DetailLevel,
    MarkKind,
    ModelChoice,
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prop {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_data: Option<ImageData>,
    #[serde(default)]
    pub placement: String,
}

impl Prop {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Prop {
            id: id.into(),
            name: name.into(),
            image_data: None,
            placement: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistinguishingMark {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: MarkKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_data: Option<ImageData>,
}

fn default_skin_tone() -> u8 {
    DEFAULT_SKIN_TONE
}

fn default_height_inches() -> u8 {
    DEFAULT_HEIGHT_INCHES
}

/// Reads any JSON number and saturates it into `[min, max]`.
fn saturate(value: f64, min: u8, max: u8) -> u8 {
    value.round().clamp(f64::from(min), f64::from(max)) as u8
}

fn skin_tone_from_json<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = f64::deserialize(deserializer)?;
    Ok(saturate(value, SKIN_TONE_MIN, SKIN_TONE_MAX))
}

fn height_from_json<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = f64::deserialize(deserializer)?;
    Ok(saturate(value, HEIGHT_MIN_INCHES, HEIGHT_MAX_INCHES))
}

fn image_count_from_json<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u32>, D::Error> {
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.map(|count| count.round().clamp(1.0, f64::from(MAX_IMAGE_COUNT)) as u32))
}

/// One depicted person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterConfig {
    pub id: String,
    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub face_image: Option<ImageData>,
    #[serde(default)]
    pub additional_face_images: Vec<ImageData>,
    #[serde(default)]
    pub side_profile_image: Option<ImageData>,
    #[serde(default)]
    pub preserve_exact_head: bool,

    #[serde(default)]
    pub clothing_image: Option<ImageData>,
    #[serde(default)]
    pub clothing_text: String,

    #[serde(default)]
    pub pose_reference_image: Option<ImageData>,
    #[serde(default)]
    pub pose_preset: PosePreset,
    #[serde(default)]
    pub action_prompt: String,

    #[serde(default)]
    pub hairstyle_option: HairstyleOption,
    #[serde(default)]
    pub hairstyle_text: String,
    #[serde(default)]
    pub hairstyle_image: Option<ImageData>,

    #[serde(default)]
    pub chest_size: BodySize,
    #[serde(default)]
    pub butt_size: BodySize,
    #[serde(default)]
    pub stomach_size: BodySize,

    #[serde(default)]
    pub expression_preset: ExpressionPreset,
    #[serde(default)]
    pub custom_expression: String,

    #[serde(default = "default_skin_tone", deserialize_with = "skin_tone_from_json")]
    pub skin_tone: u8,
    #[serde(default)]
    pub skin_color: Option<String>,
    #[serde(default)]
    pub hair_color: Option<String>,
    #[serde(default)]
    pub eye_color: Option<String>,
    #[serde(default)]
    pub hair_color_image: Option<ImageData>,
    #[serde(default)]
    pub eye_color_image: Option<ImageData>,

    #[serde(default)]
    pub height_enabled: bool,
    #[serde(default = "default_height_inches", deserialize_with = "height_from_json")]
    pub height_inches: u8,

    #[serde(default)]
    pub props: Vec<Prop>,
    #[serde(default)]
    pub marks: Vec<DistinguishingMark>,
}

impl CharacterConfig {
    /// Default character for the zero-based position `index` in the session.
    pub fn new(id: impl Into<String>, index: usize) -> Self {
        CharacterConfig {
            id: id.into(),
            label: format!("Person {}", index + 1),
            face_image: None,
            additional_face_images: Vec::new(),
            side_profile_image: None,
            preserve_exact_head: false,
            clothing_image: None,
            clothing_text: String::new(),
            pose_reference_image: None,
            pose_preset: PosePreset::None,
            action_prompt: String::new(),
            hairstyle_option: HairstyleOption::Default,
            hairstyle_text: String::new(),
            hairstyle_image: None,
            chest_size: BodySize::Medium,
            butt_size: BodySize::Medium,
            stomach_size: BodySize::Medium,
            expression_preset: ExpressionPreset::Default,
            custom_expression: String::new(),
            skin_tone: DEFAULT_SKIN_TONE,
            skin_color: None,
            hair_color: None,
            eye_color: None,
            hair_color_image: None,
            eye_color_image: None,
            height_enabled: false,
            height_inches: DEFAULT_HEIGHT_INCHES,
            props: Vec::new(),
            marks: Vec::new(),
        }
    }

    pub fn normalize(&mut self) {
        self.skin_tone = self.skin_tone.clamp(SKIN_TONE_MIN, SKIN_TONE_MAX);
        self.height_inches = self.height_inches.clamp(HEIGHT_MIN_INCHES, HEIGHT_MAX_INCHES);
        self.additional_face_images
            .truncate(MAX_ADDITIONAL_FACE_IMAGES);
    }

    /// The label used in prompt tags: the configured label, or "Person N" for
    /// the zero-based `index` when it is blank.
    pub fn display_label(&self, index: usize) -> String {
        let label = self.label.trim();
        if label.is_empty() {
            format!("Person {}", index + 1)
        } else {
            label.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    #[serde(default)]
    pub model: ModelChoice,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub custom_aspect_ratio: String,
    #[serde(default)]
    pub camera_angle: CameraAngle,
    #[serde(default)]
    pub custom_camera_angle: String,
    #[serde(default)]
    pub lighting: LightingOption,
    #[serde(default)]
    pub skin_detail: DetailLevel,
    #[serde(default)]
    pub eye_detail: DetailLevel,
    #[serde(default)]
    pub background_image: Option<ImageData>,
    #[serde(default)]
    pub background_text: String,
    #[serde(default)]
    pub confine_to_background: bool,
    #[serde(default, deserialize_with = "image_count_from_json")]
    pub image_count: Option<u32>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            model: ModelChoice::HighQuality,
            aspect_ratio: AspectRatio::Auto,
            custom_aspect_ratio: String::new(),
            camera_angle: CameraAngle::Auto,
            custom_camera_angle: String::new(),
            lighting: LightingOption::Auto,
            skin_detail: DetailLevel::Auto,
            eye_detail: DetailLevel::Auto,
            background_image: None,
            background_text: String::new(),
            confine_to_background: false,
            image_count: None,
        }
    }
}

impl GenerationSettings {
    /// Number of independent requests one logical generation issues, in
    /// `1..=MAX_IMAGE_COUNT`.
    pub fn requested_images(&self) -> usize {
        self.image_count.unwrap_or(1).clamp(1, MAX_IMAGE_COUNT) as usize
    }
}

/// One completed generation together with a deep snapshot of the
/// configuration that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub id: String,
    pub image_data: ImageData,
    pub prompt: String,
    pub characters: Vec<CharacterConfig>,
    pub settings: GenerationSettings,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}
