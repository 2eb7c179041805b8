use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::KeyValueStore;
use crate::error::StudioError;
use crate::studio::types::{CharacterConfig, GeneratedImage, GenerationSettings, MAX_CHARACTERS};

pub const HANDOFF_KEY: &str = "studio-characters";

pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// The active, editable configuration: characters plus shared settings.
/// Deserialized sessions pass through [`Session::from_parts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "SessionParts")]
pub struct Session {
    characters: Vec<CharacterConfig>,
    settings: GenerationSettings,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionParts {
    #[serde(default)]
    characters: Vec<CharacterConfig>,
    #[serde(default)]
    settings: GenerationSettings,
}

impl From<SessionParts> for Session {
    fn from(parts: SessionParts) -> Self {
        Session::from_parts(parts.characters, parts.settings)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            characters: vec![CharacterConfig::new(new_id(), 0)],
            settings: GenerationSettings::default(),
        }
    }

    /// Builds a session from stored parts, enforcing the character limits and
    /// id uniqueness. An empty list gets one default character.
    pub fn from_parts(characters: Vec<CharacterConfig>, settings: GenerationSettings) -> Self {
        let mut session = Session {
            characters: Vec::with_capacity(characters.len().min(MAX_CHARACTERS)),
            settings,
        };
        for mut character in characters {
            if session.characters.len() == MAX_CHARACTERS {
                warn!("Dropping characters beyond the limit of {}", MAX_CHARACTERS);
                break;
            }
            if character.id.trim().is_empty() || session.position(&character.id).is_some() {
                character.id = new_id();
            }
            character.normalize();
            session.characters.push(character);
        }
        if session.characters.is_empty() {
            session.characters.push(CharacterConfig::new(new_id(), 0));
        }
        session
    }

    pub fn characters(&self) -> &[CharacterConfig] {
        &self.characters
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn character(&self, id: &str) -> Option<&CharacterConfig> {
        self.characters.iter().find(|character| character.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.characters.iter().position(|character| character.id == id)
    }

    pub fn add_character(&mut self) -> Result<&CharacterConfig, StudioError> {
        if self.characters.len() >= MAX_CHARACTERS {
            return Err(StudioError::TooManyCharacters(MAX_CHARACTERS));
        }
        let index = self.characters.len();
        self.characters.push(CharacterConfig::new(new_id(), index));
        debug!("Added character {} of {}", index + 1, MAX_CHARACTERS);
        Ok(&self.characters[index])
    }

    pub fn remove_character(&mut self, id: &str) -> Result<CharacterConfig, StudioError> {
        let index = self
            .position(id)
            .ok_or_else(|| StudioError::UnknownCharacter(id.to_string()))?;
        if self.characters.len() <= 1 {
            return Err(StudioError::LastCharacter);
        }
        Ok(self.characters.remove(index))
    }

    /// Applies `update` to one character. The id cannot be changed and the
    /// result is re-normalized.
    pub fn update_character<F>(&mut self, id: &str, update: F) -> Result<&CharacterConfig, StudioError>
    where
        F: FnOnce(&mut CharacterConfig),
    {
        let index = self
            .position(id)
            .ok_or_else(|| StudioError::UnknownCharacter(id.to_string()))?;
        let character = &mut self.characters[index];
        update(character);
        character.id = id.to_string();
        character.normalize();
        Ok(&self.characters[index])
    }

    pub fn update_settings<F>(&mut self, update: F) -> &GenerationSettings
    where
        F: FnOnce(&mut GenerationSettings),
    {
        update(&mut self.settings);
        &self.settings
    }

    /// Makes a past generation's configuration the active one.
    pub fn reprompt(&mut self, image: &GeneratedImage) {
        *self = Session::from_parts(image.characters.clone(), image.settings.clone());
    }
}

/// Hands the character list to the edit surfaces through a session-scoped slot.
pub struct SessionHandoff<K> {
    store: K,
}

impl<K: KeyValueStore> SessionHandoff<K> {
    pub fn new(store: K) -> Self {
        SessionHandoff { store }
    }

    pub async fn write(&self, characters: &[CharacterConfig]) -> Result<()> {
        let raw = serde_json::to_string(characters)?;
        self.store.set(HANDOFF_KEY, &raw).await
    }

    pub async fn read(&self) -> Result<Option<Vec<CharacterConfig>>> {
        let Some(raw) = self.store.get(HANDOFF_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<Vec<CharacterConfig>>(&raw) {
            Ok(characters) => Ok(Some(characters)),
            Err(err) => {
                warn!("Ignoring unreadable session handoff slot: {}", err);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::llm::media::ImageData;
    use crate::studio::types::{LightingOption, PosePreset};

    #[test]
    fn new_session_has_one_default_character() {
        let session = Session::new();
        assert_eq!(session.characters().len(), 1);
        assert_eq!(session.characters()[0].label, "Person 1");
    }

    #[test]
    fn add_stops_at_five_with_unique_ids() {
        let mut session = Session::new();
        for _ in 0..4 {
            session.add_character().unwrap();
        }
        assert_eq!(
            session.add_character().unwrap_err(),
            StudioError::TooManyCharacters(5)
        );
        let labels: Vec<&str> = session.characters().iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, ["Person 1", "Person 2", "Person 3", "Person 4", "Person 5"]);

        let mut ids: Vec<&str> = session.characters().iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn last_character_cannot_be_removed() {
        let mut session = Session::new();
        let first = session.characters()[0].id.clone();
        assert_eq!(session.remove_character(&first).unwrap_err(), StudioError::LastCharacter);

        let second = session.add_character().unwrap().id.clone();
        let removed = session.remove_character(&first).unwrap();
        assert_eq!(removed.id, first);
        assert_eq!(session.characters()[0].id, second);
        assert_eq!(
            session.remove_character("missing").unwrap_err(),
            StudioError::UnknownCharacter("missing".to_string())
        );
    }

    #[test]
    fn update_keeps_id_and_clamps() {
        let mut session = Session::new();
        let id = session.characters()[0].id.clone();
        let updated = session
            .update_character(&id, |character| {
                character.id = "hijacked".to_string();
                character.skin_tone = 99;
                character.height_enabled = true;
                character.height_inches = 100;
                character.pose_preset = PosePreset::Sitting;
            })
            .unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(updated.skin_tone, 10);
        assert_eq!(updated.height_inches, 78);
        assert_eq!(updated.pose_preset, PosePreset::Sitting);
    }

    #[test]
    fn reprompt_restores_an_independent_copy() {
        let mut session = Session::new();
        let mut snapshot_character = CharacterConfig::new("past", 0);
        snapshot_character.clothing_text = "trench coat".to_string();
        let image = GeneratedImage {
            id: "img".to_string(),
            image_data: ImageData::new("https://img/out.png"),
            prompt: "prompt".to_string(),
            characters: vec![snapshot_character],
            settings: GenerationSettings {
                lighting: LightingOption::Moody,
                ..GenerationSettings::default()
            },
            timestamp: 1,
        };

        session.reprompt(&image);
        assert_eq!(session.characters()[0].clothing_text, "trench coat");
        assert_eq!(session.settings().lighting, LightingOption::Moody);

        session
            .update_character("past", |character| character.clothing_text.clear())
            .unwrap();
        assert_eq!(image.characters[0].clothing_text, "trench coat");
    }

    #[test]
    fn from_parts_repairs_ids_and_limits() {
        let characters: Vec<CharacterConfig> =
            (0..7).map(|i| CharacterConfig::new("dup", i)).collect();
        let session = Session::from_parts(characters, GenerationSettings::default());
        assert_eq!(session.characters().len(), MAX_CHARACTERS);
        assert_eq!(session.characters()[0].id, "dup");
        assert_ne!(session.characters()[1].id, "dup");

        let empty = Session::from_parts(Vec::new(), GenerationSettings::default());
        assert_eq!(empty.characters().len(), 1);
    }

    #[test]
    fn deserialized_sessions_are_repaired() {
        let characters: Vec<serde_json::Value> = (0..7)
            .map(|_| serde_json::json!({ "id": "dup", "skinTone": 99 }))
            .collect();
        let raw = serde_json::json!({ "characters": characters }).to_string();
        let session: Session = serde_json::from_str(&raw).unwrap();
        assert_eq!(session.characters().len(), MAX_CHARACTERS);
        let mut ids: Vec<&str> = session.characters().iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), MAX_CHARACTERS);
        assert!(session.characters().iter().all(|c| c.skin_tone == 10));

        let empty: Session = serde_json::from_str(r#"{"settings":{"lighting":"moody"}}"#).unwrap();
        assert_eq!(empty.characters().len(), 1);
        assert_eq!(empty.settings().lighting, LightingOption::Moody);
    }

    #[tokio::test]
    async fn handoff_round_trips_through_the_slot() {
        let store = MemoryStore::new();
        let handoff = SessionHandoff::new(store.clone());
        assert_eq!(handoff.read().await.unwrap(), None);

        let session = Session::new();
        handoff.write(session.characters()).await.unwrap();
        assert_eq!(
            handoff.read().await.unwrap().as_deref(),
            Some(session.characters())
        );

        store.set(HANDOFF_KEY, "not json").await.unwrap();
        assert_eq!(handoff.read().await.unwrap(), None);
    }
}
