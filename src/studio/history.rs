use anyhow::Result;
use tracing::{info, warn};

use crate::db::KeyValueStore;
use crate::studio::types::GeneratedImage;

pub const HISTORY_KEY: &str = "ai-studio-history";
pub const HISTORY_LIMIT: usize = 50;

/// Completed generations, most recent first, capped at [`HISTORY_LIMIT`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<GeneratedImage>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(mut entries: Vec<GeneratedImage>) -> Self {
        entries.truncate(HISTORY_LIMIT);
        History { entries }
    }

    /// Reads the history slot. A missing or unreadable slot starts an empty history.
    pub async fn load<K: KeyValueStore>(store: &K) -> Self {
        let raw = match store.get(HISTORY_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return History::new(),
            Err(err) => {
                warn!("Failed to read generation history: {}", err);
                return History::new();
            }
        };

        match serde_json::from_str::<Vec<GeneratedImage>>(&raw) {
            Ok(entries) => {
                info!("Loaded {} history entr(ies)", entries.len());
                History::from_entries(entries)
            }
            Err(err) => {
                warn!("Discarding unreadable generation history: {}", err);
                History::new()
            }
        }
    }

    pub fn entries(&self) -> &[GeneratedImage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&GeneratedImage> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn record(&mut self, image: GeneratedImage) {
        self.entries.insert(0, image);
        self.entries.truncate(HISTORY_LIMIT);
    }

    pub async fn save<K: KeyValueStore>(&self, store: &K) -> Result<()> {
        let raw = serde_json::to_string(&self.entries)?;
        store.set(HISTORY_KEY, &raw).await
    }

    /// Writes the whole history; storage failures are logged, not returned.
    pub async fn persist<K: KeyValueStore>(&self, store: &K) {
        if let Err(err) = self.save(store).await {
            warn!("Failed to persist generation history: {}", err);
        }
    }

    pub async fn clear<K: KeyValueStore>(&mut self, store: &K) -> Result<()> {
        self.entries.clear();
        store.remove(HISTORY_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::llm::media::ImageData;
    use crate::studio::types::{CharacterConfig, GenerationSettings};

    fn entry(n: usize) -> GeneratedImage {
        GeneratedImage {
            id: format!("img-{n}"),
            image_data: ImageData::new(format!("https://img/{n}.png")),
            prompt: format!("prompt {n}"),
            characters: vec![CharacterConfig::new(format!("c{n}"), 0)],
            settings: GenerationSettings::default(),
            timestamp: n as i64,
        }
    }

    #[test]
    fn record_prepends_and_caps() {
        let mut history = History::new();
        for n in 0..51 {
            history.record(entry(n));
        }
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history.entries()[0].id, "img-50");
        assert_eq!(history.entries()[49].id, "img-1");
        assert!(history.get("img-0").is_none());
    }

    #[tokio::test]
    async fn persisted_history_loads_back() {
        let store = MemoryStore::new();
        let mut history = History::new();
        history.record(entry(1));
        history.record(entry(2));
        history.persist(&store).await;

        let loaded = History::load(&store).await;
        assert_eq!(loaded, history);

        let raw = store.get(HISTORY_KEY).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["imageData"], "https://img/2.png");
    }

    #[tokio::test]
    async fn corrupt_slot_starts_empty() {
        let store = MemoryStore::new();
        store.set(HISTORY_KEY, "{oops").await.unwrap();
        assert!(History::load(&store).await.is_empty());
    }

    #[tokio::test]
    async fn clear_removes_the_slot() {
        let store = MemoryStore::new();
        let mut history = History::new();
        history.record(entry(1));
        history.persist(&store).await;
        history.clear(&store).await.unwrap();
        assert!(history.is_empty());
        assert_eq!(store.get(HISTORY_KEY).await.unwrap(), None);
    }
}
