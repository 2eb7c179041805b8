use chrono::Utc;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::{info, warn};

use crate::db::{KeyValueStore, MemoryStore};
use crate::error::{GenerationError, StudioError};
use crate::llm::gateway::{GenerationRequest, ImageService, RetouchRequest};
use crate::llm::media::ImageData;
use crate::studio::edits::{AppearanceEdit, ClothingEdit};
use crate::studio::history::History;
use crate::studio::prompt::build_prompt;
use crate::studio::references::collect_reference_images;
use crate::studio::session::{new_id, Session, SessionHandoff};
use crate::studio::types::{CharacterConfig, GeneratedImage, GenerationSettings, ModelChoice};

pub type GenerationOutcome = Result<GeneratedImage, GenerationError>;

pub fn compile_request(
    characters: &[CharacterConfig],
    settings: &GenerationSettings,
) -> GenerationRequest {
    GenerationRequest {
        prompt: build_prompt(characters, settings),
        model: settings.model,
        reference_images: collect_reference_images(characters, settings),
    }
}

/// Owns the active session and the generation history, and talks to the
/// image service on their behalf.
///
/// Every character mutation is mirrored into the session handoff slot, which
/// the edit operations read their source photos from.
pub struct Studio<S, K> {
    session: Session,
    history: History,
    handoff: SessionHandoff<MemoryStore>,
    service: S,
    store: K,
}

impl<S: ImageService, K: KeyValueStore> Studio<S, K> {
    /// Starts a fresh session with the history read back from `store`.
    pub async fn open(service: S, store: K) -> Self {
        Self::open_with_session(service, store, Session::new()).await
    }

    pub async fn open_with_session(service: S, store: K, session: Session) -> Self {
        let history = History::load(&store).await;
        let studio = Studio {
            session,
            history,
            handoff: SessionHandoff::new(MemoryStore::new()),
            service,
            store,
        };
        studio.publish_characters().await;
        studio
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn handoff(&self) -> &SessionHandoff<MemoryStore> {
        &self.handoff
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    async fn publish_characters(&self) {
        if let Err(err) = self.handoff.write(self.session.characters()).await {
            warn!("Failed to write session handoff: {}", err);
        }
    }

    /// Adds a default character and returns its id.
    pub async fn add_character(&mut self) -> Result<String, StudioError> {
        let id = self.session.add_character()?.id.clone();
        self.publish_characters().await;
        Ok(id)
    }

    pub async fn remove_character(&mut self, id: &str) -> Result<CharacterConfig, StudioError> {
        let removed = self.session.remove_character(id)?;
        self.publish_characters().await;
        Ok(removed)
    }

    pub async fn update_character<F>(&mut self, id: &str, update: F) -> Result<(), StudioError>
    where
        F: FnOnce(&mut CharacterConfig),
    {
        self.session.update_character(id, update)?;
        self.publish_characters().await;
        Ok(())
    }

    pub fn update_settings<F>(&mut self, update: F)
    where
        F: FnOnce(&mut GenerationSettings),
    {
        self.session.update_settings(update);
    }

    /// Makes a history entry's configuration the active session.
    pub async fn reprompt(&mut self, image_id: &str) -> bool {
        let Some(image) = self.history.get(image_id) else {
            return false;
        };
        self.session.reprompt(image);
        self.publish_characters().await;
        true
    }

    /// The character list as the edit surfaces see it. Falls back to the
    /// active session when the slot is empty or unreadable.
    pub async fn handoff_characters(&self) -> Vec<CharacterConfig> {
        match self.handoff.read().await {
            Ok(Some(characters)) => characters,
            Ok(None) => self.session.characters().to_vec(),
            Err(err) => {
                warn!("Failed to read session handoff: {}", err);
                self.session.characters().to_vec()
            }
        }
    }

    /// Generates from the active session.
    pub async fn generate(&mut self) -> Vec<GenerationOutcome> {
        let characters = self.session.characters().to_vec();
        let settings = self.session.settings().clone();
        self.generate_with(&characters, &settings).await
    }

    /// Issues `settings.requested_images()` independent requests, each with the
    /// same prompt and references. Each success is recorded and persisted as
    /// soon as it arrives; failures leave the history untouched. Outcomes are
    /// returned in request order.
    pub async fn generate_with(
        &mut self,
        characters: &[CharacterConfig],
        settings: &GenerationSettings,
    ) -> Vec<GenerationOutcome> {
        let count = settings.requested_images();
        let requests: Vec<GenerationRequest> = (0..count)
            .map(|_| compile_request(characters, settings))
            .collect();
        info!(
            "Generating {} image(s): model={}, characters={}, references={}",
            count,
            settings.model,
            characters.len(),
            requests
                .first()
                .map(|request| request.reference_images.len())
                .unwrap_or_default()
        );

        let service = &self.service;
        let store = &self.store;
        let history = &mut self.history;
        let mut pending: FuturesUnordered<_> = requests
            .iter()
            .enumerate()
            .map(move |(index, request)| async move {
                (index, service.generate_image(request).await)
            })
            .collect();

        let mut recorded = 0;
        let mut outcomes: Vec<Option<GenerationOutcome>> = (0..count).map(|_| None).collect();
        while let Some((index, response)) = pending.next().await {
            let outcome = match response {
                Ok(response) => {
                    let image = GeneratedImage {
                        id: new_id(),
                        image_data: response.image_url,
                        prompt: requests[index].prompt.clone(),
                        characters: characters.to_vec(),
                        settings: settings.clone(),
                        timestamp: Utc::now().timestamp_millis(),
                    };
                    history.record(image.clone());
                    history.persist(store).await;
                    recorded += 1;
                    Ok(image)
                }
                Err(err) => {
                    warn!(
                        "Generation {}/{} failed ({}): {}",
                        index + 1,
                        count,
                        err.kind(),
                        err
                    );
                    Err(err)
                }
            };
            outcomes[index] = Some(outcome);
        }

        info!("Generation finished: {}/{} succeeded", recorded, count);
        outcomes.into_iter().flatten().collect()
    }

    pub async fn clear_history(&mut self) -> anyhow::Result<()> {
        self.history.clear(&self.store).await
    }

    pub async fn edit_appearance(
        &self,
        source: &ImageData,
        edit: &AppearanceEdit,
    ) -> Result<ImageData, GenerationError> {
        if !edit.has_changes() {
            return Err(GenerationError::InvalidRequest(
                "Select at least one change to apply.".to_string(),
            ));
        }
        let request = GenerationRequest {
            prompt: edit.prompt(),
            model: ModelChoice::HighQuality,
            reference_images: edit.reference_images(source),
        };
        self.run_edit("appearance", &request).await
    }

    pub async fn edit_clothing(
        &self,
        source: &ImageData,
        edit: &ClothingEdit,
    ) -> Result<ImageData, GenerationError> {
        if !edit.has_changes() {
            return Err(GenerationError::InvalidRequest(
                "Add a clothing image or description.".to_string(),
            ));
        }
        let request = GenerationRequest {
            prompt: edit.prompt(),
            model: ModelChoice::HighQuality,
            reference_images: edit.reference_images(source),
        };
        self.run_edit("clothing", &request).await
    }

    /// Appearance edit on the face photo of a character from the handoff slot.
    pub async fn edit_character_appearance(
        &self,
        character_id: &str,
        edit: &AppearanceEdit,
    ) -> Result<ImageData, GenerationError> {
        let source = self.character_photo(character_id).await?;
        self.edit_appearance(&source, edit).await
    }

    /// Clothing edit on the face photo of a character from the handoff slot.
    pub async fn edit_character_clothing(
        &self,
        character_id: &str,
        edit: &ClothingEdit,
    ) -> Result<ImageData, GenerationError> {
        let source = self.character_photo(character_id).await?;
        self.edit_clothing(&source, edit).await
    }

    async fn character_photo(&self, character_id: &str) -> Result<ImageData, GenerationError> {
        let characters = self.handoff_characters().await;
        let (index, character) = characters
            .iter()
            .enumerate()
            .find(|(_, character)| character.id == character_id)
            .ok_or_else(|| {
                GenerationError::InvalidRequest(format!("Unknown character: {character_id}"))
            })?;
        character.face_image.clone().ok_or_else(|| {
            GenerationError::InvalidRequest(format!(
                "{} has no photo to edit.",
                character.display_label(index)
            ))
        })
    }

    pub async fn retouch(
        &self,
        image: &ImageData,
        mask: Option<&ImageData>,
    ) -> Result<ImageData, GenerationError> {
        let request = RetouchRequest {
            image_data: image.clone(),
            mask_data: mask.cloned(),
        };
        self.service
            .retouch_image(&request)
            .await
            .map(|response| response.image_url)
            .inspect_err(|err| warn!("Retouch failed ({}): {}", err.kind(), err))
    }

    async fn run_edit(
        &self,
        label: &str,
        request: &GenerationRequest,
    ) -> Result<ImageData, GenerationError> {
        info!(
            "Running {} edit with {} reference image(s)",
            label,
            request.reference_images.len()
        );
        self.service
            .generate_image(request)
            .await
            .map(|response| response.image_url)
            .inspect_err(|err| warn!("{} edit failed ({}): {}", label, err.kind(), err))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;
    use crate::db::MemoryStore;
    use crate::llm::gateway::ImageResponse;
    use crate::studio::history::{HISTORY_KEY, HISTORY_LIMIT};
    use crate::studio::types::LightingOption;

    #[derive(Default)]
    struct ScriptedService {
        outcomes: Mutex<VecDeque<Result<ImageResponse, GenerationError>>>,
        requests: Mutex<Vec<GenerationRequest>>,
        retouches: Mutex<Vec<RetouchRequest>>,
        /// 1-based call number that never answers.
        stall_on: Option<usize>,
    }

    impl ScriptedService {
        fn with_outcomes(
            outcomes: impl IntoIterator<Item = Result<ImageResponse, GenerationError>>,
        ) -> Self {
            ScriptedService {
                outcomes: Mutex::new(outcomes.into_iter().collect()),
                ..ScriptedService::default()
            }
        }

        fn next_outcome(&self) -> Result<ImageResponse, GenerationError> {
            let mut outcomes = self.outcomes.lock();
            outcomes.pop_front().unwrap_or_else(|| Ok(success("generated")))
        }
    }

    impl ImageService for ScriptedService {
        async fn generate_image(
            &self,
            request: &GenerationRequest,
        ) -> Result<ImageResponse, GenerationError> {
            let call = {
                let mut requests = self.requests.lock();
                requests.push(request.clone());
                requests.len()
            };
            let outcome = self.next_outcome();
            if self.stall_on == Some(call) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            outcome
        }

        async fn retouch_image(
            &self,
            request: &RetouchRequest,
        ) -> Result<ImageResponse, GenerationError> {
            self.retouches.lock().push(request.clone());
            self.next_outcome()
        }
    }

    fn success(name: &str) -> ImageResponse {
        ImageResponse {
            image_url: ImageData::new(format!("https://img/{name}.png")),
        }
    }

    async fn studio(service: ScriptedService) -> (Studio<ScriptedService, MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        (Studio::open(service, store.clone()).await, store)
    }

    #[tokio::test]
    async fn success_prepends_one_entry_and_persists() {
        let (mut studio, store) = studio(ScriptedService::with_outcomes([Ok(success("a"))])).await;

        let outcomes = studio.generate().await;
        assert_eq!(outcomes.len(), 1);
        let image = outcomes[0].as_ref().unwrap();
        assert_eq!(image.image_data, ImageData::new("https://img/a.png"));
        assert_eq!(studio.history().len(), 1);
        assert_eq!(studio.history().entries()[0].id, image.id);

        let expected = compile_request(studio.session().characters(), studio.session().settings());
        assert_eq!(image.prompt, expected.prompt);
        assert_eq!(studio.service().requests.lock().as_slice(), &[expected]);

        let reloaded = History::load(&store).await;
        assert_eq!(reloaded.entries(), studio.history().entries());
    }

    #[tokio::test]
    async fn failures_leave_history_unchanged() {
        let (mut studio, store) = studio(ScriptedService::with_outcomes([
            Err(GenerationError::Domain("Content blocked".to_string())),
            Err(GenerationError::EmptyResult),
            Err(GenerationError::RateLimited("slow down".to_string())),
        ]))
        .await;

        for _ in 0..3 {
            let outcomes = studio.generate().await;
            assert!(outcomes[0].is_err());
        }
        assert!(studio.history().is_empty());
        assert_eq!(store.get(HISTORY_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn history_keeps_the_most_recent_fifty() {
        let (mut studio, _store) = studio(ScriptedService::default()).await;
        let mut first_id = String::new();
        for run in 0..=HISTORY_LIMIT {
            let outcomes = studio.generate().await;
            if run == 0 {
                first_id = outcomes[0].as_ref().unwrap().id.clone();
            }
        }
        assert_eq!(studio.history().len(), HISTORY_LIMIT);
        assert!(studio.history().get(&first_id).is_none());
    }

    #[tokio::test]
    async fn image_count_issues_identical_independent_requests() {
        let (mut studio, _store) = studio(ScriptedService::with_outcomes([
            Ok(success("one")),
            Err(GenerationError::Transport("reset".to_string())),
            Ok(success("three")),
        ]))
        .await;
        studio.update_settings(|settings| {
            settings.image_count = Some(3);
            settings.lighting = LightingOption::Neon;
        });

        let outcomes = studio.generate().await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 2);
        assert_eq!(studio.history().len(), 2);

        let requests = studio.service().requests.lock().clone();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|request| request == &requests[0]));
        assert!(requests[0].prompt.contains("neon"));
    }

    #[tokio::test]
    async fn history_snapshot_is_independent_of_later_edits() {
        let (mut studio, _store) = studio(ScriptedService::default()).await;
        let id = studio.session().characters()[0].id.clone();
        studio
            .update_character(&id, |character| {
                character.clothing_text = "red dress".to_string()
            })
            .await
            .unwrap();

        let image_id = studio.generate().await[0].as_ref().unwrap().id.clone();
        studio
            .update_character(&id, |character| {
                character.clothing_text = "blue jeans".to_string()
            })
            .await
            .unwrap();

        let entry = studio.history().get(&image_id).unwrap();
        assert_eq!(entry.characters[0].clothing_text, "red dress");

        assert!(studio.reprompt(&image_id).await);
        assert_eq!(studio.session().characters()[0].clothing_text, "red dress");
        assert!(!studio.reprompt("missing").await);
    }

    #[tokio::test]
    async fn open_reads_existing_history_and_clear_removes_it() {
        let store = MemoryStore::new();
        {
            let mut studio = Studio::open(ScriptedService::default(), store.clone()).await;
            studio.generate().await;
        }
        let mut studio = Studio::open(ScriptedService::default(), store.clone()).await;
        assert_eq!(studio.history().len(), 1);

        studio.clear_history().await.unwrap();
        assert!(studio.history().is_empty());
        assert_eq!(store.get(HISTORY_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn edits_without_changes_are_rejected_before_dispatch() {
        let (studio, _store) = studio(ScriptedService::default()).await;
        let source = ImageData::new("https://img/source.png");

        let appearance = studio
            .edit_appearance(&source, &AppearanceEdit::default())
            .await;
        assert!(matches!(appearance, Err(GenerationError::InvalidRequest(_))));
        let clothing = studio.edit_clothing(&source, &ClothingEdit::default()).await;
        assert!(matches!(clothing, Err(GenerationError::InvalidRequest(_))));
        assert!(studio.service().requests.lock().is_empty());
    }

    #[tokio::test]
    async fn edits_use_high_quality_model_and_skip_history() {
        let (mut studio, _store) =
            studio(ScriptedService::with_outcomes([Ok(success("edited"))])).await;
        studio.update_settings(|settings| settings.model = ModelChoice::Fast);
        let source = ImageData::new("https://img/source.png");
        let edit = ClothingEdit {
            clothing_images: vec![ImageData::new("https://img/coat.png")],
            description: String::new(),
        };

        let edited = studio.edit_clothing(&source, &edit).await.unwrap();
        assert_eq!(edited, ImageData::new("https://img/edited.png"));
        assert!(studio.history().is_empty());

        let requests = studio.service().requests.lock().clone();
        assert_eq!(requests[0].model, ModelChoice::HighQuality);
        assert_eq!(requests[0].reference_images[0], source);
        assert_eq!(requests[0].prompt, edit.prompt());
    }

    #[tokio::test]
    async fn retouch_forwards_mask() {
        let (studio, _store) = studio(ScriptedService::with_outcomes([Err(
            GenerationError::QuotaExhausted("no credits".to_string()),
        )]))
        .await;
        let image = ImageData::new("https://img/photo.png");
        let mask = ImageData::new("data:image/png;base64,AAAA");

        let result = studio.retouch(&image, Some(&mask)).await;
        assert_eq!(
            result.unwrap_err().user_message(),
            "Usage credits exhausted. Please add credits."
        );
        let retouches = studio.service().retouches.lock().clone();
        assert_eq!(retouches[0].image_data, image);
        assert_eq!(retouches[0].mask_data, Some(mask));
        assert!(studio.history().is_empty());
    }

    #[tokio::test]
    async fn a_stalled_request_does_not_hold_back_its_siblings() {
        let service = ScriptedService {
            stall_on: Some(2),
            ..ScriptedService::default()
        };
        let (mut studio, store) = studio(service).await;
        studio.update_settings(|settings| settings.image_count = Some(3));

        let finished = tokio::time::timeout(Duration::from_millis(200), studio.generate()).await;
        assert!(finished.is_err());

        assert_eq!(studio.service().requests.lock().len(), 3);
        assert_eq!(studio.history().len(), 2);
        let stored = History::load(&store).await;
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn outcomes_keep_request_order() {
        let (mut studio, _store) = studio(ScriptedService::with_outcomes([
            Err(GenerationError::EmptyResult),
            Ok(success("second")),
        ]))
        .await;
        studio.update_settings(|settings| settings.image_count = Some(2));

        let outcomes = studio.generate().await;
        assert_eq!(outcomes[0], Err(GenerationError::EmptyResult));
        assert_eq!(
            outcomes[1].as_ref().unwrap().image_data,
            ImageData::new("https://img/second.png")
        );
    }

    #[tokio::test]
    async fn character_mutations_land_in_the_handoff_slot() {
        let (mut studio, _store) = studio(ScriptedService::default()).await;
        let first = studio.session().characters()[0].id.clone();
        assert_eq!(
            studio.handoff().read().await.unwrap().as_deref(),
            Some(studio.session().characters())
        );

        let second = studio.add_character().await.unwrap();
        studio
            .update_character(&second, |character| character.label = "Mia".to_string())
            .await
            .unwrap();
        let slot = studio.handoff().read().await.unwrap().unwrap();
        assert_eq!(slot.len(), 2);
        assert_eq!(slot[1].label, "Mia");

        studio.remove_character(&first).await.unwrap();
        let slot = studio.handoff().read().await.unwrap().unwrap();
        assert_eq!(slot.len(), 1);
        assert_eq!(slot[0].id, second);
    }

    #[tokio::test]
    async fn character_edits_read_the_photo_from_the_handoff_slot() {
        let (mut studio, _store) =
            studio(ScriptedService::with_outcomes([Ok(success("dressed"))])).await;
        let id = studio.session().characters()[0].id.clone();
        let edit = ClothingEdit {
            clothing_images: Vec::new(),
            description: "linen suit".to_string(),
        };

        let missing_photo = studio.edit_character_clothing(&id, &edit).await;
        assert!(matches!(missing_photo, Err(GenerationError::InvalidRequest(_))));
        let unknown = studio.edit_character_clothing("nobody", &edit).await;
        assert!(matches!(unknown, Err(GenerationError::InvalidRequest(_))));

        let face = ImageData::new("https://img/face.png");
        studio
            .update_character(&id, |character| character.face_image = Some(face.clone()))
            .await
            .unwrap();
        let edited = studio.edit_character_clothing(&id, &edit).await.unwrap();
        assert_eq!(edited, ImageData::new("https://img/dressed.png"));

        let requests = studio.service().requests.lock().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].reference_images, vec![face]);
        assert!(studio.history().is_empty());
    }
}
