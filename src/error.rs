/// Failure of a single generation, edit, or retouch request.
///
/// Every variant is terminal for the request that produced it; nothing in the
/// crate retries on the caller's behalf.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The service answered but reported a domain error in its body.
    #[error("Image generation failed: {0}")]
    Domain(String),
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),
    /// Send failure, non-2xx status, or an undecodable body.
    #[error("Request to image service failed: {0}")]
    Transport(String),
    /// A successful response that carried no image.
    #[error("No image was returned")]
    EmptyResult,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GenerationError {
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Domain(message) => message.clone(),
            GenerationError::RateLimited(_) => {
                "Rate limit exceeded. Please try again in a moment.".to_string()
            }
            GenerationError::QuotaExhausted(_) => {
                "Usage credits exhausted. Please add credits.".to_string()
            }
            GenerationError::Transport(_) => "Failed to generate image".to_string(),
            GenerationError::EmptyResult => {
                "No image was returned. Try adjusting your prompt.".to_string()
            }
            GenerationError::InvalidRequest(message) => message.clone(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Domain(_) => "domain",
            GenerationError::RateLimited(_) => "rate_limited",
            GenerationError::QuotaExhausted(_) => "quota_exhausted",
            GenerationError::Transport(_) => "transport",
            GenerationError::EmptyResult => "empty_result",
            GenerationError::InvalidRequest(_) => "invalid_request",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StudioError {
    #[error("A session holds at most {0} characters")]
    TooManyCharacters(usize),
    #[error("At least one character must remain")]
    LastCharacter,
    #[error("Unknown character id: {0}")]
    UnknownCharacter(String),
}
