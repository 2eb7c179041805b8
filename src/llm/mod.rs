pub mod gateway;
pub mod media;

pub use gateway::{GatewayClient, GenerationRequest, ImageResponse, ImageService, RetouchRequest};
pub use media::ImageData;
