pub mod gateway;
pub mod images;
pub mod openai_compat;
pub mod prompts;
pub mod visuals;

pub use gateway::{
    ChatCompletionRequest, ChatGateway, ChatGatewayError, ChatGatewayFuture, ChatMessage,
    ContentPart, MessageContent, Role,
};
pub use images::{ImageApiClient, ImageGateway, ImageGatewayError, generate_images};
pub use openai_compat::OpenAiCompatGateway;
pub use prompts::{
    compose_transcript_lesson_prompt, compose_tutor_prompt, transcript_user_message,
};
pub use visuals::extract_visual_prompts;
