//! Text-generation seam.
//!
//! The chat service only sees this trait; the Gemini adapter in
//! planeja-infra is one implementation, test generators are another.

use planeja_types::chat::MessageRole;
use planeja_types::error::GenerationError;
use tokio::sync::mpsc::UnboundedSender;

/// One turn of conversation history handed to the generator.
#[derive(Debug, Clone)]
pub struct GenerationMessage {
    pub role: MessageRole,
    pub content: String,
}

/// A streaming text generator.
///
/// Implementations send each produced chunk into `tokens` in production
/// order and return the full text once generation finishes. The sender is
/// dropped on return, which closes the channel for the draining side.
pub trait TextGenerator: Send + Sync {
    fn generate(
        &self,
        history: &[GenerationMessage],
        tokens: UnboundedSender<String>,
    ) -> impl std::future::Future<Output = Result<String, GenerationError>> + Send;
}
