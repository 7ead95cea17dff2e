//! Submission of finished questions to the host

use tokio::sync::mpsc;

/// How a question came to be submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitSource {
    /// Debounced voice utterance
    Voice,
    /// Enter key or send button
    Manual,
}

/// A question handed to the answering backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Question text
    pub text: String,
    /// Conversation the question belongs to
    pub conversation_id: Option<String>,
    /// Submission path
    pub source: SubmitSource,
}

/// Receives submitted questions
///
/// Fire-and-forget: the controller does not wait for an answer.
pub trait SubmitSink: Send {
    /// Send a question
    fn submit(&self, question: Question);
}

impl SubmitSink for mpsc::UnboundedSender<Question> {
    fn submit(&self, question: Question) {
        if self.send(question).is_err() {
            tracing::warn!("question receiver dropped");
        }
    }
}
