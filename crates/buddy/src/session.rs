//! Conversation state for one plant, owned by the caller.
//!
//! The session never talks to the network on its own; each turn is turned
//! into a [`ChatRequest`] and handed to a [`ChatBackend`].

use herbarium::personality::{greeting, persona_prompt};
use herbarium::{build_profile, CareRecord, PersonalityProfile};

use crate::chat::{ChatBackend, ChatError, ChatMessage};

/// Everything a backend needs for one reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
  pub system_context: String,
  pub greeting: String,
  pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone)]
pub struct ChatSession {
  record: CareRecord,
  profile: PersonalityProfile,
  history: Vec<ChatMessage>,
}

impl ChatSession {
  pub fn new(record: CareRecord) -> Self {
    let profile = build_profile(&record);
    Self { record, profile, history: Vec::new() }
  }

  /// Resume with a previously saved conversation.
  pub fn with_history(record: CareRecord, history: Vec<ChatMessage>) -> Self {
    Self { history, ..Self::new(record) }
  }

  pub fn record(&self) -> &CareRecord {
    &self.record
  }

  pub fn profile(&self) -> &PersonalityProfile {
    &self.profile
  }

  pub fn history(&self) -> &[ChatMessage] {
    &self.history
  }

  /// Talk to a different plant. The conversation restarts unless it is the
  /// same plant.
  pub fn switch_plant(&mut self, record: CareRecord) {
    if record.name != self.record.name {
      *self = Self::new(record);
    }
  }

  /// The request for answering the current history.
  pub fn request(&self) -> ChatRequest {
    ChatRequest {
      system_context: persona_prompt(&self.record, &self.profile),
      greeting: greeting(&self.record),
      history: self.history.clone(),
    }
  }

  /// Send `text` and record the reply. Backend failures become an in-character
  /// apology, so a turn always produces a reply.
  pub async fn ask(&mut self, backend: &dyn ChatBackend, text: &str) -> String {
    self.history.push(ChatMessage::user(text));
    let request = self.request();

    let reply = match backend
      .send_chat(&request.system_context, &request.greeting, &request.history)
      .await
    {
      Ok(reply) => reply,
      Err(e) => {
        tracing::warn!(plant = %self.record.name, "chat failed: {e}");
        fallback_reply(&e).to_string()
      }
    };

    self.history.push(ChatMessage::assistant(reply.clone()));
    reply
  }
}

/// What the plant says when the chat backend fails.
pub fn fallback_reply(error: &ChatError) -> &'static str {
  match error {
    ChatError::Timeout => "Sorry, I'm feeling a bit slow right now.",
    ChatError::Request { .. } => {
      "Sorry, I'm having trouble communicating with the language model."
    }
    ChatError::UnexpectedResponse { .. } => {
      "Sorry, I couldn't quite understand that response format."
    }
    ChatError::MissingApiKey { .. } => "Oops, something went wrong on my end processing the chat.",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::chat::{MockChatBackend, Role};

  #[tokio::test]
  async fn ask_records_both_sides() {
    let mut backend = MockChatBackend::new();
    backend
      .expect_send_chat()
      .withf(|context, greeting, history| {
        context.contains("'Pothos'")
          && greeting.contains("I am Pothos")
          && history.len() == 1
          && history[0].content == "Hi!"
      })
      .times(1)
      .returning(|_, _, _| Ok("Hello from the windowsill.".to_string()));

    let mut session = ChatSession::new(CareRecord::new("Pothos"));
    let reply = session.ask(&backend, "Hi!").await;

    assert_eq!(reply, "Hello from the windowsill.");
    let roles: Vec<Role> = session.history().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
  }

  #[tokio::test]
  async fn backend_failure_becomes_apology() {
    let mut backend = MockChatBackend::new();
    backend.expect_send_chat().returning(|_, _, _| Err(ChatError::Timeout));

    let mut session = ChatSession::new(CareRecord::new("Fern"));
    let reply = session.ask(&backend, "How are you?").await;

    assert_eq!(reply, "Sorry, I'm feeling a bit slow right now.");
    assert_eq!(session.history().len(), 2);
  }

  #[test]
  fn switching_plant_clears_history() {
    let mut session = ChatSession::with_history(
      CareRecord::new("Fern"),
      vec![ChatMessage::user("hello"), ChatMessage::assistant("hi")],
    );

    session.switch_plant(CareRecord::new("Fern"));
    assert_eq!(session.history().len(), 2);

    session.switch_plant(CareRecord::new("Cactus"));
    assert!(session.history().is_empty());
    assert_eq!(session.profile().title, "The Cactus");
  }

  #[test]
  fn request_carries_persona() {
    let session = ChatSession::new(CareRecord::new("Aloe"));
    let request = session.request();
    assert!(request.system_context.contains("act as the plant 'Aloe'"));
    assert_eq!(request.greeting, "Okay, I understand. I am Aloe. Ask me anything.");
    assert!(request.history.is_empty());
  }
}
