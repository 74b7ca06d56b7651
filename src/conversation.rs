//! Conversation state shared by the terminal view and the one-shot `send` command
//!
//! Nothing here touches the terminal. The view owns the transcript, the draft
//! input and the pending flag; network work is handed out through
//! [`ConversationView::begin_submit`] and reconciled by [`ConversationView::resolve`].

use serde::{Deserialize, Serialize};
use crate::chat_api::ChatClient;
use crate::error::ChatError;

pub const GENERIC_ERROR_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

/// The role of a turn's speaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Pending,
}

/// How much of a failure is shown in the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Development: show the underlying error
    Detailed,
    /// Everyone else: fixed apology
    Generic,
}

impl ErrorPolicy {
    pub fn for_host(host: Option<&str>) -> Self {
        match host {
            Some("localhost") | Some("127.0.0.1") => ErrorPolicy::Detailed,
            _ => ErrorPolicy::Generic,
        }
    }

    pub fn message(&self, err: &ChatError) -> String {
        match self {
            ErrorPolicy::Detailed => format!("Error: {}", err),
            ErrorPolicy::Generic => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[derive(Debug, Clone)]
pub struct ConversationView {
    transcript: Vec<Turn>,
    draft: String,
    cursor: usize,
    state: InteractionState,
    error_policy: ErrorPolicy,
}

impl ConversationView {
    pub fn new(error_policy: ErrorPolicy) -> Self {
        Self {
            transcript: Vec::new(),
            draft: String::new(),
            cursor: 0,
            state: InteractionState::Idle,
            error_policy,
        }
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state() == InteractionState::Pending
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Cursor position in characters
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether a submit would currently be accepted
    pub fn can_submit(&self) -> bool {
        !self.is_pending() && !self.draft.trim().is_empty()
    }

    pub fn set_draft(&mut self, text: &str) {
        if self.is_pending() {
            return;
        }
        self.draft = text.to_string();
        self.cursor = self.draft.chars().count();
    }

    // Draft editing. The input control is disabled while a request is pending.

    pub fn insert_char(&mut self, c: char) {
        if self.is_pending() {
            return;
        }
        let byte_pos = char_to_byte_index(&self.draft, self.cursor);
        self.draft.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.is_pending() || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(&self.draft, self.cursor);
        self.draft.remove(byte_pos);
    }

    pub fn delete(&mut self) {
        if self.is_pending() {
            return;
        }
        if self.cursor < self.draft.chars().count() {
            let byte_pos = char_to_byte_index(&self.draft, self.cursor);
            self.draft.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.draft.chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.draft.chars().count();
    }

    /// Accept the current draft for sending.
    ///
    /// Clears the draft, enters `Pending` and appends the user turn, in that
    /// order. Returns the trimmed message to send, or `None` when the draft is
    /// blank or a request is already in flight.
    pub fn begin_submit(&mut self) -> Option<String> {
        if !self.can_submit() {
            return None;
        }

        let message = self.draft.trim().to_string();
        self.draft.clear();
        self.cursor = 0;
        self.state = InteractionState::Pending;
        self.transcript.push(Turn::user(message.clone()));

        tracing::debug!(chars = message.chars().count(), "submitting message");
        Some(message)
    }

    /// Reconcile the outstanding exchange. Always returns to `Idle`.
    pub fn resolve(&mut self, result: Result<String, ChatError>) {
        if !self.is_pending() {
            tracing::warn!("ignoring chat result with no request in flight");
            return;
        }

        let turn = match result {
            Ok(response) => {
                tracing::info!(chars = response.chars().count(), "assistant replied");
                Turn::assistant(response)
            }
            Err(err) => {
                tracing::error!(error = %err, "Error sending message");
                Turn::assistant(self.error_policy.message(&err))
            }
        };

        self.transcript.push(turn);
        self.state = InteractionState::Idle;
    }

    /// Run the whole submit lifecycle against `client`.
    pub async fn submit(&mut self, client: &ChatClient) {
        if let Some(message) = self.begin_submit() {
            let result = client.send(&message).await;
            self.resolve(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn view_with_draft(policy: ErrorPolicy, draft: &str) -> ConversationView {
        let mut view = ConversationView::new(policy);
        view.set_draft(draft);
        view
    }

    #[test]
    fn test_begin_submit_clears_draft_and_appends_user_turn() {
        let mut view = view_with_draft(ErrorPolicy::Generic, "  hello there  ");

        let message = view.begin_submit();

        assert_eq!(message.as_deref(), Some("hello there"));
        assert_eq!(view.draft(), "");
        assert_eq!(view.cursor(), 0);
        assert!(view.is_pending());
        assert_eq!(view.transcript(), &[Turn::user("hello there")]);
    }

    #[test]
    fn test_blank_draft_is_ignored() {
        let mut view = view_with_draft(ErrorPolicy::Generic, "   \t ");

        assert_eq!(view.begin_submit(), None);
        assert!(view.is_empty());
        assert_eq!(view.state(), InteractionState::Idle);
        assert_eq!(view.draft(), "   \t ");
    }

    #[test]
    fn test_submit_while_pending_is_dropped() {
        let mut view = view_with_draft(ErrorPolicy::Generic, "first");
        view.begin_submit();

        // Editing is disabled while pending, so force a draft through the field
        view.draft = "second".to_string();
        assert_eq!(view.begin_submit(), None);
        assert_eq!(view.transcript().len(), 1);
        assert_eq!(view.draft(), "second");
    }

    #[test]
    fn test_resolve_success_returns_to_idle() {
        let mut view = view_with_draft(ErrorPolicy::Generic, "question");
        view.begin_submit();

        view.resolve(Ok("answer".to_string()));

        assert_eq!(view.state(), InteractionState::Idle);
        assert_eq!(view.transcript(), &[Turn::user("question"), Turn::assistant("answer")]);
    }

    #[test]
    fn test_resolve_failure_generic_hides_detail() {
        let mut view = view_with_draft(ErrorPolicy::Generic, "question");
        view.begin_submit();

        view.resolve(Err(ChatError::Status { code: 400, detail: "bad input".to_string() }));

        assert_eq!(view.state(), InteractionState::Idle);
        assert_eq!(view.transcript()[1], Turn::assistant(GENERIC_ERROR_MESSAGE));
    }

    #[test]
    fn test_resolve_failure_detailed_shows_detail() {
        let mut view = view_with_draft(ErrorPolicy::Detailed, "question");
        view.begin_submit();

        view.resolve(Err(ChatError::Status { code: 400, detail: "bad input".to_string() }));

        assert_eq!(view.transcript()[1], Turn::assistant("Error: bad input"));
    }

    #[test]
    fn test_failure_does_not_block_next_submit() {
        let mut view = view_with_draft(ErrorPolicy::Detailed, "one");
        view.begin_submit();
        view.resolve(Err(ChatError::Transport("connection refused".to_string())));

        view.set_draft("two");
        assert_eq!(view.begin_submit().as_deref(), Some("two"));
        assert_eq!(view.transcript().len(), 3);
    }

    #[test]
    fn test_resolve_without_pending_is_ignored() {
        let mut view = ConversationView::new(ErrorPolicy::Generic);
        view.resolve(Ok("stray".to_string()));
        assert!(view.is_empty());
    }

    #[test]
    fn test_error_policy_for_host() {
        assert_eq!(ErrorPolicy::for_host(Some("localhost")), ErrorPolicy::Detailed);
        assert_eq!(ErrorPolicy::for_host(Some("127.0.0.1")), ErrorPolicy::Detailed);
        assert_eq!(ErrorPolicy::for_host(Some("gaiasage.example.com")), ErrorPolicy::Generic);
        assert_eq!(ErrorPolicy::for_host(None), ErrorPolicy::Generic);
    }

    #[test]
    fn test_editing_is_utf8_safe_and_disabled_while_pending() {
        let mut view = ConversationView::new(ErrorPolicy::Generic);
        for c in "añb".chars() {
            view.insert_char(c);
        }
        view.cursor_left();
        view.backspace();
        assert_eq!(view.draft(), "ab");
        view.cursor_home();
        view.delete();
        assert_eq!(view.draft(), "b");

        view.cursor_end();
        view.insert_char('!');
        view.begin_submit();
        view.insert_char('x');
        assert_eq!(view.draft(), "");
    }

    #[tokio::test]
    async fn test_submit_scenario_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(serde_json::json!({"message": "Conduct deforestation analysis in Borneo"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": "Here is the analysis..."})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ChatClient::new(&mock_server.uri());
        let mut view = view_with_draft(ErrorPolicy::Generic, "Conduct deforestation analysis in Borneo");

        view.submit(&client).await;

        assert_eq!(
            view.transcript(),
            &[
                Turn::user("Conduct deforestation analysis in Borneo"),
                Turn::assistant("Here is the analysis..."),
            ]
        );
        assert_eq!(view.state(), InteractionState::Idle);
    }

    #[tokio::test]
    async fn test_submit_transport_failure_in_development() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = ChatClient::new(&format!("http://127.0.0.1:{}", port));
        let mut view = view_with_draft(ErrorPolicy::for_host(client.host().as_deref()), "hello");

        view.submit(&client).await;

        let last = view.transcript().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.starts_with("Error: "));
        assert!(last.content.len() > "Error: ".len());
        assert_eq!(view.state(), InteractionState::Idle);
    }

    #[tokio::test]
    async fn test_submit_empty_draft_sends_nothing() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = ChatClient::new(&mock_server.uri());
        let mut view = view_with_draft(ErrorPolicy::Generic, "  ");

        view.submit(&client).await;

        assert!(view.is_empty());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Turn::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }
}
