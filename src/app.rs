use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use crate::chat_api::ChatClient;
use crate::conversation::ConversationView;
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    pub conversation: ConversationView,
    pub client: ChatClient,
    events: UnboundedSender<AppEvent>,

    // Chat scroll state
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of chat area for scroll calculations
    pub chat_width: u16,  // Inner width of chat area for wrap calculations
    pub chat_area: Option<Rect>,
    chat_lines: u16, // Wrapped line count from the last render
    follow_bottom: bool,

    pub animation_frame: u8,
}

impl App {
    pub fn new(
        conversation: ConversationView,
        client: ChatClient,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            conversation,
            client,
            events,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            chat_lines: 0,
            follow_bottom: true,
            animation_frame: 0,
        }
    }

    /// Submit the draft and send it in the background. The result comes back
    /// through the event channel as [`AppEvent::ChatResolved`].
    pub fn submit(&mut self) {
        let Some(message) = self.conversation.begin_submit() else {
            return;
        };

        self.animation_frame = 0;
        self.scroll_to_bottom();

        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = client.send(&message).await;
            // Receiver only disappears when the app is shutting down
            let _ = events.send(AppEvent::ChatResolved(result));
        });
    }

    pub fn on_chat_resolved(&mut self, result: Result<String, crate::error::ChatError>) {
        self.conversation.resolve(result);
        self.scroll_to_bottom();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
        self.follow_bottom = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_bottom = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
        self.follow_bottom = self.max_scroll() == 0;
    }

    /// Keep the newest turn (or "Thinking...") in view. The exact offset is
    /// settled at render time against the wrapped layout.
    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
        self.chat_scroll = self.max_scroll();
    }

    /// Terminal resized: header, input box, footer and chat borders take 7 rows
    pub fn on_resize(&mut self, width: u16, height: u16) {
        self.chat_width = width.saturating_sub(2);
        self.chat_height = height.saturating_sub(7);
        self.scroll_to_bottom();
    }

    /// Record the rendered line count of the transcript and clamp the scroll
    /// offset to it. Called by the renderer once the wrapped height is known.
    pub fn apply_layout(&mut self, total_lines: u16) {
        self.chat_lines = total_lines;
        let max = self.max_scroll();
        self.chat_scroll = if self.follow_bottom { max } else { self.chat_scroll.min(max) };
    }

    fn max_scroll(&self) -> u16 {
        self.chat_lines.saturating_sub(self.chat_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ErrorPolicy, InteractionState, Turn};
    use tokio::sync::mpsc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_app(base_url: &str) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(ConversationView::new(ErrorPolicy::Detailed), ChatClient::new(base_url), tx);
        (app, rx)
    }

    #[tokio::test]
    async fn test_submit_round_trip_through_event_channel() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": "pong"})))
            .mount(&mock_server)
            .await;

        let (mut app, mut rx) = test_app(&mock_server.uri());
        app.conversation.set_draft("ping");

        app.submit();

        // User turn is visible before the exchange completes
        assert_eq!(app.conversation.transcript(), &[Turn::user("ping")]);
        assert!(app.conversation.is_pending());
        assert_eq!(app.conversation.draft(), "");

        match rx.recv().await {
            Some(AppEvent::ChatResolved(result)) => app.on_chat_resolved(result),
            other => panic!("unexpected event: {:?}", other),
        }

        assert_eq!(app.conversation.state(), InteractionState::Idle);
        assert_eq!(app.conversation.transcript()[1], Turn::assistant("pong"));
    }

    #[tokio::test]
    async fn test_blank_submit_spawns_nothing() {
        let (mut app, mut rx) = test_app("http://localhost:1");
        app.submit();

        assert!(app.conversation.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_manual_scroll_stops_following_until_bottom() {
        let (mut app, _rx) = test_app("http://localhost:1");
        app.chat_height = 4;
        app.apply_layout(10);
        assert_eq!(app.chat_scroll, 6);

        app.scroll_up(2);
        assert_eq!(app.chat_scroll, 4);
        // New content arrives while reading history: offset is kept
        app.apply_layout(12);
        assert_eq!(app.chat_scroll, 4);

        app.scroll_down(10);
        assert_eq!(app.chat_scroll, 8);
        app.apply_layout(15);
        assert_eq!(app.chat_scroll, 11);

        app.scroll_to_top();
        assert_eq!(app.chat_scroll, 0);
        app.scroll_to_bottom();
        assert_eq!(app.chat_scroll, 11);
    }

    #[test]
    fn test_resize_updates_chat_dimensions() {
        let (mut app, _rx) = test_app("http://localhost:1");
        app.apply_layout(30);
        app.scroll_up(5);

        app.on_resize(40, 20);

        assert_eq!(app.chat_width, 38);
        assert_eq!(app.chat_height, 13);
        assert_eq!(app.chat_scroll, 17);
    }

    #[tokio::test]
    async fn test_tick_animates_only_while_pending() {
        let (mut app, _rx) = test_app("http://localhost:1");
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);

        app.conversation.set_draft("hi");
        app.submit();
        app.tick_animation();
        app.tick_animation();
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);
        app.tick_animation();
        assert_eq!(app.animation_frame, 1);
    }
}
