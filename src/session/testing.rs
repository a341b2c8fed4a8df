//! Mock collaborators for session tests

use super::{CredentialSource, MessageKind, UiSurface, VoiceClient, VoiceEvent};
use crate::transcript::ConversationTurn;
use crate::transport::{ChatBackend, Delivery, ReplySink, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// ============================================================================
// Mock chat backend
// ============================================================================

/// Chat backend that answers from a queue
#[derive(Default)]
pub struct MockChatBackend {
    results: Mutex<VecDeque<Result<Delivery, TransportError>>>,
    /// Every `(utterance, prior)` passed to `send`
    pub sent: Mutex<Vec<(String, Vec<ConversationTurn>)>>,
    sink: Mutex<Option<ReplySink>>,
    opens: AtomicUsize,
}

impl MockChatBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queue_reply(&self, text: &str) {
        self.queue_result(Ok(Delivery::Reply(text.to_string())));
    }

    pub fn queue_result(&self, result: Result<Delivery, TransportError>) {
        self.results.lock().unwrap().push_back(result);
    }

    /// Deliver a reply the way an observed backend would
    pub fn push_async_reply(&self, text: &str) {
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            sink.send(text.to_string()).unwrap();
        }
    }

    pub fn sent_messages(&self) -> Vec<(String, Vec<ConversationTurn>)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn open(&self) -> Result<(), TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send(
        &self,
        utterance: &str,
        prior: &[ConversationTurn],
    ) -> Result<Delivery, TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push((utterance.to_string(), prior.to_vec()));
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("No mock reply queued".into())))
    }

    fn on_reply(&self, sink: ReplySink) {
        *self.sink.lock().unwrap() = Some(sink);
    }
}

// ============================================================================
// Mock credential source
// ============================================================================

#[derive(Default)]
pub struct MockCredentialSource {
    results: Mutex<VecDeque<Result<String, TransportError>>>,
    /// Agent id of every request
    pub requests: Mutex<Vec<Option<String>>>,
}

impl MockCredentialSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queue(&self, result: Result<String, TransportError>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CredentialSource for MockCredentialSource {
    async fn create_web_call(&self, agent_id: Option<&str>) -> Result<String, TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push(agent_id.map(str::to_string));
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("No mock credential queued".into())))
    }
}

// ============================================================================
// Mock voice client
// ============================================================================

#[derive(Default)]
pub struct MockVoiceClient {
    /// Access tokens calls were started with
    pub started: Mutex<Vec<String>>,
    stops: AtomicUsize,
    events: Mutex<Option<mpsc::UnboundedSender<VoiceEvent>>>,
}

impl MockVoiceClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Emit a provider notification
    pub fn emit(&self, event: VoiceEvent) {
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            tx.send(event).unwrap();
        }
    }

    pub fn started_tokens(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceClient for MockVoiceClient {
    async fn start_call(&self, access_token: &str) -> Result<(), String> {
        self.started.lock().unwrap().push(access_token.to_string());
        Ok(())
    }

    async fn stop_call(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn subscribe(&self, events: mpsc::UnboundedSender<VoiceEvent>) {
        *self.events.lock().unwrap() = Some(events);
    }
}

// ============================================================================
// Recording surface
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOp {
    Popup(bool),
    Message(MessageKind, String),
    ShowTyping,
    HideTyping,
    Scroll,
    CallVisible(bool),
    CallStatus(String),
    CallTimer(String),
    Speaking(bool),
}

/// Surface that records every call; clones share the record
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    ops: Arc<Mutex<Vec<SurfaceOp>>>,
}

impl RecordingSurface {
    pub fn ops(&self) -> Vec<SurfaceOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Message list operations only, without scrolls
    pub fn chat_ops(&self) -> Vec<SurfaceOp> {
        self.ops()
            .into_iter()
            .filter(|op| {
                matches!(
                    op,
                    SurfaceOp::Message(..) | SurfaceOp::ShowTyping | SurfaceOp::HideTyping
                )
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                SurfaceOp::CallStatus(status) => Some(status),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: SurfaceOp) {
        self.ops.lock().unwrap().push(op);
    }
}

impl UiSurface for RecordingSurface {
    fn set_popup_open(&mut self, open: bool) {
        self.record(SurfaceOp::Popup(open));
    }

    fn append_message(&mut self, kind: MessageKind, text: &str) {
        self.record(SurfaceOp::Message(kind, text.to_string()));
    }

    fn show_typing(&mut self) {
        self.record(SurfaceOp::ShowTyping);
    }

    fn hide_typing(&mut self) {
        self.record(SurfaceOp::HideTyping);
    }

    fn scroll_to_end(&mut self) {
        self.record(SurfaceOp::Scroll);
    }

    fn set_call_visible(&mut self, visible: bool) {
        self.record(SurfaceOp::CallVisible(visible));
    }

    fn set_call_status(&mut self, status: &str) {
        self.record(SurfaceOp::CallStatus(status.to_string()));
    }

    fn set_call_timer(&mut self, timer: &str) {
        self.record(SurfaceOp::CallTimer(timer.to_string()));
    }

    fn set_speaking(&mut self, speaking: bool) {
        self.record(SurfaceOp::Speaking(speaking));
    }
}
