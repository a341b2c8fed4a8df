//! The session actor and its handle

use super::{
    Channel, CredentialSource, MessageKind, SessionConfig, SessionEvent, UiSurface, VoiceClient,
};
use crate::call::{transition, CallEffect, CallEvent, CallSession};
use crate::persona::{CHAT_FAILURE_REPLY, WIDGET_UNAVAILABLE_REPLY};
use crate::transcript::{ConversationTurn, Transcript};
use crate::transport::{ChatBackend, Delivery, TransportError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
#[error("Session has shut down")]
pub struct SessionClosed;

/// Point-in-time copy of the session's state
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub transcript: Vec<ConversationTurn>,
    pub call: CallSession,
    pub popup_open: bool,
    pub typing: bool,
    pub channel: Option<Channel>,
}

/// Sends user actions to a running session
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionEvent>,
}

impl SessionHandle {
    async fn send(&self, event: SessionEvent) -> Result<(), SessionClosed> {
        self.tx.send(event).await.map_err(|_| SessionClosed)
    }

    pub async fn open_popup(&self) -> Result<(), SessionClosed> {
        self.send(SessionEvent::OpenPopup).await
    }

    pub async fn close_popup(&self) -> Result<(), SessionClosed> {
        self.send(SessionEvent::ClosePopup).await
    }

    /// Whitespace-only text is ignored by the session
    pub async fn submit_user_message(&self, text: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(SessionEvent::SubmitUserMessage(text.into())).await
    }

    pub async fn select_channel(&self, channel: Channel) -> Result<(), SessionClosed> {
        self.send(SessionEvent::SelectChannel(channel)).await
    }

    pub async fn hang_up(&self) -> Result<(), SessionClosed> {
        self.send(SessionEvent::Call(CallEvent::HangUp)).await
    }

    /// Close the call modal from outside, e.g. a backdrop click
    pub async fn dismiss_call(&self) -> Result<(), SessionClosed> {
        self.send(SessionEvent::Call(CallEvent::Dismiss)).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionClosed> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionEvent::Snapshot(tx)).await?;
        rx.await.map_err(|_| SessionClosed)
    }
}

/// Owns all per-session state and applies events to it one at a time.
///
/// Slow work (chat sends, credential requests, timers) runs in spawned tasks
/// that report back through the event channel, so the loop itself never
/// waits on I/O. Stops once every [`SessionHandle`] is gone.
pub struct SessionRuntime {
    config: SessionConfig,
    backend: Arc<dyn ChatBackend>,
    credentials: Option<Arc<dyn CredentialSource>>,
    voice: Option<Arc<dyn VoiceClient>>,
    surface: Box<dyn UiSurface>,

    transcript: Transcript,
    call: CallSession,
    popup_open: bool,
    typing: bool,
    channel: Option<Channel>,
    backend_opened: bool,
    ticker: Option<CancellationToken>,

    event_rx: mpsc::Receiver<SessionEvent>,
    event_tx: mpsc::WeakSender<SessionEvent>,
    reply_rx: mpsc::UnboundedReceiver<String>,
    voice_rx: mpsc::UnboundedReceiver<super::VoiceEvent>,
}

impl SessionRuntime {
    pub fn new(
        config: SessionConfig,
        backend: Arc<dyn ChatBackend>,
        surface: impl UiSurface + 'static,
    ) -> (Self, SessionHandle) {
        let (tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        backend.on_reply(reply_tx);
        // Replaced when a voice client is attached
        let (_, voice_rx) = mpsc::unbounded_channel();

        let runtime = Self {
            config,
            backend,
            credentials: None,
            voice: None,
            surface: Box::new(surface),
            transcript: Transcript::new(),
            call: CallSession::new(),
            popup_open: false,
            typing: false,
            channel: None,
            backend_opened: false,
            ticker: None,
            event_rx,
            event_tx: tx.downgrade(),
            reply_rx,
            voice_rx,
        };
        (runtime, SessionHandle { tx })
    }

    pub fn with_credentials(mut self, source: Arc<dyn CredentialSource>) -> Self {
        self.credentials = Some(source);
        self
    }

    pub fn with_voice(mut self, voice: Arc<dyn VoiceClient>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        voice.subscribe(tx);
        self.voice_rx = rx;
        self.voice = Some(voice);
        self
    }

    pub async fn run(mut self) {
        tracing::info!(backend = self.backend.name(), "Starting session runtime");

        loop {
            tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                Some(text) = self.reply_rx.recv() => {
                    self.handle_event(SessionEvent::ReplyReceived(text));
                }
                Some(voice) = self.voice_rx.recv() => {
                    self.handle_event(SessionEvent::Call(voice.into_call_event()));
                }
            }
        }

        self.stop_ticker();
        tracing::info!("Session runtime stopped");
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::OpenPopup => self.set_popup(true),
            SessionEvent::ClosePopup => self.set_popup(false),
            SessionEvent::SelectChannel(Channel::Chat) => {
                self.channel = Some(Channel::Chat);
                self.open_backend();
            }
            SessionEvent::SelectChannel(Channel::Talk) => {
                self.channel = Some(Channel::Talk);
                self.set_popup(false);
                self.process_call_event(CallEvent::StartRequested);
            }
            SessionEvent::SubmitUserMessage(text) => self.submit(&text),
            SessionEvent::ReplyReceived(text) => self.render_reply(text),
            SessionEvent::TransportFailed(error) => self.transport_failed(&error),
            SessionEvent::FallbackDue => self.render_notice(WIDGET_UNAVAILABLE_REPLY),
            SessionEvent::Credential { attempt, outcome } => {
                if attempt != self.call.attempt {
                    tracing::debug!(attempt, current = self.call.attempt, "Dropping stale credential");
                    return;
                }
                let event = match outcome {
                    Ok(access_token) => CallEvent::CredentialIssued { access_token },
                    Err(reason) => CallEvent::CredentialFailed { reason },
                };
                self.process_call_event(event);
            }
            SessionEvent::Call(event) => self.process_call_event(event),
            SessionEvent::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            transcript: self.transcript.turns().to_vec(),
            call: self.call.clone(),
            popup_open: self.popup_open,
            typing: self.typing,
            channel: self.channel,
        }
    }

    // ------------------------------------------------------------------
    // Chat
    // ------------------------------------------------------------------

    fn set_popup(&mut self, open: bool) {
        if self.popup_open != open {
            self.popup_open = open;
            self.surface.set_popup_open(open);
        }
    }

    fn open_backend(&mut self) {
        if self.backend_opened {
            return;
        }
        self.backend_opened = true;

        let backend = self.backend.clone();
        tokio::spawn(async move {
            if let Err(e) = backend.open().await {
                tracing::warn!(backend = backend.name(), error = %e, "Opening chat backend failed");
            }
        });
    }

    fn submit(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("Ignoring empty message");
            return;
        }
        // Typing without picking a channel first means chat
        if self.channel != Some(Channel::Chat) {
            self.channel = Some(Channel::Chat);
            self.open_backend();
        }

        self.transcript.push(ConversationTurn::user(text));
        self.surface.append_message(MessageKind::User, text);
        self.surface.scroll_to_end();
        self.show_typing();

        let backend = self.backend.clone();
        let utterance = text.to_string();
        let prior = self.transcript.prior_to_latest().to_vec();
        self.spawn_event(async move {
            match backend.send(&utterance, &prior).await {
                Ok(Delivery::Reply(reply)) => Some(SessionEvent::ReplyReceived(reply)),
                Ok(Delivery::Pending) => None,
                Err(e) => Some(SessionEvent::TransportFailed(e)),
            }
        });
    }

    fn show_typing(&mut self) {
        if !self.typing {
            self.typing = true;
            self.surface.show_typing();
            self.surface.scroll_to_end();
        }
    }

    fn hide_typing(&mut self) {
        if self.typing {
            self.typing = false;
            self.surface.hide_typing();
        }
    }

    fn render_reply(&mut self, text: String) {
        self.hide_typing();
        self.surface.append_message(MessageKind::Assistant, &text);
        self.surface.scroll_to_end();
        self.transcript.push(ConversationTurn::assistant(text));
    }

    fn render_notice(&mut self, text: &str) {
        self.hide_typing();
        self.surface.append_message(MessageKind::Notice, text);
        self.surface.scroll_to_end();
    }

    fn transport_failed(&mut self, error: &TransportError) {
        match error {
            TransportError::WidgetUnavailable(reason) => {
                tracing::warn!(reason = %reason, "Chat widget unavailable");
                self.spawn_after(self.config.fallback_delay, SessionEvent::FallbackDue);
            }
            other => {
                tracing::warn!(backend = self.backend.name(), error = %other, "Chat request failed");
                self.render_notice(CHAT_FAILURE_REPLY);
            }
        }
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    fn process_call_event(&mut self, event: CallEvent) {
        let mut pending = vec![event];

        while let Some(event) = pending.pop() {
            let name = event.name();
            let result = match transition(&self.call, event) {
                Ok(result) => result,
                Err(e) => {
                    tracing::debug!(error = %e, "Call event ignored");
                    continue;
                }
            };

            if result.new_session.state != self.call.state {
                tracing::info!(
                    from = self.call.state.as_str(),
                    to = result.new_session.state.as_str(),
                    event = name,
                    "Call state changed"
                );
            }
            self.call = result.new_session;

            for effect in result.effects {
                if let Some(generated) = self.execute_call_effect(effect) {
                    pending.push(generated);
                }
            }
        }
    }

    fn execute_call_effect(&mut self, effect: CallEffect) -> Option<CallEvent> {
        match effect {
            CallEffect::ShowCallUi => self.surface.set_call_visible(true),
            CallEffect::HideCallUi => self.surface.set_call_visible(false),
            CallEffect::SetStatus(status) => self.surface.set_call_status(status),
            CallEffect::RenderTimer(display) => self.surface.set_call_timer(&display),
            CallEffect::SetSpeaking(speaking) => self.surface.set_speaking(speaking),

            CallEffect::RequestCredential { attempt } => {
                let Some(source) = self.credentials.clone() else {
                    return Some(CallEvent::CredentialFailed {
                        reason: "no credential source configured".into(),
                    });
                };
                let agent_id = self.config.agent_id.clone();
                self.spawn_event(async move {
                    let outcome = source
                        .create_web_call(agent_id.as_deref())
                        .await
                        .map_err(|e| e.to_string());
                    if let Err(e) = &outcome {
                        tracing::warn!(error = %e, "Could not get a call credential");
                    }
                    Some(SessionEvent::Credential { attempt, outcome })
                });
            }

            CallEffect::StartProviderCall { access_token } => {
                let Some(voice) = self.voice.clone() else {
                    return Some(CallEvent::ProviderError {
                        message: "no voice client configured".into(),
                    });
                };
                self.spawn_event(async move {
                    match voice.start_call(&access_token).await {
                        Ok(()) => None,
                        Err(message) => {
                            tracing::warn!(error = %message, "Voice call failed to start");
                            Some(SessionEvent::Call(CallEvent::ProviderError { message }))
                        }
                    }
                });
            }

            CallEffect::StopProviderCall => {
                if let Some(voice) = self.voice.clone() {
                    tokio::spawn(async move { voice.stop_call().await });
                }
            }

            CallEffect::StartTicker { attempt } => self.start_ticker(attempt),
            CallEffect::StopTicker => self.stop_ticker(),
            CallEffect::ScheduleReset { delay, attempt } => {
                self.spawn_after(delay, SessionEvent::Call(CallEvent::ResetDue { attempt }));
            }
        }
        None
    }

    fn start_ticker(&mut self, attempt: u32) {
        self.stop_ticker();

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let events = self.event_tx.clone();
        let period = self.config.tick_interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    biased;
                    () = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(tx) = events.upgrade() else { break };
                        if tx.send(SessionEvent::Call(CallEvent::Tick { attempt })).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        self.ticker = Some(token);
    }

    fn stop_ticker(&mut self) {
        if let Some(token) = self.ticker.take() {
            token.cancel();
        }
    }

    // ------------------------------------------------------------------
    // Background work
    // ------------------------------------------------------------------

    /// Run `work` in the background and feed its event, if any, back in.
    fn spawn_event<F>(&self, work: F)
    where
        F: Future<Output = Option<SessionEvent>> + Send + 'static,
    {
        let Some(tx) = self.event_tx.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            if let Some(event) = work.await {
                let _ = tx.send(event).await;
            }
        });
    }

    fn spawn_after(&self, delay: Duration, event: SessionEvent) {
        self.spawn_event(async move {
            tokio::time::sleep(delay).await;
            Some(event)
        });
    }
}
