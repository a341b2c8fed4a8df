//! Driving the widget as a chat transport

use super::discovery::{discover, DiscoveryConfig, DiscoveryOutcome};
use super::selectors::{resolve, OpenStrategy, UserMarkers, WidgetSelectors};
use super::{DomError, ElementSnapshot, MutationBatch, NodeRef, WidgetDom};
use crate::transcript::ConversationTurn;
use crate::transport::{ChatBackend, Delivery, ReplySink, TransportError};
use async_trait::async_trait;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex, OnceCell};
use tokio_util::sync::CancellationToken;

/// Fixed waits between steps whose completion the widget does not signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeTiming {
    /// After opening, before touching the input
    pub open_settle: Duration,
    /// After the input event, before pressing send
    pub input_settle: Duration,
}

impl Default for BridgeTiming {
    fn default() -> Self {
        Self {
            open_settle: Duration::from_millis(300),
            input_settle: Duration::from_millis(150),
        }
    }
}

/// The located widget, as last observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetHandle {
    /// Shadow host of the widget's subtree
    pub root: NodeRef,
    pub found: bool,
    pub last_observed_message_count: usize,
}

/// Index of the first message-list child not yet looked at.
///
/// Only ever moves forward, so a child is handed out at most once even if
/// the widget re-renders and the list shrinks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageCursor {
    seen: usize,
}

impl MessageCursor {
    pub fn new(seen: usize) -> Self {
        Self { seen }
    }

    pub fn seen(self) -> usize {
        self.seen
    }

    /// Move to `total` children and return the indices that are new.
    pub fn advance(&mut self, total: usize) -> Range<usize> {
        let start = self.seen;
        self.seen = self.seen.max(total);
        start..self.seen
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
}

/// Best-effort guess at who wrote a message-list child. Anything not
/// carrying a user marker counts as the assistant.
pub fn classify(element: &ElementSnapshot, markers: &UserMarkers) -> Author {
    let by_class = markers.classes.iter().any(|c| element.has_class(c));
    let by_attribute = markers.attributes.iter().any(|(name, value)| {
        element
            .attribute(name)
            .is_some_and(|actual| actual.eq_ignore_ascii_case(value))
    });

    if by_class || by_attribute {
        Author::User
    } else {
        Author::Assistant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiscoveryState {
    Pending,
    Found,
    Abandoned,
}

#[derive(Default)]
struct BridgeInner {
    root: Option<NodeRef>,
    trigger: Option<NodeRef>,
    cursor: MessageCursor,
    /// Something has been typed into the widget
    sent: bool,
    observing: bool,
    sink: Option<ReplySink>,
}

struct Shared {
    dom: Arc<dyn WidgetDom>,
    selectors: WidgetSelectors,
    timing: BridgeTiming,
    state: watch::Sender<DiscoveryState>,
    opened: OnceCell<()>,
    /// Held while an observer is being attached
    attaching: AsyncMutex<()>,
    inner: Mutex<BridgeInner>,
    cancel: CancellationToken,
}

/// Chat transport over the embedded widget. Dropping it stops discovery
/// and observation.
pub struct WidgetBridge {
    shared: Arc<Shared>,
}

impl WidgetBridge {
    /// Create the bridge and start looking for the widget in the background.
    pub fn spawn(
        dom: Arc<dyn WidgetDom>,
        selectors: WidgetSelectors,
        discovery: DiscoveryConfig,
        timing: BridgeTiming,
    ) -> Self {
        let (state, _) = watch::channel(DiscoveryState::Pending);
        let shared = Arc::new(Shared {
            dom,
            selectors,
            timing,
            state,
            opened: OnceCell::new(),
            attaching: AsyncMutex::new(()),
            inner: Mutex::new(BridgeInner::default()),
            cancel: CancellationToken::new(),
        });

        tokio::spawn(Shared::run_discovery(shared.clone(), discovery));
        Self { shared }
    }

    /// The located widget, if discovery succeeded
    pub fn handle(&self) -> Option<WidgetHandle> {
        let inner = self.shared.lock();
        inner.root.as_ref().map(|root| WidgetHandle {
            root: root.clone(),
            found: true,
            last_observed_message_count: inner.cursor.seen(),
        })
    }

    /// Stop discovery and observation
    pub fn shutdown(&self) {
        self.shared.cancel.cancel();
    }
}

impl Drop for WidgetBridge {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BridgeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_discovery(self: Arc<Self>, config: DiscoveryConfig) {
        let outcome = discover(
            self.dom.as_ref(),
            &self.selectors,
            config,
            self.cancel.child_token(),
        )
        .await;

        match outcome {
            DiscoveryOutcome::Found { host, trigger } => {
                let declarations = self.selectors.suppress_style.declarations();
                if let Err(e) = self.dom.apply_style(&trigger, declarations).await {
                    tracing::warn!(error = %e, "Could not hide the widget's own button");
                }
                {
                    let mut inner = self.lock();
                    inner.root = Some(host.clone());
                    inner.trigger = Some(trigger);
                }
                self.ensure_observer(&host).await;
                self.state.send_replace(DiscoveryState::Found);
            }
            DiscoveryOutcome::TimedOut | DiscoveryOutcome::Cancelled => {
                self.state.send_replace(DiscoveryState::Abandoned);
            }
        }
    }

    /// Wait for discovery to finish and return the widget root.
    async fn wait_until_found(&self) -> Result<NodeRef, TransportError> {
        let mut rx = self.state.subscribe();
        let state = *rx
            .wait_for(|s| *s != DiscoveryState::Pending)
            .await
            .map_err(|_| TransportError::WidgetUnavailable("bridge shut down".into()))?;

        if state == DiscoveryState::Abandoned {
            return Err(TransportError::WidgetUnavailable(
                "widget was not found on the page".into(),
            ));
        }
        self.lock()
            .root
            .clone()
            .ok_or_else(|| TransportError::WidgetUnavailable("widget root missing".into()))
    }

    /// Open the widget once; concurrent callers all wait for it to settle.
    /// Also retries attaching the observer, since the message list may be
    /// rendered late or replaced.
    async fn open(self: &Arc<Self>) -> Result<NodeRef, TransportError> {
        let root = self.wait_until_found().await?;
        self.opened.get_or_init(|| self.open_widget(&root)).await;
        self.ensure_observer(&root).await;
        Ok(root)
    }

    async fn open_widget(&self, root: &NodeRef) {
        let opened = match self.selectors.open_strategy {
            OpenStrategy::ClickTrigger => {
                let trigger = self.lock().trigger.clone();
                match trigger {
                    Some(trigger) => self.dom.click(&trigger).await,
                    None => Ok(()),
                }
            }
            OpenStrategy::RevealContainer => {
                match resolve(self.dom.as_ref(), root, &self.selectors.container).await {
                    Ok(Some(container)) => {
                        self.dom
                            .apply_style(&container, &[("display", "flex"), ("visibility", "visible")])
                            .await
                    }
                    Ok(None) => {
                        tracing::warn!("Widget message list not found, cannot reveal it");
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
        };
        if let Err(e) = opened {
            tracing::warn!(error = %e, "Opening the widget failed");
        }

        // The widget opens on its own schedule and does not say when it is done
        tokio::time::sleep(self.timing.open_settle).await;
    }

    async fn ensure_observer(self: &Arc<Self>, root: &NodeRef) {
        let _attaching = self.attaching.lock().await;
        if self.lock().observing {
            return;
        }

        let container = match resolve(self.dom.as_ref(), root, &self.selectors.container).await {
            Ok(Some(container)) => container,
            Ok(None) => {
                tracing::debug!("Widget message list not rendered yet");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Looking up the widget message list failed");
                return;
            }
        };

        let initial = match self.dom.child_count(&container).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "Reading the widget message list failed");
                return;
            }
        };
        let batches = match self.dom.observe_children(&container).await {
            Ok(batches) => batches,
            Err(e) => {
                tracing::warn!(error = %e, "Observing the widget message list failed");
                return;
            }
        };

        // Before the first send everything already listed is history. After
        // it, a list that only now appeared may already hold the reply.
        let catch_up = {
            let mut inner = self.lock();
            if inner.observing {
                return;
            }
            inner.observing = true;
            if inner.sent {
                Some(MutationBatch {
                    child_count: initial,
                })
            } else {
                inner.cursor.advance(initial);
                None
            }
        };
        tracing::debug!(container = %container, initial, "Observing widget messages");
        tokio::spawn(Self::observe(self.clone(), container, batches, catch_up));
    }

    async fn observe(
        self: Arc<Self>,
        container: NodeRef,
        mut batches: mpsc::Receiver<MutationBatch>,
        catch_up: Option<MutationBatch>,
    ) {
        if let Some(batch) = catch_up {
            if let Err(e) = self.absorb(&container, batch).await {
                tracing::warn!(error = %e, "Widget message list went away");
                self.lock().observing = false;
                return;
            }
        }

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                batch = batches.recv() => match batch {
                    Some(batch) => {
                        if let Err(e) = self.absorb(&container, batch).await {
                            tracing::warn!(error = %e, "Widget message list went away");
                            break;
                        }
                    }
                    None => {
                        tracing::warn!("Widget message list stopped reporting changes");
                        break;
                    }
                }
            }
        }
        self.lock().observing = false;
    }

    /// Forward every assistant message the batch added, once.
    async fn absorb(&self, container: &NodeRef, batch: MutationBatch) -> Result<(), DomError> {
        let fresh = self.lock().cursor.advance(batch.child_count);
        if fresh.is_empty() {
            return Ok(());
        }

        let children = self.dom.children(container, fresh.start).await?;
        let sink = self.lock().sink.clone();

        for element in children.into_iter().take(fresh.len()) {
            if classify(&element, &self.selectors.user_markers) == Author::User {
                continue;
            }
            let text = element.text.trim();
            if text.is_empty() {
                continue;
            }
            match &sink {
                Some(sink) => {
                    if sink.send(text.to_string()).is_err() {
                        tracing::debug!("Reply sink closed, dropping widget message");
                    }
                }
                None => tracing::debug!("No reply sink registered, dropping widget message"),
            }
        }
        Ok(())
    }

    async fn type_and_send(&self, root: &NodeRef, utterance: &str) -> Result<(), String> {
        let dom = self.dom.as_ref();

        let input = resolve(dom, root, &self.selectors.input)
            .await
            .map_err(|e| e.to_string())?
            .ok_or("input not found")?;
        dom.set_native_value(&input, utterance)
            .await
            .map_err(|e| e.to_string())?;
        dom.dispatch_input(&input).await.map_err(|e| e.to_string())?;

        // Let the widget react to the input event before pressing send
        tokio::time::sleep(self.timing.input_settle).await;

        let send = resolve(dom, root, &self.selectors.send)
            .await
            .map_err(|e| e.to_string())?
            .ok_or("send control not found")?;
        dom.click(&send).await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl ChatBackend for WidgetBridge {
    fn name(&self) -> &'static str {
        "widget"
    }

    async fn open(&self) -> Result<(), TransportError> {
        self.shared.open().await.map(|_| ())
    }

    async fn send(
        &self,
        utterance: &str,
        _prior: &[ConversationTurn],
    ) -> Result<Delivery, TransportError> {
        // The widget keeps its own history; only the new utterance is typed
        let root = self.shared.open().await?;
        self.shared.lock().sent = true;

        if let Err(reason) = self.shared.type_and_send(&root, utterance).await {
            tracing::warn!(reason = %reason, "Could not operate the chat widget");
        }
        // Some widgets only render the message list once the first message is out
        self.shared.ensure_observer(&root).await;
        Ok(Delivery::Pending)
    }

    fn on_reply(&self, sink: ReplySink) {
        self.shared.lock().sink = Some(sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(text: &str, classes: &[&str], attributes: &[(&str, &str)]) -> ElementSnapshot {
        ElementSnapshot {
            text: text.to_string(),
            classes: classes.iter().map(|c| (*c).to_string()).collect(),
            attributes: attributes
                .iter()
                .map(|(n, v)| ((*n).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_classify_by_class_and_attribute() {
        let markers = UserMarkers::default();
        assert_eq!(
            classify(&snapshot("hi", &["message", "user"], &[]), &markers),
            Author::User
        );
        assert_eq!(
            classify(&snapshot("hi", &["message"], &[("data-role", "USER")]), &markers),
            Author::User
        );
        assert_eq!(
            classify(&snapshot("Hello!", &["message", "bot"], &[("data-role", "bot")]), &markers),
            Author::Assistant
        );
        assert_eq!(classify(&snapshot("", &[], &[]), &markers), Author::Assistant);
    }

    #[test]
    fn test_cursor_only_moves_forward() {
        let mut cursor = MessageCursor::new(2);
        assert_eq!(cursor.advance(5), 2..5);
        assert_eq!(cursor.advance(5), 5..5);
        assert_eq!(cursor.advance(3), 5..5);
        assert_eq!(cursor.seen(), 5);
        assert_eq!(cursor.advance(6), 5..6);
    }
}
