//! In-memory widget subtree for bridge tests

use super::{DomError, ElementSnapshot, MutationBatch, NodeRef, WidgetDom};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Canned reply the fake widget renders when its send control is clicked
#[derive(Debug, Clone)]
pub(crate) struct AutoReply {
    pub send: NodeRef,
    pub container: NodeRef,
    pub input: NodeRef,
    pub text: String,
}

#[derive(Default)]
pub(crate) struct FakeState {
    pub hosts: Vec<NodeRef>,
    /// `(root, selector)` to node
    pub matches: HashMap<(String, String), NodeRef>,
    pub styles: Vec<(NodeRef, Vec<(String, String)>)>,
    pub values: HashMap<String, String>,
    /// Every mutating call in order, e.g. `click:fab`
    pub log: Vec<String>,
    pub children: HashMap<String, Vec<ElementSnapshot>>,
    pub observers: HashMap<String, mpsc::Sender<MutationBatch>>,
    pub auto_reply: Option<AutoReply>,
    /// Matches that only exist once the send control has been clicked
    pub after_send: Vec<((String, String), NodeRef)>,
    pub host_polls: usize,
}

#[derive(Default)]
pub(crate) struct FakeDom {
    state: Mutex<FakeState>,
}

pub(crate) fn node(id: &str) -> NodeRef {
    NodeRef(id.to_string())
}

pub(crate) fn message(text: &str, classes: &[&str]) -> ElementSnapshot {
    ElementSnapshot {
        text: text.to_string(),
        classes: classes.iter().map(|c| (*c).to_string()).collect(),
        attributes: Vec::new(),
    }
}

impl FakeDom {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn add_host(&self, host: &str) {
        self.state().hosts.push(node(host));
    }

    pub fn add_match(&self, root: &str, selector: &str, target: &str) {
        self.state()
            .matches
            .insert((root.to_string(), selector.to_string()), node(target));
    }

    /// Append a child to `container` and notify its observer
    pub fn push_child(&self, container: &str, child: ElementSnapshot) {
        let mut state = self.state();
        state.children.entry(container.to_string()).or_default().push(child);
        Self::notify_locked(&state, container);
    }

    /// Report a mutation without changing anything
    pub fn notify(&self, container: &str) {
        let state = self.state();
        Self::notify_locked(&state, container);
    }

    fn notify_locked(state: &FakeState, container: &str) {
        let count = state.children.get(container).map_or(0, Vec::len);
        if let Some(tx) = state.observers.get(container) {
            let _ = tx.try_send(MutationBatch { child_count: count });
        }
    }

    /// A typical widget: one shadow host with trigger, container, input
    /// and send control under their primary selectors.
    pub fn standard_widget() -> Arc<Self> {
        let dom = Self::new();
        dom.add_host("host");
        dom.add_match("host", "#chat-fab", "fab");
        dom.add_match("host", "#chat-messages", "messages");
        dom.add_match("host", "#chat-input", "input");
        dom.add_match("host", "#send-button", "send");
        dom
    }

    /// Make `selector` under `root` resolve only after the first send
    pub fn reveal_on_send(&self, root: &str, selector: &str, target: &str) {
        self.state()
            .after_send
            .push(((root.to_string(), selector.to_string()), node(target)));
    }

    pub fn reply_with(&self, text: &str) {
        self.state().auto_reply = Some(AutoReply {
            send: node("send"),
            container: node("messages"),
            input: node("input"),
            text: text.to_string(),
        });
    }
}

#[async_trait]
impl WidgetDom for FakeDom {
    async fn shadow_hosts(&self) -> Result<Vec<NodeRef>, DomError> {
        let mut state = self.state();
        state.host_polls += 1;
        Ok(state.hosts.clone())
    }

    async fn query(&self, root: &NodeRef, selector: &str) -> Result<Option<NodeRef>, DomError> {
        Ok(self
            .state()
            .matches
            .get(&(root.0.clone(), selector.to_string()))
            .cloned())
    }

    async fn apply_style(
        &self,
        node: &NodeRef,
        declarations: &[(&str, &str)],
    ) -> Result<(), DomError> {
        let mut state = self.state();
        state.log.push(format!("style:{node}"));
        state.styles.push((
            node.clone(),
            declarations
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        ));
        Ok(())
    }

    async fn click(&self, target: &NodeRef) -> Result<(), DomError> {
        let mut state = self.state();
        state.log.push(format!("click:{target}"));

        if target.0 == "send" {
            let revealed = std::mem::take(&mut state.after_send);
            state.matches.extend(revealed);
        }

        let Some(reply) = state.auto_reply.clone() else {
            return Ok(());
        };
        if reply.send != *target {
            return Ok(());
        }
        let typed = state.values.get(&reply.input.0).cloned().unwrap_or_default();
        let children = state.children.entry(reply.container.0.clone()).or_default();
        children.push(message(&typed, &["message", "user"]));
        children.push(message(&reply.text, &["message", "bot"]));
        Self::notify_locked(&state, &reply.container.0);
        Ok(())
    }

    async fn set_native_value(&self, target: &NodeRef, value: &str) -> Result<(), DomError> {
        let mut state = self.state();
        state.log.push(format!("value:{target}={value}"));
        state.values.insert(target.0.clone(), value.to_string());
        Ok(())
    }

    async fn dispatch_input(&self, target: &NodeRef) -> Result<(), DomError> {
        self.state().log.push(format!("input:{target}"));
        Ok(())
    }

    async fn child_count(&self, target: &NodeRef) -> Result<usize, DomError> {
        Ok(self.state().children.get(&target.0).map_or(0, Vec::len))
    }

    async fn children(
        &self,
        target: &NodeRef,
        from: usize,
    ) -> Result<Vec<ElementSnapshot>, DomError> {
        Ok(self
            .state()
            .children
            .get(&target.0)
            .map(|c| c.iter().skip(from).cloned().collect())
            .unwrap_or_default())
    }

    async fn observe_children(
        &self,
        target: &NodeRef,
    ) -> Result<mpsc::Receiver<MutationBatch>, DomError> {
        let (tx, rx) = mpsc::channel(16);
        self.state().observers.insert(target.0.clone(), tx);
        Ok(rx)
    }
}
