//! What the bridge assumes about the widget's markup
//!
//! None of this is a documented contract. Every control is looked up through
//! a fallback chain, tried in order, so the bridge degrades instead of
//! breaking when the widget renames something.

use super::{DomError, NodeRef, WidgetDom};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WidgetSelectors {
    /// The widget's floating action button
    pub trigger: Vec<String>,
    /// The message list container
    pub container: Vec<String>,
    /// The text input
    pub input: Vec<String>,
    /// The send control
    pub send: Vec<String>,
    pub user_markers: UserMarkers,
    pub open_strategy: OpenStrategy,
    pub suppress_style: SuppressStyle,
}

impl Default for WidgetSelectors {
    fn default() -> Self {
        Self {
            trigger: strings(&["#chat-fab", "#fab", "[data-testid=\"chat-fab\"]"]),
            container: strings(&["#chat-messages", "#messages", ".chat-messages"]),
            input: strings(&["#chat-input", "textarea", "input[type=\"text\"]"]),
            send: strings(&["#send-button", "button[type=\"submit\"]", ".send-button"]),
            user_markers: UserMarkers::default(),
            open_strategy: OpenStrategy::default(),
            suppress_style: SuppressStyle::default(),
        }
    }
}

/// How a message-list child is recognised as the visitor's own message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UserMarkers {
    pub classes: Vec<String>,
    /// `(attribute, value)` pairs
    pub attributes: Vec<(String, String)>,
}

impl Default for UserMarkers {
    fn default() -> Self {
        Self {
            classes: strings(&["user", "user-message", "message-user", "outgoing"]),
            attributes: vec![
                ("data-role".to_string(), "user".to_string()),
                ("data-sender".to_string(), "user".to_string()),
                ("data-author".to_string(), "user".to_string()),
            ],
        }
    }
}

/// How the widget is brought up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenStrategy {
    /// Click the widget's own trigger and let it open itself
    #[default]
    ClickTrigger,
    /// Make the message container visible directly
    RevealContainer,
}

/// How the widget's own floating button is kept out of sight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressStyle {
    /// Zero size and opacity, no pointer events
    #[default]
    Collapse,
    /// Moved outside the viewport
    Offscreen,
}

impl SuppressStyle {
    /// Inline declarations applied to the trigger. The element stays in the
    /// DOM so its click handler can still be invoked programmatically.
    pub fn declarations(self) -> &'static [(&'static str, &'static str)] {
        match self {
            SuppressStyle::Collapse => &[
                ("opacity", "0"),
                ("width", "0"),
                ("height", "0"),
                ("overflow", "hidden"),
                ("pointer-events", "none"),
            ],
            SuppressStyle::Offscreen => &[
                ("position", "fixed"),
                ("left", "-10000px"),
                ("top", "-10000px"),
            ],
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| (*s).to_string()).collect()
}

/// First node under `root` matched by any selector in `chain`, in chain
/// order. Lookup errors on one selector do not stop the next one.
pub(crate) async fn resolve(
    dom: &dyn WidgetDom,
    root: &NodeRef,
    chain: &[String],
) -> Result<Option<NodeRef>, DomError> {
    let mut last_error = None;
    for selector in chain {
        match dom.query(root, selector).await {
            Ok(Some(node)) => return Ok(Some(node)),
            Ok(None) => {}
            Err(DomError::Detached(node)) => return Err(DomError::Detached(node)),
            Err(e) => {
                tracing::debug!(selector = %selector, error = %e, "Selector lookup failed");
                last_error = Some(e);
            }
        }
    }
    match last_error {
        Some(e) => Err(e),
        None => Ok(None),
    }
}
