//! [`WidgetDom`] over a real browser page, via the DevTools protocol

use super::{DomError, ElementSnapshot, MutationBatch, NodeRef, WidgetDom};
use async_trait::async_trait;
use chromiumoxide::{
    browser::{Browser, BrowserConfig},
    fetcher::{BrowserFetcher, BrowserFetcherOptions},
    Page,
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;
const DEFAULT_VIEWPORT_HEIGHT: u32 = 720;

/// How often mutation counters installed in the page are read back
const OBSERVE_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Browser operation failed: {0}")]
    OperationFailed(String),
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        BrowserError::OperationFailed(e.to_string())
    }
}

/// Node registry shared by every script. Elements handed to Rust get a
/// stable id; lookups of nodes that left the document yield null and drop
/// the entry, and registering a new node sweeps out any other detached ones.
const PRELUDE: &str = r"
const R = (window.__conciergeRefs = window.__conciergeRefs || { next: 0, nodes: new Map(), seq: new Map() });
const forget = (id) => { R.nodes.delete(id); R.seq.delete(id); };
const sweep = () => { for (const [id, n] of R.nodes) { if (!n.isConnected) forget(id); } };
const put = (n) => {
  if (!n.__conciergeRef) { sweep(); n.__conciergeRef = 'n' + (++R.next); }
  if (!R.nodes.has(n.__conciergeRef)) R.nodes.set(n.__conciergeRef, n);
  return n.__conciergeRef;
};
const get = (id) => {
  const n = R.nodes.get(id);
  if (n && n.isConnected) return n;
  forget(id);
  return null;
};
const scope = (n) => n.shadowRoot || n;
";

/// Quote `s` as a JS string literal
fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

fn page_script(body: &str) -> String {
    format!("(() => {{ {PRELUDE} {body} }})()")
}

/// Script run against one registered node; yields `{detached: true}` when
/// the node is gone.
fn node_script(node: &NodeRef, body: &str) -> String {
    page_script(&format!(
        "const el = get({}); if (!el) return {{ detached: true }}; {body}",
        js_str(&node.0)
    ))
}

#[derive(Debug, Deserialize)]
struct ChildItem {
    text: String,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct ObserveState {
    seq: u64,
    count: usize,
}

/// Page access for the widget bridge
#[derive(Clone)]
pub struct CdpDom {
    page: Page,
    observe_interval: Duration,
}

impl CdpDom {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            observe_interval: OBSERVE_INTERVAL,
        }
    }

    async fn eval(&self, script: String) -> Result<Value, DomError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| DomError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn on_node(&self, node: &NodeRef, body: &str) -> Result<Value, DomError> {
        let value = self.eval(node_script(node, body)).await?;
        if value.get("detached").and_then(Value::as_bool) == Some(true) {
            return Err(DomError::Detached(node.clone()));
        }
        Ok(value)
    }

    async fn observe_state(&self, node: &NodeRef) -> Result<ObserveState, DomError> {
        let value = self
            .on_node(
                node,
                "return { seq: R.seq.get(el.__conciergeRef) || 0, count: el.children.length };",
            )
            .await?;
        decode(value)
    }
}

fn decode<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T, DomError> {
    serde_json::from_value(value).map_err(|e| DomError::Script(format!("Unexpected result: {e}")))
}

#[async_trait]
impl WidgetDom for CdpDom {
    async fn shadow_hosts(&self) -> Result<Vec<NodeRef>, DomError> {
        let value = self
            .eval(page_script(
                "return Array.from(document.body ? document.body.children : [])
                    .filter((n) => n.shadowRoot).map(put);",
            ))
            .await?;
        let ids: Vec<String> = decode(value)?;
        Ok(ids.into_iter().map(NodeRef).collect())
    }

    async fn query(&self, root: &NodeRef, selector: &str) -> Result<Option<NodeRef>, DomError> {
        let body = format!(
            "const m = scope(el).querySelector({}); return {{ node: m ? put(m) : null }};",
            js_str(selector)
        );
        let value = self.on_node(root, &body).await?;
        Ok(value
            .get("node")
            .and_then(Value::as_str)
            .map(|id| NodeRef(id.to_string())))
    }

    async fn apply_style(
        &self,
        node: &NodeRef,
        declarations: &[(&str, &str)],
    ) -> Result<(), DomError> {
        let pairs = serde_json::to_string(declarations)
            .map_err(|e| DomError::Script(e.to_string()))?;
        let body = format!(
            "for (const [k, v] of {pairs}) el.style.setProperty(k, v, 'important'); return {{}};"
        );
        self.on_node(node, &body).await.map(|_| ())
    }

    async fn click(&self, node: &NodeRef) -> Result<(), DomError> {
        self.on_node(node, "el.click(); return {};").await.map(|_| ())
    }

    async fn set_native_value(&self, node: &NodeRef, value: &str) -> Result<(), DomError> {
        let body = format!(
            "const proto = el instanceof HTMLTextAreaElement
                ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
             Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, {});
             return {{}};",
            js_str(value)
        );
        self.on_node(node, &body).await.map(|_| ())
    }

    async fn dispatch_input(&self, node: &NodeRef) -> Result<(), DomError> {
        self.on_node(
            node,
            "el.dispatchEvent(new Event('input', { bubbles: true, composed: true })); return {};",
        )
        .await
        .map(|_| ())
    }

    async fn child_count(&self, node: &NodeRef) -> Result<usize, DomError> {
        let value = self
            .on_node(node, "return { count: el.children.length };")
            .await?;
        value
            .get("count")
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| DomError::Script("child count missing".into()))
    }

    async fn children(&self, node: &NodeRef, from: usize) -> Result<Vec<ElementSnapshot>, DomError> {
        let body = format!(
            "return {{ items: Array.from(el.children).slice({from}).map((c) => ({{
                text: c.innerText || c.textContent || '',
                classes: Array.from(c.classList),
                attributes: Array.from(c.attributes).map((a) => [a.name, a.value]),
            }})) }};"
        );
        let mut value = self.on_node(node, &body).await?;
        let items: Vec<ChildItem> = decode(value["items"].take())?;
        Ok(items
            .into_iter()
            .map(|i| ElementSnapshot {
                text: i.text,
                classes: i.classes,
                attributes: i.attributes,
            })
            .collect())
    }

    async fn observe_children(
        &self,
        node: &NodeRef,
    ) -> Result<mpsc::Receiver<MutationBatch>, DomError> {
        self.on_node(
            node,
            "if (!el.__conciergeObserved) {
                el.__conciergeObserved = true;
                const id = el.__conciergeRef;
                R.seq.set(id, 0);
                new MutationObserver(() => R.seq.set(id, (R.seq.get(id) || 0) + 1))
                    .observe(el, { childList: true });
             }
             return {};",
        )
        .await?;

        let mut last_seq = self.observe_state(node).await?.seq;
        let (tx, rx) = mpsc::channel(16);
        let dom = self.clone();
        let node = node.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(dom.observe_interval);
            loop {
                ticker.tick().await;
                let state = match dom.observe_state(&node).await {
                    Ok(state) => state,
                    Err(e) => {
                        tracing::debug!(node = %node, error = %e, "Stopped observing node");
                        break;
                    }
                };
                if state.seq == last_seq {
                    continue;
                }
                last_seq = state.seq;
                let batch = MutationBatch {
                    child_count: state.count,
                };
                if tx.send(batch).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }
}

/// A headless browser holding one page
pub struct PageSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Page,
}

impl PageSession {
    /// Launch a browser. Uses `executable` when given, otherwise tries the
    /// system Chrome and falls back to a downloaded Chromium.
    pub async fn launch(executable: Option<&Path>) -> Result<Self, BrowserError> {
        if let Some(path) = executable {
            return Self::launch_with(Some(path)).await;
        }

        match Self::launch_with(None).await {
            Ok(session) => return Ok(session),
            Err(e) => tracing::info!("System Chrome not available ({e}), trying fetcher..."),
        }

        let cache_dir = fetcher_cache_dir();
        tracing::info!("Downloading Chrome to {cache_dir:?} (first run only)...");
        std::fs::create_dir_all(&cache_dir).map_err(|e| {
            BrowserError::LaunchFailed(format!(
                "Failed to create cache dir {}: {e}",
                cache_dir.display()
            ))
        })?;

        let fetcher_opts = BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .map_err(|e| BrowserError::LaunchFailed(format!("Fetcher config error: {e}")))?;
        let info = BrowserFetcher::new(fetcher_opts)
            .fetch()
            .await
            .map_err(|e| BrowserError::LaunchFailed(format!("Chrome download failed: {e:#}")))?;

        tracing::info!("Using Chrome at {:?}", info.executable_path);
        Self::launch_with(Some(&info.executable_path)).await
    }

    async fn launch_with(executable: Option<&Path>) -> Result<Self, BrowserError> {
        let user_data_dir =
            std::env::temp_dir().join(format!("concierge-chrome-{}", uuid::Uuid::new_v4()));

        let mut builder = BrowserConfig::builder()
            .new_headless_mode()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-software-rasterizer")
            .user_data_dir(&user_data_dir)
            .viewport(chromiumoxide::handler::viewport::Viewport {
                width: DEFAULT_VIEWPORT_WIDTH,
                height: DEFAULT_VIEWPORT_HEIGHT,
                device_scale_factor: Some(1.0),
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            });
        if let Some(path) = executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(BrowserError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!("CDP handler error: {e}");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        Ok(Self {
            browser,
            handler_task,
            page,
        })
    }

    /// Load `url` and wait for the navigation to settle
    pub async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;
        Ok(())
    }

    pub fn dom(&self) -> CdpDom {
        CdpDom::new(self.page.clone())
    }

    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("Browser close failed: {e}");
        }
        self.handler_task.abort();
    }
}

fn fetcher_cache_dir() -> PathBuf {
    let base = std::env::var("HOME").map_or_else(|_| PathBuf::from("/tmp"), PathBuf::from);
    base.join(".cache/academy-concierge/chromium")
}
