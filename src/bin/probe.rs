//! Drive a conversation through the site's chat popup from the command line
//!
//! In widget mode a headless browser loads the page, the bridge finds the
//! embedded chat widget and every question goes through it. In direct mode
//! questions go straight to the chat endpoint.

use academy_concierge::session::{Channel, SessionConfig, SessionHandle, SessionRuntime, TracingSurface};
use academy_concierge::transcript::Role;
use academy_concierge::transport::{ChatBackend, DirectChatBackend};
use academy_concierge::widget::{
    BridgeTiming, DiscoveryConfig, PageSession, WidgetBridge, WidgetSelectors,
};
use clap::{ArgAction, Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Through the embedded third-party widget
    Widget,
    /// Straight to the chat endpoint
    Direct,
}

#[derive(Debug, Parser)]
#[command(about = "Ask the site assistant questions and print the transcript", author, version)]
struct ProbeArgs {
    /// Page embedding the chat widget
    #[arg(long, env = "CONCIERGE_PAGE_URL", default_value = "http://localhost:3000/")]
    url: String,

    /// Question to ask; repeat for a multi-turn conversation
    #[arg(long = "question", short = 'q', action = ArgAction::Append, value_name = "TEXT", required = true)]
    questions: Vec<String>,

    #[arg(long, value_enum, default_value_t = Mode::Widget)]
    mode: Mode,

    /// Chat endpoint used in direct mode
    #[arg(
        long = "chat-endpoint",
        env = "CONCIERGE_CHAT_ENDPOINT",
        default_value = "http://localhost:3000/api/chat"
    )]
    chat_endpoint: String,

    /// Chrome executable (system Chrome or a downloaded Chromium otherwise)
    #[arg(long, env = "CHROME_PATH")]
    chrome: Option<PathBuf>,

    /// JSON file overriding the widget selectors
    #[arg(long, value_name = "FILE")]
    selectors: Option<PathBuf>,

    /// How long to wait for each answer
    #[arg(long = "reply-wait-secs", default_value_t = 45)]
    reply_wait_secs: u64,
}

fn load_selectors(path: Option<&Path>) -> Result<WidgetSelectors, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(WidgetSelectors::default());
    };
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Wait until the typing indicator goes away or `budget` runs out.
async fn wait_for_answer(handle: &SessionHandle, budget: Duration) -> Result<bool, Box<dyn std::error::Error>> {
    let deadline = tokio::time::Instant::now() + budget;
    while tokio::time::Instant::now() < deadline {
        tokio::time::sleep(POLL_INTERVAL).await;
        if !handle.snapshot().await?.typing {
            return Ok(true);
        }
    }
    Ok(false)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "academy_concierge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = ProbeArgs::parse();

    let mut page = None;
    let backend: Arc<dyn ChatBackend> = match args.mode {
        Mode::Direct => Arc::new(DirectChatBackend::new(args.chat_endpoint.clone())),
        Mode::Widget => {
            let selectors = load_selectors(args.selectors.as_deref())?;
            let session = PageSession::launch(args.chrome.as_deref()).await?;
            session.navigate(&args.url).await?;
            tracing::info!(url = %args.url, "Page loaded");

            let bridge = WidgetBridge::spawn(
                Arc::new(session.dom()),
                selectors,
                DiscoveryConfig::default(),
                BridgeTiming::default(),
            );
            page = Some(session);
            Arc::new(bridge)
        }
    };

    let (runtime, handle) = SessionRuntime::new(SessionConfig::default(), backend, TracingSurface);
    let session_task = tokio::spawn(runtime.run());

    handle.open_popup().await?;
    handle.select_channel(Channel::Chat).await?;

    let budget = Duration::from_secs(args.reply_wait_secs);
    for question in &args.questions {
        handle.submit_user_message(question.as_str()).await?;
        if !wait_for_answer(&handle, budget).await? {
            tracing::warn!(question = %question, "No answer within the wait budget");
        }
    }

    let snapshot = handle.snapshot().await?;
    for turn in &snapshot.transcript {
        let who = match turn.role {
            Role::User => "you",
            Role::Assistant => "sarah",
        };
        println!("{who}: {}", turn.text);
    }

    drop(handle);
    if let Err(e) = session_task.await {
        tracing::warn!(error = %e, "Session task ended abnormally");
    }
    if let Some(page) = page {
        page.close().await;
    }
    Ok(())
}
