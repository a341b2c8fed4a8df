//! Locating the widget's isolated subtree

use super::selectors::resolve;
use super::{NodeRef, WidgetDom, WidgetSelectors};
use std::time::Duration;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub poll_interval: Duration,
    /// Discovery is abandoned after this long
    pub timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

/// How a discovery run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// The shadow host whose subtree contains the widget trigger
    Found { host: NodeRef, trigger: NodeRef },
    TimedOut,
    Cancelled,
}

/// Poll the page until a shadow host containing the widget trigger shows up.
///
/// The first poll happens immediately. Page errors during a poll are logged
/// and the next poll proceeds; only the deadline or `cancel` stop the run.
pub async fn discover(
    dom: &dyn WidgetDom,
    selectors: &WidgetSelectors,
    config: DiscoveryConfig,
    cancel: CancellationToken,
) -> DiscoveryOutcome {
    let deadline = Instant::now() + config.timeout;
    let mut ticker = interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut polls = 0u32;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(polls, "Widget discovery cancelled");
                return DiscoveryOutcome::Cancelled;
            }
            () = sleep_until(deadline) => {
                tracing::warn!(
                    polls,
                    timeout_ms = %config.timeout.as_millis(),
                    "Chat widget not found, giving up"
                );
                return DiscoveryOutcome::TimedOut;
            }
            _ = ticker.tick() => {
                polls += 1;
                if let Some((host, trigger)) = poll_once(dom, selectors).await {
                    tracing::info!(polls, host = %host, "Chat widget found");
                    return DiscoveryOutcome::Found { host, trigger };
                }
            }
        }
    }
}

async fn poll_once(dom: &dyn WidgetDom, selectors: &WidgetSelectors) -> Option<(NodeRef, NodeRef)> {
    let hosts = match dom.shadow_hosts().await {
        Ok(hosts) => hosts,
        Err(e) => {
            tracing::debug!(error = %e, "Listing shadow hosts failed");
            return None;
        }
    };

    for host in hosts {
        match resolve(dom, &host, &selectors.trigger).await {
            Ok(Some(trigger)) => return Some((host, trigger)),
            Ok(None) => {}
            Err(e) => tracing::debug!(host = %host, error = %e, "Probing shadow host failed"),
        }
    }
    None
}
