//! Broadcast demo execution
//!
//! Attaches a number of simulated sessions, broadcasts each message to the
//! opted-in ones and tears everything down again.

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use log::{debug, info, warn};

use crate::notifications::{
    DeliveryStats, DispatcherConfig, NotificationManager, SessionSubscription,
};

/// Where sessions render received notifications
pub type OutputSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Sink printing each rendered notification on stdout
pub fn stdout_sink() -> OutputSink {
    Arc::new(|line: &str| println!("{}", line))
}

/// Everything needed to run one broadcast session
#[derive(Debug, Clone)]
pub struct BroadcastPlan {
    pub sessions: usize,
    /// 1-based session numbers that never opt in
    pub opt_out: Vec<usize>,
    pub colored: bool,
    pub dispatcher: DispatcherConfig,
}

impl BroadcastPlan {
    fn session_name(index: usize) -> String {
        format!("session-{}", index)
    }

    fn opts_in(&self, index: usize) -> bool {
        !self.opt_out.contains(&index)
    }
}

/// Format a notification as shown to the user of `session`
pub fn render_notification(session: &str, message: &str, colored: bool) -> String {
    let label = format!("[{}]", session);
    if colored {
        format!("{} {}", label.cyan().bold(), message)
    } else {
        format!("{} {}", label, message)
    }
}

/// Run the demo: attach sessions, broadcast every message, detach and shut down.
///
/// Blank messages are skipped; every other message is broadcast exactly as
/// read. Returns the final delivery statistics.
pub fn run_broadcast<I>(
    plan: &BroadcastPlan,
    messages: I,
    sink: OutputSink,
) -> Result<DeliveryStats>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    let manager = NotificationManager::with_config(plan.dispatcher.clone())
        .context("Failed to start notification dispatcher")?;

    let sessions: Vec<SessionSubscription> = (1..=plan.sessions)
        .map(|index| {
            let name = BroadcastPlan::session_name(index);
            let sink = Arc::clone(&sink);
            let colored = plan.colored;
            let session_label = name.clone();
            let session = SessionSubscription::new(manager.clone(), name, move |message| {
                sink(&render_notification(&session_label, message, colored));
            });
            session.set_opted_in(plan.opts_in(index));
            session.attach();
            session
        })
        .collect();

    info!(
        "{} of {} sessions subscribed to notifications",
        manager.subscriber_count(),
        sessions.len()
    );

    for message in messages {
        let message = message.context("Failed to read message")?;
        if message.trim().is_empty() {
            continue;
        }
        let scheduled = manager.notify_all(&message);
        debug!("Broadcast '{}' scheduled for {} sessions", message, scheduled);
    }

    manager.flush();
    for session in &sessions {
        session.detach();
    }

    let stats = manager.stats();
    manager.shutdown()?;

    if stats.delivery_failures > 0 {
        warn!("{} deliveries failed", stats.delivery_failures);
    }
    info!(
        "Broadcasts: {} | Delivered: {} | Failed: {}",
        stats.broadcasts, stats.deliveries_succeeded, stats.delivery_failures
    );
    Ok(stats)
}
