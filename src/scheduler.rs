//! Reminder and deferred-task scheduler
//!
//! Owns the table of pending actions. Each armed action is backed by one
//! spawned timer task; cancelling evicts the entry and aborts the task.
//! An action fires exactly once: the timer callback evicts its entry from
//! the table before any risky work, so a concurrent cancel for the same id
//! reports "not found" instead of racing the in-flight action.
//!
//! The table lock is held only for table access — never across a provider
//! call or audio playback — so a long-running task blocks neither
//! scheduling nor cancellation of unrelated actions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::agent::Agent;
use crate::prompt::TASK_SYSTEM_PROMPT;
use crate::speaker::SpeechOutput;
use crate::tools::SCHEDULING_TOOLS;

/// Delay floor: zero or negative requests arm a one-second timer
const MIN_DELAY_SECS: f64 = 1.0;

/// Delay ceiling (ten years) so absurd numeric arguments stay finite
const MAX_DELAY_SECS: f64 = 315_360_000.0;

/// What a pending action does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Speak a fixed message
    Reminder,
    /// Run a full agent invocation and speak its result
    Task,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reminder => write!(f, "reminder"),
            Self::Task => write!(f, "task"),
        }
    }
}

/// An armed action awaiting its timer
struct PendingAction {
    topic: String,
    kind: ActionKind,
    timer: JoinHandle<()>,
}

/// Pending-action table plus the process-lifetime id counter
struct Table {
    next_id: u64,
    actions: BTreeMap<u64, PendingAction>,
}

/// Schedules deferred reminders and tasks, firing each exactly once
pub struct ReminderScheduler {
    table: Mutex<Table>,
    speech: Arc<dyn SpeechOutput>,
    /// Late-bound: the agent's registry contains the scheduling tools,
    /// which in turn hold this scheduler
    agent: OnceLock<Arc<Agent>>,
    /// Handed to timer tasks; upgraded at fire time
    weak_self: Weak<Self>,
}

impl ReminderScheduler {
    /// Create a scheduler speaking through the given output
    #[must_use]
    pub fn new(speech: Arc<dyn SpeechOutput>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            table: Mutex::new(Table {
                next_id: 1,
                actions: BTreeMap::new(),
            }),
            speech,
            agent: OnceLock::new(),
            weak_self: weak.clone(),
        })
    }

    /// Bind the agent used by firing tasks; later calls are ignored
    pub fn bind_agent(&self, agent: Arc<Agent>) {
        let _ = self.agent.set(agent);
    }

    /// Arm a spoken reminder after the given delay
    ///
    /// Returns an immediate acknowledgement; never blocks on the delay.
    pub fn schedule_reminder(&self, topic: &str, minutes: f64, seconds: f64) -> String {
        let delay = clamp_delay(minutes, seconds);

        let mut table = self.table.lock().unwrap();
        let id = table.next_id;
        table.next_id += 1;

        let weak = self.weak_self.clone();
        let fire_topic = topic.to_string();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
            if let Some(scheduler) = weak.upgrade() {
                scheduler.fire_reminder(id, &fire_topic).await;
            }
        });

        table.actions.insert(
            id,
            PendingAction {
                topic: topic.to_string(),
                kind: ActionKind::Reminder,
                timer,
            },
        );
        drop(table);

        tracing::info!(id, delay = %format_delay(delay), topic, "reminder armed");
        "Done.".to_string()
    }

    /// Arm a deferred agent task after the given delay
    ///
    /// The topic defaults to the first forty characters of the prompt.
    pub fn schedule_task(
        &self,
        prompt: &str,
        topic: Option<String>,
        minutes: f64,
        seconds: f64,
    ) -> String {
        let delay = clamp_delay(minutes, seconds);
        let topic = topic
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| prompt.chars().take(40).collect());

        let mut table = self.table.lock().unwrap();
        let id = table.next_id;
        table.next_id += 1;

        let weak = self.weak_self.clone();
        let fire_topic = topic.clone();
        let fire_prompt = prompt.to_string();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
            if let Some(scheduler) = weak.upgrade() {
                scheduler.fire_task(id, &fire_topic, &fire_prompt).await;
            }
        });

        table.actions.insert(
            id,
            PendingAction {
                topic: topic.clone(),
                kind: ActionKind::Task,
                timer,
            },
        );
        drop(table);

        tracing::info!(id, delay = %format_delay(delay), topic, "task armed");
        "Done.".to_string()
    }

    /// Deterministic snapshot of pending actions, one line per action in
    /// insertion order
    #[must_use]
    pub fn list(&self) -> String {
        let table = self.table.lock().unwrap();
        if table.actions.is_empty() {
            return "No active reminders.".to_string();
        }
        table
            .actions
            .iter()
            .map(|(id, action)| format!("#{id}: {} ({})", action.topic, action.kind))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Cancel pending actions
    ///
    /// With `cancel_all` set, or with no keyword given, every pending action
    /// is cancelled. Otherwise an action is cancelled when any
    /// whitespace-delimited token of the keyword appears in its topic
    /// (case-insensitive).
    pub fn cancel(&self, cancel_all: bool, keyword: Option<&str>) -> String {
        let keyword = keyword.filter(|k| !k.trim().is_empty());

        let removed: Vec<(u64, PendingAction)> = {
            let mut table = self.table.lock().unwrap();
            let targets: Vec<u64> = match keyword {
                Some(kw) if !cancel_all => table
                    .actions
                    .iter()
                    .filter(|(_, action)| keyword_matches(kw, &action.topic))
                    .map(|(id, _)| *id)
                    .collect(),
                _ => table.actions.keys().copied().collect(),
            };
            targets
                .into_iter()
                .filter_map(|id| table.actions.remove(&id).map(|action| (id, action)))
                .collect()
        };

        if removed.is_empty() {
            return "No matching reminders found.".to_string();
        }

        let count = removed.len();
        for (id, action) in removed {
            action.timer.abort();
            tracing::info!(id, topic = %action.topic, "cancelled");
        }
        format!("Cancelled {count} reminder(s).")
    }

    /// Number of currently pending actions
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.table.lock().unwrap().actions.len()
    }

    /// Evict the entry as firing begins
    ///
    /// Returns false when the action is already gone — cancelled in the
    /// window between timer expiry and this call — in which case the
    /// payload must not run.
    fn begin_firing(&self, id: u64) -> bool {
        self.table.lock().unwrap().actions.remove(&id).is_some()
    }

    async fn fire_reminder(&self, id: u64, topic: &str) {
        if !self.begin_firing(id) {
            return;
        }

        let message = format!("Hey! {topic}.");
        tracing::info!(id, message = %message, "reminder firing");

        if let Err(e) = self.speech.say(&message).await {
            tracing::warn!(id, error = %e, "reminder playback failed");
        }
    }

    async fn fire_task(&self, id: u64, topic: &str, prompt: &str) {
        if !self.begin_firing(id) {
            return;
        }

        tracing::info!(id, topic, "task firing");
        let Some(agent) = self.agent.get() else {
            tracing::error!(id, "no agent bound, dropping task");
            return;
        };

        // Withhold the scheduling tools so a task cannot fan out further.
        match agent
            .ask_with(prompt, SCHEDULING_TOOLS, Some(TASK_SYSTEM_PROMPT))
            .await
        {
            Ok(response) => {
                tracing::info!(id, response = %response, "task complete");
                if response.is_empty() {
                    return;
                }
                if let Err(e) = self.speech.say(&response).await {
                    tracing::warn!(id, error = %e, "task playback failed");
                }
            }
            Err(e) => tracing::warn!(id, error = %e, "task failed"),
        }
    }
}

/// Combined delay in seconds, floored at one second
fn clamp_delay(minutes: f64, seconds: f64) -> f64 {
    let total = minutes * 60.0 + seconds;
    if total.is_finite() {
        total.clamp(MIN_DELAY_SECS, MAX_DELAY_SECS)
    } else {
        MIN_DELAY_SECS
    }
}

/// Human-readable delay for the log, e.g. "3m 20s"
fn format_delay(delay_secs: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = delay_secs as u64;
    let minutes = total / 60;
    let seconds = total % 60;

    let mut parts = Vec::new();
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}

/// True when any whitespace-delimited token of the keyword appears in the
/// topic, case-insensitive
fn keyword_matches(keyword: &str, topic: &str) -> bool {
    let topic = topic.to_lowercase();
    keyword
        .split_whitespace()
        .any(|word| topic.contains(&word.to_lowercase()))
}
