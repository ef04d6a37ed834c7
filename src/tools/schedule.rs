//! Scheduling tools
//!
//! Thin typed-argument wrappers over [`ReminderScheduler`]. These four names
//! are withheld from deferred task execution so a task cannot re-schedule.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{Tool, ToolDefinition};
use crate::scheduler::ReminderScheduler;
use crate::Result;

/// The tool names excluded while a deferred task runs
pub const SCHEDULING_TOOLS: &[&str] = &[
    "schedule_reminder",
    "schedule_task",
    "list_reminders",
    "cancel_reminder",
];

fn delay_properties() -> [(&'static str, serde_json::Value); 2] {
    [
        (
            "minutes",
            json!({
                "type": "number",
                "description": "Delay in minutes. Use 0 if specifying seconds instead.",
            }),
        ),
        (
            "seconds",
            json!({
                "type": "number",
                "description": "Additional delay in seconds. Combined with minutes.",
            }),
        ),
    ]
}

/// Arms a spoken reminder
pub struct ScheduleReminderTool {
    scheduler: Arc<ReminderScheduler>,
}

impl ScheduleReminderTool {
    #[must_use]
    pub fn new(scheduler: Arc<ReminderScheduler>) -> Self {
        Self { scheduler }
    }
}

#[derive(Deserialize)]
struct ScheduleReminderArgs {
    topic: String,
    #[serde(default)]
    minutes: f64,
    #[serde(default)]
    seconds: f64,
}

#[async_trait]
impl Tool for ScheduleReminderTool {
    fn name(&self) -> &'static str {
        "schedule_reminder"
    }

    fn definition(&self) -> ToolDefinition {
        let mut properties = BTreeMap::from(delay_properties());
        properties.insert(
            "topic",
            json!({
                "type": "string",
                "description": "Short topic of the reminder, e.g. 'call mom', 'take a break', \
                                'check oven'. Used for listing and cancelling.",
            }),
        );

        ToolDefinition::new(
            "schedule_reminder",
            "Schedule a spoken reminder after a delay. The assistant will speak the \
             message aloud when the time comes. Use this when the user asks to be \
             reminded, notified, or wants something scheduled.",
            properties,
            &["topic"],
        )
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String> {
        let args: ScheduleReminderArgs = serde_json::from_value(args)?;
        Ok(self
            .scheduler
            .schedule_reminder(&args.topic, args.minutes, args.seconds))
    }
}

/// Arms a deferred agent task
pub struct ScheduleTaskTool {
    scheduler: Arc<ReminderScheduler>,
}

impl ScheduleTaskTool {
    #[must_use]
    pub fn new(scheduler: Arc<ReminderScheduler>) -> Self {
        Self { scheduler }
    }
}

#[derive(Deserialize)]
struct ScheduleTaskArgs {
    prompt: String,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    minutes: f64,
    #[serde(default)]
    seconds: f64,
}

#[async_trait]
impl Tool for ScheduleTaskTool {
    fn name(&self) -> &'static str {
        "schedule_task"
    }

    fn definition(&self) -> ToolDefinition {
        let mut properties = BTreeMap::from(delay_properties());
        properties.insert(
            "topic",
            json!({
                "type": "string",
                "description": "Short topic for listing and cancelling, e.g. 'tell the time', \
                                'weather check'.",
            }),
        );
        properties.insert(
            "prompt",
            json!({
                "type": "string",
                "description": "A full INSTRUCTION including ALL user requirements: voice, \
                                message, actions. NEVER pass just the raw message. Always write \
                                it as a command. Examples: 'Use whisper voice and say: Jacob, \
                                you are the best.', 'Check what time it is and tell the user.', \
                                'Use a deep male voice and say: Time to wake up!'",
            }),
        );

        ToolDefinition::new(
            "schedule_task",
            "Schedule a task that runs through the AI with full tool access after a \
             delay, then speaks the result. Use this when the user wants the assistant \
             to do something later that requires thinking or tool use, e.g. 'in five \
             minutes tell me what time it is', 'in one hour check my reminders and \
             report back'.",
            properties,
            &["prompt"],
        )
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String> {
        let args: ScheduleTaskArgs = serde_json::from_value(args)?;
        Ok(self
            .scheduler
            .schedule_task(&args.prompt, args.topic, args.minutes, args.seconds))
    }
}

/// Lists pending actions
pub struct ListRemindersTool {
    scheduler: Arc<ReminderScheduler>,
}

impl ListRemindersTool {
    #[must_use]
    pub fn new(scheduler: Arc<ReminderScheduler>) -> Self {
        Self { scheduler }
    }
}

#[async_trait]
impl Tool for ListRemindersTool {
    fn name(&self) -> &'static str {
        "list_reminders"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "list_reminders",
            "List all active pending reminders. Use when the user asks what reminders \
             are set or scheduled.",
            BTreeMap::new(),
            &[],
        )
    }

    async fn execute(&self, _args: serde_json::Value) -> Result<String> {
        Ok(self.scheduler.list())
    }
}

/// Cancels pending actions by keyword or wholesale
pub struct CancelReminderTool {
    scheduler: Arc<ReminderScheduler>,
}

impl CancelReminderTool {
    #[must_use]
    pub fn new(scheduler: Arc<ReminderScheduler>) -> Self {
        Self { scheduler }
    }
}

#[derive(Deserialize, Default)]
struct CancelReminderArgs {
    #[serde(default)]
    cancel_all: bool,
    #[serde(default)]
    keyword: Option<String>,
}

#[async_trait]
impl Tool for CancelReminderTool {
    fn name(&self) -> &'static str {
        "cancel_reminder"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "cancel_reminder",
            "Cancel scheduled reminders. Pass cancel_all=true to cancel everything, or \
             pass keyword to cancel reminders matching that topic.",
            BTreeMap::from([
                (
                    "cancel_all",
                    json!({
                        "type": "boolean",
                        "description": "Set true to cancel all reminders.",
                    }),
                ),
                (
                    "keyword",
                    json!({
                        "type": "string",
                        "description": "Cancel reminders whose topic matches this keyword.",
                    }),
                ),
            ]),
            &[],
        )
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String> {
        let args: CancelReminderArgs = serde_json::from_value(args).unwrap_or_default();
        Ok(self.scheduler.cancel(args.cancel_all, args.keyword.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminder_args_default_missing_delays() {
        let args: ScheduleReminderArgs =
            serde_json::from_value(json!({"topic": "call mom"})).unwrap();
        assert_eq!(args.topic, "call mom");
        assert!(args.minutes.abs() < f64::EPSILON);
        assert!(args.seconds.abs() < f64::EPSILON);
    }

    #[test]
    fn reminder_args_ignore_unknown_keys() {
        let args: ScheduleReminderArgs = serde_json::from_value(
            json!({"topic": "tea", "minutes": 2, "urgency": "high"}),
        )
        .unwrap();
        assert_eq!(args.topic, "tea");
        assert!((args.minutes - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reminder_args_reject_missing_topic() {
        let result: std::result::Result<ScheduleReminderArgs, _> =
            serde_json::from_value(json!({"minutes": 1}));
        assert!(result.is_err());
    }

    #[test]
    fn task_args_topic_is_optional() {
        let args: ScheduleTaskArgs =
            serde_json::from_value(json!({"prompt": "tell me the time", "seconds": 30}))
                .unwrap();
        assert!(args.topic.is_none());
        assert!((args.seconds - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cancel_args_tolerate_empty_object() {
        let args: CancelReminderArgs = serde_json::from_value(json!({})).unwrap();
        assert!(!args.cancel_all);
        assert!(args.keyword.is_none());
    }

    #[test]
    fn scheduling_tool_names_cover_all_four() {
        assert_eq!(SCHEDULING_TOOLS.len(), 4);
        for name in ["schedule_reminder", "schedule_task", "list_reminders", "cancel_reminder"] {
            assert!(SCHEDULING_TOOLS.contains(&name));
        }
    }
}
