//! Current date/time tool

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Local;

use super::{Tool, ToolDefinition};
use crate::Result;

/// Reports the current local date and time
pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn name(&self) -> &'static str {
        "get_current_datetime"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_current_datetime",
            "Get the current date and time",
            BTreeMap::new(),
            &[],
        )
    }

    async fn execute(&self, _args: serde_json::Value) -> Result<String> {
        Ok(Local::now().format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_formatted_timestamp() {
        let out = DateTimeTool.execute(serde_json::json!({})).await.unwrap();
        // "2026-08-07 12:34:56" — 19 chars, date and time separated by a space
        assert_eq!(out.len(), 19);
        assert_eq!(out.as_bytes()[4], b'-');
        assert_eq!(out.as_bytes()[10], b' ');
        assert_eq!(out.as_bytes()[13], b':');
    }

    #[test]
    fn schema_has_no_parameters() {
        let def = DateTimeTool.definition();
        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(value["function"]["parameters"]["required"], serde_json::json!([]));
    }
}
