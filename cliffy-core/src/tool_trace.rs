//! NDJSON tool-trace emitter (spec §4.9, §6.4): one self-contained JSON
//! object per line on stderr, no enclosing array, no partial lines.

use std::io::Write;

use crate::task::ToolExecutionMetadata;

/// Writes one NDJSON line for a tool execution. `task_index` is the
/// 1-based `Task.index`.
pub fn emit_tool_trace_line(
    writer: &mut impl Write,
    task_index: usize,
    metadata: &ToolExecutionMetadata,
) -> std::io::Result<()> {
    let line = serde_json::json!({
        "task_index": task_index,
        "tool": metadata.tool_name,
        "duration_ms": metadata.duration.as_millis() as u64,
        "display": metadata.display,
        "exit_code": metadata.exit_code,
    });
    writeln!(writer, "{line}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn emits_single_complete_json_object_per_call() {
        let mut buf = Vec::new();
        let metadata = ToolExecutionMetadata {
            tool_name: "bash".to_string(),
            display: serde_json::json!({"command": "ls"}),
            duration: Duration::from_millis(42),
            exit_code: Some(0),
        };
        emit_tool_trace_line(&mut buf, 3, &metadata).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.matches('\n').count(), 1);
        assert!(text.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(parsed["task_index"], 3);
        assert_eq!(parsed["tool"], "bash");
        assert_eq!(parsed["duration_ms"], 42);
    }
}
