//! Thread-safe live progress renderer (spec §4.8): header, per-task line,
//! tool subtree with collapsing, repeated-error collapsing, spinner loop,
//! and the thinking channel. Self-disables when stderr is not a TTY.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use console::Term;
use parking_lot::Mutex;
use unicode_width::UnicodeWidthStr;

use crate::classifier::ErrorClass;
use crate::options::{ThinkingFormat, Verbosity};
use crate::task::{TaskResult, TaskStatus, ToolExecutionMetadata};

const SPINNER_FRAMES: [&str; 4] = ["⠋", "⠙", "⠹", "⠸"];
const MAX_VISIBLE_TOOLS: usize = 4;
const MAX_DISTINCT_TOOL_NAMES: usize = 3;
const DISPLAY_WIDTH: usize = 80;
const SPINNER_TICK: Duration = Duration::from_millis(100);

struct TaskDisplayState {
    index: usize,
    prompt: String,
    status: TaskStatus,
    worker_id: Option<usize>,
    tools: Vec<ToolExecutionMetadata>,
    result: Option<TaskResult>,
    collapsed: bool,
    spinner_frame: usize,
    last_error: Option<(ErrorClass, String)>,
    error_count: u32,
}

impl TaskDisplayState {
    fn queued(index: usize, prompt: String) -> Self {
        Self {
            index,
            prompt,
            status: TaskStatus::Pending,
            worker_id: None,
            tools: Vec::new(),
            result: None,
            collapsed: false,
            spinner_frame: 0,
            last_error: None,
            error_count: 0,
        }
    }
}

struct RendererState {
    tasks: Vec<TaskDisplayState>,
    total_lines: usize,
    model_name: String,
    redraw_count: u64,
}

impl RendererState {
    fn render_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for task in &self.tasks {
            lines.push(render_task_line(task));
            if !task.collapsed {
                let visible: Vec<&ToolExecutionMetadata> = task
                    .tools
                    .iter()
                    .rev()
                    .take(MAX_VISIBLE_TOOLS)
                    .rev()
                    .collect();
                for (i, tool) in visible.iter().enumerate() {
                    let branch = if i + 1 == visible.len() { "╰" } else { "├" };
                    lines.push(format!("  {branch} {}", tool.tool_name));
                }
            }
        }
        lines
    }
}

/// Caller of [`Renderer`] only ever talks to task indices (1-based, same
/// as `Task.index`); internal storage position is `index - 1`.
pub struct Renderer {
    state: Mutex<RendererState>,
    term: Term,
    enabled: bool,
    show_thinking: bool,
    thinking_format: ThinkingFormat,
    verbosity: Verbosity,
    spinner_running: AtomicBool,
}

impl Renderer {
    pub fn new(
        show_progress: bool,
        show_thinking: bool,
        thinking_format: ThinkingFormat,
        verbosity: Verbosity,
    ) -> Self {
        let term = Term::stderr();
        let enabled = show_progress && console::user_attended_stderr();
        Self {
            state: Mutex::new(RendererState {
                tasks: Vec::new(),
                total_lines: 0,
                model_name: String::new(),
                redraw_count: 0,
            }),
            term,
            enabled,
            show_thinking,
            thinking_format,
            verbosity,
            spinner_running: AtomicBool::new(false),
        }
    }

    pub fn start(&self, prompts: &[(usize, String)], model_name: &str) {
        if matches!(self.verbosity, Verbosity::Quiet) {
            return;
        }
        let mut state = self.state.lock();
        state.model_name = model_name.to_string();
        state.tasks = prompts
            .iter()
            .map(|(index, prompt)| TaskDisplayState::queued(*index, prompt.clone()))
            .collect();
        if self.enabled {
            let _ = writeln!(
                self.term.clone(),
                "volley: {} tasks, model {}",
                state.tasks.len(),
                state.model_name
            );
            let _ = writeln!(self.term.clone());
        }
        self.redraw_locked(&mut state);
    }

    pub fn task_started(&self, index: usize, worker_id: usize) {
        let mut state = self.state.lock();
        if let Some(t) = task_mut(&mut state, index) {
            t.status = TaskStatus::Running;
            t.worker_id = Some(worker_id);
        }
        self.redraw_locked(&mut state);
    }

    pub fn task_tool_trace(&self, index: usize, metadata: ToolExecutionMetadata) {
        let mut state = self.state.lock();
        if let Some(t) = task_mut(&mut state, index) {
            t.tools.push(metadata);
        }
        self.redraw_locked(&mut state);
    }

    /// Free-form progress messages are absorbed into the task's live line
    /// via a redraw; the core does not keep a separate progress history.
    pub fn task_progress(&self, _index: usize, _message: &str) {
        let mut state = self.state.lock();
        self.redraw_locked(&mut state);
    }

    pub fn task_retrying(&self, index: usize, class: ErrorClass, message: &str) {
        let mut state = self.state.lock();
        let mut should_redraw = true;
        if let Some(t) = task_mut(&mut state, index) {
            t.status = TaskStatus::Retrying;
            match &t.last_error {
                Some((last_class, last_message))
                    if *last_class == class && last_message == message =>
                {
                    t.error_count += 1;
                    should_redraw = t.error_count == 1 || t.error_count % 3 == 0;
                }
                _ => {
                    t.last_error = Some((class, message.to_string()));
                    t.error_count = 1;
                }
            }
        }
        if should_redraw {
            self.redraw_locked(&mut state);
        }
    }

    pub fn task_completed(&self, index: usize, result: TaskResult) {
        let mut state = self.state.lock();
        if let Some(t) = task_mut(&mut state, index) {
            t.status = result.status;
            t.collapsed = true;
            t.result = Some(result);
        }
        self.redraw_locked(&mut state);
    }

    pub fn thinking(&self, index: usize, content: &str) {
        if !self.show_thinking {
            return;
        }
        let mut state = self.state.lock();
        if self.enabled {
            self.clear_locked(&state);
        }
        match self.thinking_format {
            ThinkingFormat::Text => {
                let _ = writeln!(self.term.clone(), "[THINKING - Task {index}] {content} [/THINKING]");
            }
            ThinkingFormat::Json => {
                let line = serde_json::json!({"type": "thinking", "task": index, "content": content});
                let _ = writeln!(self.term.clone(), "{line}");
            }
        }
        if self.enabled {
            self.print_locked(&mut state);
        }
    }

    pub fn finish(&self) {
        self.spinner_running.store(false, Ordering::SeqCst);
    }

    /// Spawns the 100ms spinner ticker. Returns a handle the caller should
    /// abort (or let `finish` stop naturally) once the volley completes.
    pub fn spawn_spinner(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.spinner_running.store(true, Ordering::SeqCst);
        let renderer = self;
        tokio::spawn(async move {
            while renderer.spinner_running.load(Ordering::SeqCst) {
                tokio::time::sleep(SPINNER_TICK).await;
                if !renderer.spinner_running.load(Ordering::SeqCst) {
                    break;
                }
                let mut state = renderer.state.lock();
                let mut any_running = false;
                for t in &mut state.tasks {
                    if t.status == TaskStatus::Running {
                        t.spinner_frame = (t.spinner_frame + 1) % SPINNER_FRAMES.len();
                        any_running = true;
                    }
                }
                if any_running {
                    renderer.redraw_locked(&mut state);
                }
            }
        })
    }

    #[cfg(test)]
    pub fn error_count(&self, index: usize) -> u32 {
        let mut state = self.state.lock();
        task_mut(&mut state, index).map(|t| t.error_count).unwrap_or(0)
    }

    #[cfg(test)]
    pub fn redraw_count(&self) -> u64 {
        self.state.lock().redraw_count
    }

    fn redraw_locked(&self, state: &mut RendererState) {
        state.redraw_count += 1;
        if !self.enabled {
            return;
        }
        self.clear_locked(state);
        self.print_locked(state);
    }

    fn clear_locked(&self, state: &RendererState) {
        let mut term = self.term.clone();
        if state.total_lines > 0 {
            let _ = term.move_cursor_up(state.total_lines);
            let _ = term.clear_to_end_of_screen();
        }
    }

    fn print_locked(&self, state: &mut RendererState) {
        let lines = state.render_lines();
        let mut term = self.term.clone();
        for line in &lines {
            let _ = writeln!(term, "{line}");
        }
        state.total_lines = lines.len();
    }
}

fn task_mut(state: &mut RendererState, index: usize) -> Option<&mut TaskDisplayState> {
    state.tasks.iter_mut().find(|t| t.index == index)
}

fn truncate_display(s: &str) -> String {
    use unicode_width::UnicodeWidthChar;

    if UnicodeWidthStr::width(s) <= DISPLAY_WIDTH {
        return s.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w > DISPLAY_WIDTH.saturating_sub(1) {
            break;
        }
        width += w;
        out.push(ch);
    }
    out.push('…');
    out
}

fn tool_summary(tools: &[ToolExecutionMetadata]) -> String {
    if tools.is_empty() {
        return String::new();
    }
    let mut order: Vec<String> = Vec::new();
    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for tool in tools {
        *counts.entry(tool.tool_name.clone()).or_insert(0) += 1;
        if !order.contains(&tool.tool_name) {
            order.push(tool.tool_name.clone());
        }
    }
    let shown: Vec<&String> = order.iter().take(MAX_DISTINCT_TOOL_NAMES).collect();
    let mut parts: Vec<String> = shown
        .iter()
        .map(|name| {
            let count = counts[*name];
            if count > 1 {
                format!("{count}×{name}")
            } else {
                (*name).clone()
            }
        })
        .collect();
    if order.len() > MAX_DISTINCT_TOOL_NAMES {
        parts.push(format!("+{} more", order.len() - MAX_DISTINCT_TOOL_NAMES));
    }
    format!("[{}]", parts.join(" "))
}

fn render_task_line(task: &TaskDisplayState) -> String {
    let icon = match task.status {
        TaskStatus::Running => SPINNER_FRAMES[task.spinner_frame],
        TaskStatus::Success => "✓",
        TaskStatus::Failed => "✗",
        TaskStatus::Canceled => "✗",
        TaskStatus::Retrying => "⚠",
        TaskStatus::Pending => "○",
    };
    let prompt = truncate_display(&task.prompt);
    let trailing = match task.status {
        TaskStatus::Running => task
            .worker_id
            .map(|id| format!("worker {id}"))
            .unwrap_or_default(),
        TaskStatus::Success => {
            if let Some(result) = &task.result {
                format!(
                    "{} {} tok ${:.4} {:.1?}",
                    tool_summary(&task.tools),
                    result.usage.total_tokens(),
                    result.cost,
                    result.duration
                )
            } else {
                tool_summary(&task.tools)
            }
        }
        TaskStatus::Retrying | TaskStatus::Failed | TaskStatus::Canceled => {
            let base = task
                .last_error
                .as_ref()
                .map(|(_, msg)| msg.clone())
                .or_else(|| task.result.as_ref().and_then(|r| r.error.clone()))
                .unwrap_or_default();
            if task.error_count > 1 {
                format!("{base} (×{})", task.error_count)
            } else {
                base
            }
        }
        TaskStatus::Pending => String::new(),
    };
    format!("{:>4}   {icon} {prompt} {trailing}", task.index)
}
