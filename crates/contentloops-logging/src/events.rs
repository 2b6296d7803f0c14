use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const BOX_WIDTH: usize = 69;

/// Structured log events for a refinement run. Iterations are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    RunStarted {
        request: String,
        language: String,
        topic: String,
        max_iterations: usize,
        pass_threshold: f64,
    },
    PlanCompleted {
        degraded: bool,
        context_snippets: usize,
        duration_secs: f64,
    },
    GeneratorStarted {
        iteration: usize,
    },
    GeneratorCompleted {
        iteration: usize,
        content_chars: usize,
        degraded: bool,
        duration_secs: f64,
    },
    EvaluatorStarted {
        iteration: usize,
    },
    EvaluatorCompleted {
        iteration: usize,
        score: f64,
        feedback: String,
        degraded: bool,
        /// Rejected by the length gate without calling the critic
        gated: bool,
    },
    BestResultUpdated {
        iteration: usize,
        score: f64,
    },
    RunCompleted {
        iterations: usize,
        final_score: f64,
        best_iteration: usize,
        passed: bool,
        duration_secs: f64,
    },
    MaxIterationsReached {
        iterations: usize,
    },
    ExportCompleted {
        path: PathBuf,
    },
    ExportFailed {
        error: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for run events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    quiet: bool,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            quiet: false,
            file_writer: None,
        }
    }

    /// Logger that only writes to its file, if any
    pub fn silent() -> Self {
        Self {
            format: LogFormat::Compact,
            quiet: true,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            quiet: false,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if self.quiet {
            return;
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::RunStarted {
                request,
                language,
                topic,
                max_iterations,
                pass_threshold,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    format!("╭{}╮", "─".repeat(BOX_WIDTH)).bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "contentloops".bold().bright_white(),
                    " ".repeat(BOX_WIDTH - 14) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Request:".dimmed(),
                    Self::truncate_with_padding(request, 56, BOX_WIDTH - 10).dimmed()
                );
                let settings = format!(
                    "{} / {} / max {} / pass {:.2}",
                    language, topic, max_iterations, pass_threshold
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Run:".dimmed(),
                    Self::truncate_with_padding(&settings, 60, BOX_WIDTH - 6).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    format!("╰{}╯", "─".repeat(BOX_WIDTH)).bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::PlanCompleted {
                degraded,
                context_snippets,
                duration_secs,
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_cyan(),
                    "PLAN".bright_cyan().bold()
                );
                if *degraded {
                    let _ = writeln!(
                        stderr,
                        "    {} Fallback plan ({:.1}s)",
                        "⚠".bright_yellow(),
                        duration_secs
                    );
                } else {
                    let _ = writeln!(
                        stderr,
                        "    {} Done, {} context {} ({:.1}s)",
                        "✓".bright_green(),
                        context_snippets,
                        if *context_snippets == 1 { "snippet" } else { "snippets" },
                        duration_secs
                    );
                }
                let _ = writeln!(stderr);
            }
            LogEvent::GeneratorStarted { iteration } => {
                let iter_text = format!("─ Iteration {} ", iteration);
                let padding = "─".repeat(BOX_WIDTH.saturating_sub(iter_text.chars().count()));
                let _ = writeln!(
                    stderr,
                    "{}{}{}",
                    "┌".bright_blue(),
                    iter_text.bright_blue().bold(),
                    padding.bright_blue()
                );
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_cyan(),
                    "GENERATE".bright_cyan().bold()
                );
            }
            LogEvent::GeneratorCompleted {
                content_chars,
                degraded,
                duration_secs,
                ..
            } => {
                if *degraded {
                    let _ = writeln!(
                        stderr,
                        "    {} Fallback content ({:.1}s)",
                        "✗".bright_red(),
                        duration_secs
                    );
                } else {
                    let _ = writeln!(
                        stderr,
                        "    {} {} chars ({:.1}s)",
                        "✓".bright_green(),
                        content_chars,
                        duration_secs
                    );
                }
                let _ = writeln!(stderr);
            }
            LogEvent::EvaluatorStarted { .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_magenta(),
                    "EVALUATE".bright_magenta().bold()
                );
            }
            LogEvent::EvaluatorCompleted {
                score,
                feedback,
                degraded,
                gated,
                ..
            } => {
                let label = format!("Score: {:.2}", score);
                let styled = if *gated {
                    format!("✗ {} (content too short)", label).bright_red().to_string()
                } else if *degraded {
                    format!("⚠ {} (critic unavailable)", label)
                        .bright_yellow()
                        .to_string()
                } else {
                    format!("→ {}", label).bright_yellow().to_string()
                };
                let _ = writeln!(stderr, "    {}", styled);
                let _ = writeln!(
                    stderr,
                    "    {} {}",
                    "│".dimmed(),
                    Self::truncate(feedback, 100).dimmed()
                );
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    format!("└{}┘", "─".repeat(BOX_WIDTH)).bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::BestResultUpdated { iteration, score } => {
                let _ = writeln!(
                    stderr,
                    "  {} Best so far: iteration {} ({:.2})",
                    "★".bright_green(),
                    iteration,
                    score
                );
                let _ = writeln!(stderr);
            }
            LogEvent::RunCompleted { .. } => {
                // Printed by the binary with the final outcome
            }
            LogEvent::MaxIterationsReached { iterations } => {
                let _ = writeln!(
                    stderr,
                    "{} Maximum iterations reached ({})",
                    "⚠".bright_yellow(),
                    iterations
                );
            }
            LogEvent::ExportCompleted { path } => {
                let _ = writeln!(
                    stderr,
                    "{} Exported to {}",
                    "📄".dimmed(),
                    path.display()
                );
            }
            LogEvent::ExportFailed { error } => {
                let _ = writeln!(
                    stderr,
                    "{} Export failed: {}",
                    "⚠".bright_yellow(),
                    error.bright_yellow()
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::RunStarted { max_iterations, .. } => {
                format!("[{}] run:start max={}", timestamp, max_iterations)
            }
            LogEvent::PlanCompleted {
                degraded,
                context_snippets,
                duration_secs,
            } => format!(
                "[{}] plan:done ctx={}{} {:.1}s",
                timestamp,
                context_snippets,
                if *degraded { " fallback" } else { "" },
                duration_secs
            ),
            LogEvent::GeneratorStarted { iteration } => {
                format!("[{}] generate:start:{}", timestamp, iteration)
            }
            LogEvent::GeneratorCompleted {
                iteration,
                content_chars,
                duration_secs,
                ..
            } => format!(
                "[{}] generate:done:{} chars={} {:.1}s",
                timestamp, iteration, content_chars, duration_secs
            ),
            LogEvent::EvaluatorStarted { iteration } => {
                format!("[{}] evaluate:start:{}", timestamp, iteration)
            }
            LogEvent::EvaluatorCompleted {
                iteration, score, ..
            } => format!("[{}] evaluate:done:{} score={:.2}", timestamp, iteration, score),
            LogEvent::BestResultUpdated { iteration, score } => {
                format!("[{}] best:{} score={:.2}", timestamp, iteration, score)
            }
            LogEvent::RunCompleted {
                iterations,
                final_score,
                duration_secs,
                ..
            } => format!(
                "[{}] run:done:{} score={:.2} {:.1}s",
                timestamp, iterations, final_score, duration_secs
            ),
            LogEvent::MaxIterationsReached { iterations } => {
                format!("[{}] run:limit:{}", timestamp, iterations)
            }
            LogEvent::ExportCompleted { path } => {
                format!("[{}] export:{}", timestamp, path.display())
            }
            LogEvent::ExportFailed { error } => {
                format!("[{}] export:failed {}", timestamp, error)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    fn truncate(s: &str, max_chars: usize) -> String {
        let single_line = s.replace('\n', " ");
        if single_line.chars().count() > max_chars {
            let cut: String = single_line.chars().take(max_chars - 3).collect();
            format!("{}...", cut)
        } else {
            single_line
        }
    }

    /// Truncate a string and pad to exact width
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let truncated = Self::truncate(s, max_len);
        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1);
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}
