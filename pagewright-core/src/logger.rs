//! Per-run build transcript.
//!
//! A [`BuildLogger`] belongs to exactly one pipeline run. Every line is kept
//! in order, mirrored to `tracing`, and forwarded to the optional sinks.

use pagewright_types::{BuildLogLine, LogLevel};

pub type LogSink = Box<dyn Fn(&BuildLogLine) + Send + Sync>;

#[derive(Default)]
pub struct BuildLogger {
    lines: Vec<BuildLogLine>,
    on_log: Option<LogSink>,
    on_error: Option<LogSink>,
}

impl BuildLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called for every line
    pub fn with_log_sink(mut self, sink: impl Fn(&BuildLogLine) + Send + Sync + 'static) -> Self {
        self.on_log = Some(Box::new(sink));
        self
    }

    /// Called for error lines only
    pub fn with_error_sink(
        mut self,
        sink: impl Fn(&BuildLogLine) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(sink));
        self
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        let line = BuildLogLine::new(level, message);

        match level {
            LogLevel::Info => tracing::info!(target: "pagewright::build", "{}", line.message),
            LogLevel::Warning => tracing::warn!(target: "pagewright::build", "{}", line.message),
            LogLevel::Error => tracing::error!(target: "pagewright::build", "{}", line.message),
        }

        if let Some(sink) = &self.on_log {
            sink(&line);
        }
        if level == LogLevel::Error {
            if let Some(sink) = &self.on_error {
                sink(&line);
            }
        }

        self.lines.push(line);
    }

    pub fn lines(&self) -> &[BuildLogLine] {
        &self.lines
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.lines.iter().filter(|l| l.level == level).count()
    }

    pub fn into_lines(self) -> Vec<BuildLogLine> {
        self.lines
    }
}

impl std::fmt::Debug for BuildLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildLogger")
            .field("lines", &self.lines.len())
            .finish_non_exhaustive()
    }
}
