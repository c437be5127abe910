//! Output formatting and writing utilities
//!
//! Response data goes to stdout in the selected format; status messages go
//! to stderr so they never mix with data piped into other tools.

use crate::cli::OutputFormat;
use crate::error::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;

/// Format a serializable value
pub fn format_value<T: Serialize>(format: OutputFormat, value: &T) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(value)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
    }
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    quiet: bool,
    show_progress: bool,
    writer: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool) -> Self {
        Self {
            format,
            use_color,
            quiet,
            show_progress: !quiet && io::stderr().is_terminal(),
            writer: Box::new(io::stdout()),
        }
    }

    /// Create an output writer with a custom data writer
    #[cfg(test)]
    pub fn with_writer(format: OutputFormat, writer: Box<dyn Write>) -> Self {
        Self {
            format,
            use_color: false,
            quiet: true,
            show_progress: false,
            writer,
        }
    }

    /// Write a status message
    pub fn info(&self, message: &str) {
        tracing::debug!("Output info: {}", message);
        if self.quiet {
            return;
        }
        if self.use_color {
            eprintln!("{} {}", "ℹ".blue(), message);
        } else {
            eprintln!("INFO: {}", message);
        }
    }

    /// Write a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        if self.use_color {
            eprintln!("{}", message.green());
        } else {
            eprintln!("{}", message);
        }
    }

    /// Write response data in the selected format
    pub fn data<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let rendered = format_value(self.format, value)?;
        writeln!(self.writer, "{}", rendered.trim_end())?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write raw bytes unchanged
    pub fn raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Start a spinner on stderr when attached to a terminal
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        Some(pb)
    }
}
