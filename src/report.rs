//! Error Reporting
//!
//! Rust-style error display with colors and source context, used by the
//! CLI for all four failure stages.

use colored::*;

/// A diagnostic message with source location
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<String>,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub source_line: Option<String>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            file: String::new(),
            line: 0,
            column: 0,
            source_line: None,
            help: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn at(mut self, file: impl Into<String>, line: usize, column: usize) -> Self {
        self.file = file.into();
        self.line = line;
        self.column = column;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_line = Some(source.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Format the diagnostic for display
    pub fn format(&self) -> String {
        let mut output = String::new();

        // Header: error[E0001]: message
        let level_str = "error".red().bold();
        if let Some(code) = &self.code {
            output.push_str(&format!("{}[{}]: {}\n", level_str, code.bold(), self.message.bold()));
        } else {
            output.push_str(&format!("{}: {}\n", level_str, self.message.bold()));
        }

        // Location: --> file:line:column
        if !self.file.is_empty() && self.line > 0 {
            let arrow = "-->".blue().bold();
            output.push_str(&format!(" {} {}:{}:{}\n", arrow, self.file, self.line, self.column));
        }

        // Source context
        if let Some(source) = &self.source_line {
            let line_num = format!("{}", self.line);
            let padding = " ".repeat(line_num.len());
            let pipe = "|".blue().bold();

            output.push_str(&format!("{} {}\n", padding, pipe));
            output.push_str(&format!("{} {} {}\n", line_num.blue().bold(), pipe, source));

            let spaces = " ".repeat(self.column.saturating_sub(1));
            let caret = "^".red().bold();
            output.push_str(&format!("{} {} {}{}\n", padding, pipe, spaces, caret));
        }

        // Help message
        if let Some(help) = &self.help {
            output.push_str(&format!("{}: {}\n", "help".cyan().bold(), help));
        }

        output
    }

    /// Print the diagnostic to stderr
    pub fn emit(&self) {
        eprint!("{}", self.format());
    }
}

/// Error codes, one per pipeline stage
pub mod codes {
    pub const LEX_ERROR: &str = "E0001";
    pub const PARSE_ERROR: &str = "E0002";
    pub const NAME_ERROR: &str = "E0003";
    pub const RUNTIME_ERROR: &str = "E0004";
}

/// Helper to extract a line from source code
pub fn get_source_line(source: &str, line: usize) -> Option<String> {
    source
        .lines()
        .nth(line.saturating_sub(1))
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_format() {
        let diag = Diagnostic::error("name 'foo' is not defined")
            .with_code(codes::NAME_ERROR)
            .at("sensors.dice", 5, 10)
            .with_source("    print(foo);")
            .with_help("define it with `foo = ...` before use");

        let output = diag.format();
        assert!(output.contains("name 'foo' is not defined"));
        assert!(output.contains("E0003"));
        assert!(output.contains("sensors.dice:5:10"));
        assert!(output.contains("print(foo)"));
    }

    #[test]
    fn test_diagnostic_without_location() {
        let diag = Diagnostic::error("no 'main' function defined").with_code(codes::RUNTIME_ERROR);
        let output = diag.format();
        assert!(output.contains("no 'main' function defined"));
        assert!(!output.contains("-->"));
    }

    #[test]
    fn test_get_source_line() {
        let source = "line 1\nline 2\nline 3";
        assert_eq!(get_source_line(source, 1), Some("line 1".to_string()));
        assert_eq!(get_source_line(source, 2), Some("line 2".to_string()));
        assert_eq!(get_source_line(source, 3), Some("line 3".to_string()));
        assert_eq!(get_source_line(source, 4), None);
    }
}
