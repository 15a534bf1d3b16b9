//! Terminal styling - ANSI colors for rendered forms and results
//!
//! Colors are auto-disabled when the stream is not a TTY.

use std::io::IsTerminal;

// ==================== ANSI Codes ====================

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

// ==================== TTY Detection ====================

pub fn stderr_is_tty() -> bool {
    std::io::stderr().is_terminal()
}

pub fn stdout_is_tty() -> bool {
    std::io::stdout().is_terminal()
}

// ==================== Styled Output Helpers ====================

/// Wrap text with color, respecting TTY
pub fn color(text: &str, code: &str) -> String {
    if stdout_is_tty() {
        format!("{}{}{}", code, text, RESET)
    } else {
        text.to_string()
    }
}

/// Wrap text with color for stderr output
pub fn ecolor(text: &str, code: &str) -> String {
    if stderr_is_tty() {
        format!("{}{}{}", code, text, RESET)
    } else {
        text.to_string()
    }
}

pub fn bold(text: &str) -> String {
    color(text, BOLD)
}

pub fn dim(text: &str) -> String {
    color(text, DIM)
}

pub fn arrow() -> &'static str { if stdout_is_tty() { "▸" } else { ">" } }

// ==================== Info Display ====================

/// Format a key-value pair
pub fn kv(key: &str, value: &str) -> String {
    if stdout_is_tty() {
        format!("  {DIM}{key}{RESET}  {value}")
    } else {
        format!("  {}  {}", key, value)
    }
}

/// Section header
pub fn section(title: &str) -> String {
    if stdout_is_tty() {
        format!("{DIM}─── {RESET}{BOLD}{title}{RESET} {DIM}───{RESET}")
    } else {
        format!("--- {} ---", title)
    }
}

/// Format tool id and title
pub fn tool_entry(id: &str, title: &str) -> String {
    if stdout_is_tty() {
        format!("  {CYAN}{id}{RESET}  {DIM}{title}{RESET}")
    } else {
        format!("  {}  {}", id, title)
    }
}

/// Error line for stderr
pub fn error_line(message: &str) -> String {
    format!("{} {}", ecolor("Error:", RED), message)
}
