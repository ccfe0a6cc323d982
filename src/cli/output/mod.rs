//! CLI output formatting: dual human/JSON rendering for every command.

pub mod table;

pub use table::TableFormatter;

use serde::Serialize;

/// Anything a CLI command prints implements both renderings; `--json`
/// selects which one runs.
pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn print_output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate a string to `max_len` characters, appending an ellipsis if
/// it was cut.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_strings_alone() {
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn truncate_cuts_long_strings() {
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
