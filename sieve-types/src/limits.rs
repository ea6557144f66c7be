//! Resource-limit gate, configured by semantic settings name. The engine
//! never reads configuration itself; the host populates this struct
//! however it parses its own config format.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Caps checked at the single call site each one governs.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// `sieve_variables_max_variable_size`. Truncation boundary for a single
    /// variable assignment, in bytes.
    pub max_variable_size: usize,

    /// `sieve_variables_max_scope_size`. Compile error on overflow. Must be
    /// at least 128 per RFC 5229.
    pub max_scope_size: usize,

    /// Fixed-size match-value register array length. At least 9.
    pub max_match_values: usize,

    /// `sieve_include_max_nesting_depth`.
    pub max_nesting_depth: usize,

    /// `sieve_include_max_includes`. Total number of scripts one execution
    /// may pull in via `include`.
    pub max_includes: usize,

    /// Maximum accepted size, in bytes, of an uploaded or compiled script.
    pub max_script_size: usize,

    /// ManageSieve: maximum accepted line size, including literal payloads.
    pub max_line_length: usize,

    /// Wall/CPU time budget for one execution, in microseconds. `None`
    /// disables the check (still bounded by host-driven cancellation).
    pub cpu_time_limit_us: Option<u64>,

    /// Peak memory budget for one execution, in bytes.
    pub memory_limit_bytes: Option<u64>,

    /// Per-connection count of consecutive bad ManageSieve commands before
    /// the server sends `BYE` and disconnects.
    pub max_bad_commands: u32,

    /// Maximum accumulated compile errors before validation aborts.
    /// Warnings never count toward this.
    pub max_compile_errors: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_variable_size: 4096,
            max_scope_size: 255,
            max_match_values: 9,
            max_nesting_depth: 10,
            max_includes: 30,
            max_script_size: 1024 * 1024,
            max_line_length: 65536,
            cpu_time_limit_us: Some(30_000_000),
            memory_limit_bytes: Some(32 * 1024 * 1024),
            max_bad_commands: 10,
            max_compile_errors: 100,
        }
    }
}

impl Limits {
    /// Truncate `value` to `max_variable_size` bytes, never splitting a
    /// multi-byte UTF-8 sequence.
    pub fn truncate_variable<'a>(&self, value: &'a str) -> &'a str {
        if value.len() <= self.max_variable_size {
            return value;
        }
        let mut end = self.max_variable_size;
        while end > 0 && !value.is_char_boundary(end) {
            end -= 1;
        }
        &value[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_never_splits_a_multibyte_char() {
        let limits = Limits {
            max_variable_size: 3,
            ..Limits::default()
        };
        // "é" is 2 bytes; "éé" is 4 bytes, so a 3-byte cut lands mid-character.
        let value = "é é";
        let truncated = limits.truncate_variable(value);
        assert!(truncated.len() <= 3);
        assert!(value.starts_with(truncated));
    }

    #[test]
    fn default_caps_match_rfc5229_minimums() {
        let limits = Limits::default();
        assert!(limits.max_scope_size >= 128);
        assert!(limits.max_match_values >= 9);
    }
}
