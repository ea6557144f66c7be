//! The interpreter's mutable execution state.

use sieve_types::{Failure, Limits, ResultSet};

use crate::extensions::include::IncludeTable;
use crate::variables::Scope;

/// A `(block_id, offset)` program counter. `block_id` indexes
/// [`crate::binary::Binary::blocks`] (0 = main program, 1.. = `include`d
/// scripts compiled into the same binary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramCounter {
    pub block: usize,
    pub offset: usize,
}

/// Everything one interpreter frame needs that isn't shared with its
/// parent/children: independent PC and local scope per sub-interpreter,
/// shared `Result` accumulator and global scope.
pub struct RuntimeEnv<'a> {
    pub limits: &'a Limits,
    pub test_result: bool,
    pub match_values: Vec<String>,
    pub scope: Scope,
    pub result: ResultSet,
    pub interrupted: bool,
    pub include_depth: u32,
    pub include_count_budget: u32,
    pub include_once: IncludeTable,
}

impl<'a> RuntimeEnv<'a> {
    pub fn new(limits: &'a Limits) -> Self {
        Self {
            limits,
            test_result: false,
            match_values: Vec::new(),
            scope: Scope::new(),
            result: ResultSet::new(),
            interrupted: false,
            include_depth: 0,
            include_count_budget: limits.max_includes,
            include_once: IncludeTable::new(),
        }
    }

    pub fn check_interrupted(&self) -> Result<(), Failure> {
        if self.interrupted {
            Err(Failure::TempFailure("interpreter was interrupted".to_string()))
        } else {
            Ok(())
        }
    }

    pub fn match_value(&self, index: usize) -> &str {
        self.match_values.get(index.wrapping_sub(1)).map(|s| s.as_str()).unwrap_or("")
    }
}
