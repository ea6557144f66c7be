use thiserror::Error;

/// The outcome of a single VM operation.
///
/// `Ok(())` stands for the implicit `OK — continue` case; everything else
/// that is not a plain boolean test result is one of these variants. This is
/// the error type operations propagate with `?`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Failure {
    /// A test failed, or an action refused to commit. Non-fatal: the
    /// interpreter continues unless the enclosing command is non-recoverable.
    #[error("operation failed")]
    Failure,

    /// The bytecode violated an invariant: unknown opcode, truncated
    /// operand, out-of-range index. Fatal, aborts the execution.
    #[error("bytecode is corrupt: {0}")]
    BinCorrupt(String),

    /// A transient backend error (mail store, SMTP). The caller may retry
    /// the whole execution.
    #[error("temporary backend failure: {0}")]
    TempFailure(String),

    /// Cumulative resource usage (CPU, memory, a configured limit) was
    /// exceeded. Fatal for this execution.
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),

    /// The implicit `keep` could not be applied. Treated as a failure of the
    /// whole execution.
    #[error("implicit keep failed: {0}")]
    KeepFailed(String),
}

impl Failure {
    /// Whether this failure is fatal to the current execution (as opposed to
    /// the failure of a single action, which the interpreter can continue
    /// past toward implicit keep).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Failure::Failure)
    }
}

pub type VmResult<T> = Result<T, Failure>;
