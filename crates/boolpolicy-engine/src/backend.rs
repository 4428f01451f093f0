//! The pluggable evaluator seam used by the compiler.

use crate::error::Result;
use crate::exec::execute;
use crate::parser::parse;
use crate::prepare::{prepare, PreparedProgram};
use serde_json::Value;
use tracing::debug;

/// A backend that can prepare rendered program text once and then execute it
/// any number of times, concurrently, against JSON input documents.
///
/// `execute` returns the outer result sets of one run. Each inner entry is a
/// JSON object mapping each emitted label to the list of values bound to it.
pub trait EvaluatorBackend: Send + Sync {
    type Prepared: Send + Sync;

    fn prepare(&self, source: &str) -> Result<Self::Prepared>;

    fn execute(&self, prepared: &Self::Prepared, input: &Value) -> Result<Vec<Vec<Value>>>;
}

/// The built-in rule engine.
///
/// Executions are unbounded unless a frame budget is set. A run that exceeds
/// its budget fails with [`EngineError::Execution`](crate::EngineError::Execution)
/// rather than returning partial results.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    max_frames: Option<usize>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the number of path frames one execution may visit.
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    pub fn max_frames(&self) -> Option<usize> {
        self.max_frames
    }
}

impl EvaluatorBackend for RuleEngine {
    type Prepared = PreparedProgram;

    fn prepare(&self, source: &str) -> Result<PreparedProgram> {
        let program = parse(source)?;
        let prepared = prepare(&program)?;
        debug!(
            package = %prepared.package(),
            functions = prepared.function_count(),
            rules = prepared.rule_count(),
            "Program prepared"
        );
        Ok(prepared)
    }

    /// All rules contribute to a single result set.
    fn execute(&self, prepared: &PreparedProgram, input: &Value) -> Result<Vec<Vec<Value>>> {
        let bindings = execute(prepared, input, self.max_frames)?;
        Ok(vec![bindings])
    }
}
