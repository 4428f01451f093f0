//! Query compilation.

use crate::config::CompilerConfig;
use crate::error::{CompileError, Result};
use crate::evaluator::Evaluator;
use crate::matchers::build_function_set;
use crate::path::IndexAllocator;
use crate::render::{render_program, FieldPlan};
use boolpolicy_engine::{EvaluatorBackend, RuleEngine};
use boolpolicy_types::{Query, SchemaResolver};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Compile `query` with the default configuration and the built-in engine.
pub fn compile<R: SchemaResolver + ?Sized>(query: &Query, resolver: &R) -> Result<Evaluator> {
    Compiler::new(CompilerConfig::default()).compile(query, resolver)
}

/// Compiles queries into evaluators on a given backend.
#[derive(Debug, Clone)]
pub struct Compiler<B: EvaluatorBackend = RuleEngine> {
    config: CompilerConfig,
    backend: Arc<B>,
}

impl Compiler<RuleEngine> {
    /// Compiler on the built-in engine, bounded by `config.max_frames`.
    pub fn new(config: CompilerConfig) -> Self {
        let engine = match config.max_frames {
            Some(max) => RuleEngine::new().with_max_frames(max),
            None => RuleEngine::new(),
        };
        Self::with_backend(config, engine)
    }
}

impl Default for Compiler<RuleEngine> {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

impl<B: EvaluatorBackend> Compiler<B> {
    pub fn with_backend(config: CompilerConfig, backend: B) -> Self {
        Self {
            config,
            backend: Arc::new(backend),
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn compile<R: SchemaResolver + ?Sized>(
        &self,
        query: &Query,
        resolver: &R,
    ) -> Result<Evaluator<B>> {
        if query.is_empty() {
            return Err(CompileError::EmptyQuery);
        }

        let mut allocator = IndexAllocator::default();
        let mut fields = Vec::with_capacity(query.len());

        for (position, field_query) in query.field_queries.iter().enumerate() {
            let meta = resolver
                .resolve(&field_query.field)
                .ok_or_else(|| CompileError::FieldNotFound(field_query.field.clone()))?;
            let path = allocator.access_path(&meta);
            let set = build_function_set(position, field_query, &meta.leaf, &self.config)?;

            debug!(
                field = %field_query.field,
                path = %path,
                leaf = %meta.leaf,
                functions = set.functions.len(),
                alternatives = set.alternatives.len(),
                "Resolved field"
            );

            fields.push(FieldPlan {
                label: field_query.field.clone(),
                path,
                set,
            });
        }

        let sizes: Vec<usize> = fields.iter().map(|f| f.set.alternatives.len()).collect();
        let count = sizes
            .iter()
            .try_fold(1usize, |acc, n| acc.checked_mul(*n))
            .unwrap_or(usize::MAX);
        if count > self.config.max_rules {
            return Err(CompileError::TooManyRules {
                count,
                limit: self.config.max_rules,
            });
        }

        let combinations = cross_product(&sizes);
        if combinations.is_empty() {
            warn!(fields = fields.len(), "Query compiled to zero rules and will never match");
        }

        let source = render_program(&self.config.package, &fields, &combinations)?;
        let prepared = self.backend.prepare(&source)?;

        info!(
            fields = fields.len(),
            rules = combinations.len(),
            "Compiled policy evaluator"
        );

        Ok(Evaluator::new(
            Arc::clone(&self.backend),
            prepared,
            source,
            combinations.len(),
        ))
    }
}

/// Every way of choosing one index below `sizes[i]` for each position, in
/// lexicographic order. Any zero size yields no combinations.
fn cross_product(sizes: &[usize]) -> Vec<Vec<usize>> {
    if sizes.iter().any(|&n| n == 0) {
        return Vec::new();
    }
    let mut combinations: Vec<Vec<usize>> = vec![Vec::with_capacity(sizes.len())];
    for &n in sizes {
        combinations = combinations
            .into_iter()
            .flat_map(|prefix| {
                (0..n).map(move |i| {
                    let mut next = prefix.clone();
                    next.push(i);
                    next
                })
            })
            .collect();
    }
    combinations
}
