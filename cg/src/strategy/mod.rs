//! Retrieval/generation strategies
//!
//! A strategy is a retrieval+generation policy with a cost/quality
//! tradeoff. Strategies implement a shared capability trait and are looked
//! up from a table, never dispatched through conditionals.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backends::{BackendError, DocumentIndex, LiveSearch, RetrievedDocument, TextGenerator};
use crate::config::GeneratorConfig;
use crate::domain::ContentRequest;

mod adaptive;
mod advanced;
mod graph;
mod prompts;
mod simple;

pub use adaptive::AdaptiveStrategy;
pub use advanced::AdvancedStrategy;
pub use graph::GraphStrategy;
pub use simple::SimpleStrategy;

/// The four strategy tags
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Simple,
    Advanced,
    Graph,
    Adaptive,
}

/// Refinement walks this sequence; Adaptive sits outside it
pub const REFINEMENT_CYCLE: [Strategy; 3] = [Strategy::Simple, Strategy::Advanced, Strategy::Graph];

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Simple => "simple",
            Strategy::Advanced => "advanced",
            Strategy::Graph => "graph",
            Strategy::Adaptive => "adaptive",
        }
    }

    /// Position in the refinement cycle; Adaptive maps to the start
    fn cycle_position(&self) -> usize {
        REFINEMENT_CYCLE.iter().position(|s| s == self).unwrap_or(0)
    }

    /// One step toward more elaborate strategies, saturating at Graph
    pub fn advance(&self) -> Strategy {
        let pos = self.cycle_position();
        REFINEMENT_CYCLE[(pos + 1).min(REFINEMENT_CYCLE.len() - 1)]
    }

    /// One step toward cheaper strategies, saturating at Simple
    pub fn retreat(&self) -> Strategy {
        let pos = self.cycle_position();
        REFINEMENT_CYCLE[pos.saturating_sub(1)]
    }

    /// Next strategy in the cycle, wrapping
    pub fn next_cyclic(&self) -> Strategy {
        let pos = self.cycle_position();
        REFINEMENT_CYCLE[(pos + 1) % REFINEMENT_CYCLE.len()]
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability contract every strategy implements
#[async_trait]
pub trait GenerationStrategy: Send + Sync {
    /// Which tag this implementation carries
    fn name(&self) -> Strategy;

    /// Retrieve ranked reference snippets for an artifact
    async fn retrieve(&self, query: &str, artifact: &str, top_k: usize) -> Result<Vec<RetrievedDocument>, BackendError>;

    /// Generate artifact text from the query and retrieved references
    ///
    /// `extra_context` carries the primary artifact during secondary
    /// generation, and prior content plus feedback during refinement.
    async fn generate(
        &self,
        query: &str,
        docs: &[RetrievedDocument],
        artifact: &str,
        request: &ContentRequest,
        extra_context: Option<&str>,
    ) -> Result<String, BackendError>;
}

/// Lookup table from strategy tag to implementation
pub struct StrategySet {
    strategies: HashMap<Strategy, Arc<dyn GenerationStrategy>>,
}

impl StrategySet {
    /// Build an empty set; callers register implementations
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Build the full table over the given collaborators
    pub fn full(
        generator: Arc<dyn TextGenerator>,
        index: Arc<dyn DocumentIndex>,
        live_search: Arc<dyn LiveSearch>,
        config: &GeneratorConfig,
    ) -> Self {
        debug!("StrategySet::full: building strategy table");
        Self::new()
            .with(Arc::new(SimpleStrategy::new(generator.clone(), index.clone(), config)))
            .with(Arc::new(AdvancedStrategy::new(
                generator.clone(),
                index.clone(),
                live_search.clone(),
                config,
            )))
            .with(Arc::new(GraphStrategy::new(generator.clone(), index.clone(), config)))
            .with(Arc::new(AdaptiveStrategy::new(generator, index, live_search, config)))
    }

    /// Register an implementation under its own tag
    pub fn with(mut self, strategy: Arc<dyn GenerationStrategy>) -> Self {
        self.strategies.insert(strategy.name(), strategy);
        self
    }

    /// Look up an implementation
    pub fn get(&self, strategy: Strategy) -> Option<Arc<dyn GenerationStrategy>> {
        self.strategies.get(&strategy).cloned()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for StrategySet {
    fn default() -> Self {
        Self::new()
    }
}
