//! Query-time retrieval: semantic seeding, bounded subgraph loading,
//! cycle-safe path enumeration, and deterministic sentence synthesis.
//!
//! Everything here is read-only over the Graph Store and safe to run
//! concurrently for simultaneous queries.

pub mod citation;
pub mod paths;
pub mod search;
pub mod seed;
pub mod subgraph;
pub mod synthesize;

pub use citation::{citation_search, CitationResult};
pub use paths::{ancestor_paths, descendant_paths, GraphPath};
pub use search::search_and_explain;
pub use seed::find_seeds;
pub use subgraph::{load_subgraph, SubgraphSnapshot};
pub use synthesize::synthesize_path;
