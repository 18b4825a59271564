pub mod export;
pub mod suggestions;
pub mod traversal;
pub mod tree;
pub mod validator;

pub use export::FamilyGraph;
pub use suggestions::SuggestionEngine;
pub use traversal::{ConnectionPath, ConnectivityChecker, PathStep};
pub use tree::{FamilyTree, TreeOptions};
pub use validator::{ProposedEdge, RelationshipValidator, ValidatorOptions, Verdict};
