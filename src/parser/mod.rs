pub mod driver;
pub mod tree;

pub use driver::{LL1Parser, ParseOutcome};
pub use tree::{Node, NodeId, SyntaxTree};
