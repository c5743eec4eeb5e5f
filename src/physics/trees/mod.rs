pub mod node;
pub mod tree;
pub mod tree_binned_builder;
pub mod tree_intertree_queries;
pub mod tree_self_queries;
pub mod tree_volume_query;

pub use tree::Tree;
pub use tree_self_queries::OverlapHandler;
