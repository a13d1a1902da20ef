pub mod assembler;
pub mod compiler;
pub mod criteria;
pub mod geo;
pub mod hierarchy;
pub mod limits;
pub mod relationship;

pub use assembler::ResultAssembler;
pub use compiler::QueryCompiler;
pub use criteria::CriterionBuilders;
pub use geo::GeoShapeBuilder;
pub use hierarchy::ItemHierarchyResolver;
pub use limits::QueryChecks;
pub use relationship::{RelationshipKey, RelationshipTraversalEngine};
