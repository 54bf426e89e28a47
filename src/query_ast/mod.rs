//! Query AST: the operation tree built fresh for each request.

pub mod context;
pub mod errors;
pub mod factory;
pub mod fields;
pub mod filters;
pub mod operations;
pub mod resolve_tree;
pub mod sort;

pub use context::TranslationContext;
pub use errors::TranslationError;
pub use factory::QueryAstFactory;
pub use fields::{AggregationField, AggregationSelection, AttributeField, CypherAttributeField, Field};
pub use filters::{Filter, FilterValue, PropertyOwner, Quantifier};
pub use operations::{AuthorizationFilters, QueryOperation};
pub use resolve_tree::ResolveTree;
pub use sort::{Pagination, SortDirection, SortField};
