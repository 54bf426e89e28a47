use super::filters::PropertyOwner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// `@cypher` scalar used as a sort key; evaluated in a subquery before
/// ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct CypherSortSource {
    pub statement: String,
    pub column_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortField {
    pub owner: PropertyOwner,
    /// Declared field name; also the key it is projected under
    pub field: String,
    pub property: String,
    pub direction: SortDirection,
    pub cypher: Option<CypherSortSource>,
}

/// Row window: `offset`/`limit`, or a connection's `after`/`first`
/// translated to the same numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl Pagination {
    pub fn is_empty(&self) -> bool {
        self.offset.is_none() && self.limit.is_none()
    }
}
