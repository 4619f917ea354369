pub mod call_type;
pub mod error;
pub mod filters;
pub mod query;
pub mod requests;
pub mod responses;


pub use call_type::CallType;
pub use error::{Result, SearchError};
pub use filters::{FilterClause, FilterExpression};
pub use query::SearchQuery;
pub use requests::{IndexOperation, IndexQuery, MultiQueryRequest, MultiQueryStrategy, SearchRequestBody};
pub use responses::{
    FacetCounts, MultiQueryResponse, SearchResponse, TaskHandle, TaskInfo, TaskStatusResponse,
};
