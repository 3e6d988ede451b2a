//! Client for the remote search service's SOAP interface.

mod client;
pub(crate) mod decode;
pub(crate) mod envelope;
pub mod types;

pub use client::{SoapClient, SoapError};
pub use types::{
    Exchange, QueryClause, RangeBound, RangeFilter, ResultItem, SearchRequest, SearchResponse,
};
