//! Search Module
//!
//! Web search used as the fallback retrieval tool when the local vector
//! index has nothing useful. Backed by SerpAPI's Google Light engine.

pub mod serpapi;

pub use serpapi::{SerpApiClient, WebResult, SearchError};
