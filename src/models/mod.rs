//! # Batch Search Models
//!
//! Plain data types shared by the runner, the result store and the search
//! backend. Persistence mapping lives behind the `ResultStore` trait.

pub mod batch_search;
pub mod search_hit;
pub mod user;

pub use batch_search::{BatchQuery, BatchSearch, SearchFailure, SearchOptions};
pub use search_hit::{BatchSearchResult, SearchHit};
pub use user::User;
