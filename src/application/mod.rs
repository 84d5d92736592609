//! Application services layer.

pub mod error;
pub mod feed;
pub mod pagination;
pub mod repos;
pub mod votes;
