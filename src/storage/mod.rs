//! Storage module for in-flight harvest results
//!
//! Nothing is persisted across runs; each run owns a fresh [`ResultStore`]
//! that its workers write into and that the coordinator drains in catalog
//! order once fetching is complete.

mod result_store;

pub use result_store::ResultStore;
