//! Integration tests for catalog harvesting
//!
//! These tests use wiremock to serve index and detail pages and run the
//! whole pipeline end-to-end.

mod config_tests;
mod harvest_tests;
