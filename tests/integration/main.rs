//! Integration tests for Catalog-Sentinel
//!
//! These tests use wiremock to serve a miniature catalog and a temp-file
//! SQLite store to exercise discovery, retries, change detection and the
//! crawl-only path end-to-end.

mod catalog;
mod detection_tests;
mod discovery_tests;
mod store_failure_tests;
