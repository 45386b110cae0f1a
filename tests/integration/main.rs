//! Integration tests for the audit pipeline
//!
//! These tests use wiremock to stand up mock sites and exercise the full
//! submit -> queue -> worker -> cache cycle end to end.

mod audit_tests;
