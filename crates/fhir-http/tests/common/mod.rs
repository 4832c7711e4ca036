//! Common test utilities for the FHIR HTTP adapter.
//!
//! This module provides test infrastructure including:
//!
//! - [`harness`] - In-memory interaction handler and test server
//! - [`fixtures`] - Test data fixtures
//! - [`assertions`] - HTTP response assertions

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;
pub mod harness;
