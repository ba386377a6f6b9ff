//! Core domain models for the course runner
//!
//! This module defines the course identifier, the resolved request handed
//! to the pipeline, harness configuration and the run outcome.

pub mod config;
pub mod course;
pub mod outcome;
pub mod request;
pub mod state;

pub use course::*;
pub use outcome::*;
pub use request::*;
pub use state::*;
