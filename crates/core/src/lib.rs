//! Photogrammetry job orchestration domain logic.
//!
//! Everything here is HTTP-agnostic: session workspaces, the typed job graph
//! handed to the reconstruction tool, subprocess management for the external
//! tools, and collection of the artifacts they leave behind.

pub mod artifacts;
pub mod error;
pub mod graph;
pub mod job;
pub mod process;
pub mod types;
pub mod workspace;
