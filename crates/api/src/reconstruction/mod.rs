//! Reconstruction orchestration service.
//!
//! The [`orchestrator::ReconstructionOrchestrator`] ties together the core
//! workspace, graph, process and artifact modules into the single sequential
//! flow one upload request goes through.

pub mod orchestrator;
