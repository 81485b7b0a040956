// ==============================================================================
// lib.rs - Variant Annotation Store Library
// ==============================================================================
// Description: Library interface for building and reading variant annotation stores
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

pub mod builder;
pub mod clinvar;
pub mod ingest;
pub mod manifest;
pub mod merge;
pub mod models;
pub mod parsers;
pub mod resource;
pub mod sinks;
pub mod store;
pub mod structural;
