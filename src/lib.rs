//! Battery Leads API Library
//!
//! Backend for the battery retailer's site: public lead capture with
//! priority scoring and spreadsheet export, plus bulk import of
//! vehicle-to-battery compatibility data from CSV.
//!
//! # Modules
//!
//! - `api`: Router and HTTP handlers.
//! - `core`: Scoring, intake and import logic.
//! - `data`: Data access layer.
//! - `integrations`: External service integrations.
//! - `obs`: Log redaction helpers.
//! - `config`: Configuration management.
//! - `csv_parser`: Quote-aware CSV tokenizer.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Lead and vehicle stores (Postgres and in-memory).
//! - `errors`: Error handling types.
//! - `handlers`: Lead HTTP handlers and shared state.
//! - `intake`: Lead intake pipeline.
//! - `models`: Core data models.
//! - `scoring`: Lead priority scoring.
//! - `sheets_client`: Lead export to the sales spreadsheet.
//! - `vehicle_handler`: Vehicle HTTP handlers.
//! - `vehicle_import`: Vehicle CSV import pipeline.

pub mod api;
pub mod core;
pub mod data;
pub mod integrations;
pub mod obs;

// Re-export primary modules for shared use in tests and other binaries
pub mod config;
pub mod csv_parser;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod handlers;
pub mod intake;
pub mod models;
pub mod scoring;
pub mod sheets_client;
pub mod vehicle_handler;
pub mod vehicle_import;
