//! # jobq
//!
//! Durable job queue on Postgres.
//!
//! Clients submit JSON payloads (duplicates of unfinished jobs are collapsed),
//! a pool of workers claims them with `FOR UPDATE SKIP LOCKED` so no job is
//! ever in flight twice, and clients poll for status.

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod queue;
pub mod store;
pub mod telemetry;
pub mod worker;
