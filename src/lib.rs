//! SkolAI: school administration with emotional check-ins, incident
//! tracking and monthly wellbeing reports.
//!
//! Records live in a local SQLite cache ([`db::LocalStore`]) that
//! synchronizes with a hosted table API ([`remote::RemoteStore`], served by
//! [`server`]). Reports are aggregated from check-ins and incidents and
//! narrated by a generative-text backend, with a local template as fallback.

pub mod aggregate;
pub mod app;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod export;
pub mod import;
pub mod models;
pub mod remote;
pub mod report;
pub mod server;
pub mod store;
