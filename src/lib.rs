//! Per-tenant metrics reports.
//!
//! For every account in a configured roster the pipeline scopes the shared
//! database session to that tenant, runs a fixed set of metric queries,
//! reduces the rows to a small record, renders all records into an aligned
//! text table and delivers it to a chat webhook and/or a spreadsheet.

pub mod config;
pub mod db;
pub mod delivery;
pub mod metrics;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod report;

#[cfg(test)]
mod tests;
