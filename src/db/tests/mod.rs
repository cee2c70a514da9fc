//! Metric store integration tests.
//!
//! These run against a real PostgreSQL started with testcontainers, so they
//! are ignored by default:
//!
//! ```bash
//! cargo test                       # Unit tests only
//! cargo test -- --ignored          # PostgreSQL integration tests (requires Docker)
//! cargo test -- --include-ignored  # Everything
//! ```
