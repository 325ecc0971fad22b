//! Storage layer for pathsmith: the learning-path data model, database
//! configuration, connection pooling, migrations, and queries against the
//! `learning_paths` table.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
