//! Dialect-aware bulk loading of tabular data into SQL databases.
//!
//! The pipeline is: a [`source`] produces a [`table::DataTable`], [`infer`]
//! optionally types its columns, [`sqlgen`] renders DDL and values for a
//! [`dialect::Dialect`], and [`insert`] runs the batched, transactional
//! inserts over an [`access::Connection`].

pub mod access;
pub mod compare;
pub mod config;
pub mod debug_log;
pub mod dialect;
pub mod error;
pub mod infer;
pub mod insert;
pub mod source;
pub mod sqlgen;
pub mod table;

pub use config::LoadConfig;
pub use dialect::Dialect;
pub use error::{LoadError, Result};
pub use table::{Column, ColumnKind, DataTable, Value};
