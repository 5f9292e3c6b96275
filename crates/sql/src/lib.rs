#![doc = include_str!("../README.md")]

//! # SQL Service
//!
//! This crate defines the executor collaborator used by `trellis-orm`: the
//! values bound into and read out of statements, and the [`Connection`] trait
//! a backend implements to run them.

#![forbid(unsafe_code)]

mod connection;
pub mod sqlite;
mod types;

pub use crate::connection::{Backend, Connection, ExecOutcome, FromEnv, FutureResult};
pub use crate::sqlite::{ConnectOptions, SqlDefault};
pub use crate::types::{Column, DataType, FetchMode, Field, RawRow, Row};
