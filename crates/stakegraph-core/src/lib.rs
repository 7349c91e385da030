//! stakegraph-core library.
//!
//! Stakeholders (organizations and people) live in a relational store next to
//! a flat `stakeholder_relation` edge table. [`db::query`] reconstructs
//! parent, child and related sets one hop at a time; [`service`] pairs every
//! entity mutation with its edge mutation inside one transaction opened on a
//! [`session::Session`].
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for read paths and typed
//!   [`error::WriteError`] for transactional writes.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod service;
pub mod session;
