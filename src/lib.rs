//! searchsync - keeps a search index in sync with a relational database
//!
//! Change notifications arrive from a message broker. Each one is routed
//! through a retry state machine, resolved to the documents it affects
//! (directly or through foreign key fan-out), and those documents are
//! re-materialized with precompiled eager-load plans.

pub mod amqp;
pub mod boot;
pub mod cli;
pub mod config;
pub mod entity;
pub mod indexer;
pub mod observability;
pub mod planner;
pub mod schema;
pub mod testing;
