//! Index maintenance
//!
//! Turns parsed change notifications into index writes:
//! 1. Resolve dependents of the changed row (fan-out)
//! 2. Load affected roots with their compiled plans
//! 3. Build documents and write them to the sink, or delete by natural key
//!
//! The store and the sink stay behind the [`Store`] and [`IndexSink`]
//! traits.

mod dispatcher;
mod errors;
mod fanout;
mod store;
mod worker;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use errors::{ProcessingError, SinkError, StoreError};
pub use fanout::{BackReference, Dependent, Fanout, FanoutResolver, ReindexRequest};
pub use store::{IndexSink, ProjectionQuery, Store};
pub use worker::Worker;
