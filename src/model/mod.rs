//! Models: owners of actions and their public facade.
//!
//! A model type implements [`ProtoModel`], embeds a [`Registry`] and
//! declares which of its methods are actions in a [`Schema`]. Wrapping an
//! owner into a [`Model`] validates that declaration; afterwards the facade
//! hands out one cached action per definition.

mod facade;
mod proto;
mod registry;
mod schema;

pub use facade::Model;
pub use proto::{ModelFactory, ProtoModel};
pub use registry::{ModelId, Registry, StateFlags};
pub use schema::{Schema, SchemaBuilder};
