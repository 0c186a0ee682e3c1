//! Turning form values into the exact payload an upstream model expects.
//!
//! The pipeline is: flatten a stray `{"input": {...}}` envelope, resolve
//! the model id, merge defaults with the caller's values, branch per
//! model family, and emit upstream-cased field names. Shaping never
//! fails past id resolution; fields with no upstream mapping are
//! silently dropped.

pub mod alias;
pub mod casing;
pub mod family;
pub mod shape;

pub use alias::resolve_model_id;
pub use casing::{camel_to_snake, snake_to_camel};
pub use family::{ModelFamily, NamingConvention};
pub use shape::{flatten_envelope, shape_request, ShapedRequest};
