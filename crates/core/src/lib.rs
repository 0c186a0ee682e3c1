//! Pure domain logic for the easel gateway.
//!
//! Everything in this crate is synchronous and free of I/O: the model
//! catalog and its lookup/validation surface, form schema generation,
//! the form session state machine, request shaping for the upstream
//! inference API, and response normalization. The HTTP layers
//! (`easel-api`, `easel-fal`) call into these modules.

pub mod category;
pub mod descriptor;
pub mod error;
pub mod form;
pub mod registry;
pub mod response;
pub mod shaping;
pub mod types;
