//! Form schema derivation and the form session state machine.

pub mod engine;
pub mod schema;

pub use engine::{FormEngine, FormPhase, SubmitDecision};
pub use schema::{
    build_form_schema, default_form_state, FieldConfig, FieldType, FieldValidation, FormSchema,
    FormSection, FormState,
};
