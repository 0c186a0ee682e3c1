//! The form session state machine.
//!
//! Single-threaded and synchronous: every transition validates in
//! O(field count) and returns before the caller sees the new state.
//! Per-field rules run in a fixed order (required, then declarative
//! bounds, then the custom hook) and the first failure wins, so a
//! field never carries more than one error.

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde_json::Value;

use crate::form::schema::{FieldConfig, FormSchema, FormState};

/// Key under which a form-level rule's error is reported.
pub const FORM_ERROR_KEY: &str = "form";

/// Lifecycle of one form session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    /// Untouched since creation or reset.
    Pristine,
    /// At least one field has been edited.
    Editing,
    /// A submit passed validation; awaiting the outcome.
    Submitting,
    /// The submission finished.
    Settled { success: bool },
}

/// Outcome of a submit attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitDecision {
    /// Zero errors; these values are ready for shaping.
    Proceed(FormState),
    /// Validation failed; field id to error message.
    Rejected(IndexMap<String, String>),
}

/// Optional whole-form rule evaluated on submit after per-field rules.
pub type FormRule = fn(&FormState) -> Result<(), String>;

pub struct FormEngine {
    schema: FormSchema,
    values: FormState,
    touched: IndexSet<String>,
    errors: IndexMap<String, String>,
    phase: FormPhase,
    form_rule: Option<FormRule>,
}

impl FormEngine {
    /// Start a session with the given initial values (normally the
    /// model's default form state).
    pub fn new(schema: FormSchema, initial: FormState) -> Self {
        Self {
            schema,
            values: initial,
            touched: IndexSet::new(),
            errors: IndexMap::new(),
            phase: FormPhase::Pristine,
            form_rule: None,
        }
    }

    pub fn with_form_rule(mut self, rule: FormRule) -> Self {
        self.form_rule = Some(rule);
        self
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn values(&self) -> &FormState {
        &self.values
    }

    pub fn errors(&self) -> &IndexMap<String, String> {
        &self.errors
    }

    pub fn error(&self, id: &str) -> Option<&str> {
        self.errors.get(id).map(String::as_str)
    }

    pub fn is_touched(&self, id: &str) -> bool {
        self.touched.contains(id)
    }

    /// Update a field value. Always stores the value; re-validates only
    /// fields the user has already touched, so nobody is shouted at
    /// mid-typing.
    pub fn set_value(&mut self, id: &str, value: Value) {
        self.values.insert(id.to_string(), value);
        if self.phase == FormPhase::Pristine {
            self.phase = FormPhase::Editing;
        }
        if self.touched.contains(id) {
            self.validate_field(id);
        }
    }

    /// Mark a field as touched and validate it.
    pub fn blur(&mut self, id: &str) {
        self.touched.insert(id.to_string());
        self.validate_field(id);
    }

    /// Validate the whole form. Marks every field touched; proceeds
    /// only with zero errors.
    pub fn submit(&mut self) -> SubmitDecision {
        let mut errors = IndexMap::new();
        for field in self.schema.fields() {
            self.touched.insert(field.id.clone());
            if let Some(message) = check_field(field, self.values.get(&field.id)) {
                errors.insert(field.id.clone(), message);
            }
        }
        if errors.is_empty() {
            if let Some(rule) = self.form_rule {
                if let Err(message) = rule(&self.values) {
                    errors.insert(FORM_ERROR_KEY.to_string(), message);
                }
            }
        }

        self.errors = errors.clone();
        if errors.is_empty() {
            self.phase = FormPhase::Submitting;
            SubmitDecision::Proceed(self.values.clone())
        } else {
            self.phase = FormPhase::Editing;
            SubmitDecision::Rejected(errors)
        }
    }

    /// Record the submission outcome. Only meaningful while submitting.
    pub fn finish(&mut self, success: bool) {
        if self.phase == FormPhase::Submitting {
            self.phase = FormPhase::Settled { success };
        }
    }

    /// Back to pristine with fresh values.
    pub fn reset(&mut self, defaults: FormState) {
        self.values = defaults;
        self.touched.clear();
        self.errors.clear();
        self.phase = FormPhase::Pristine;
    }

    fn validate_field(&mut self, id: &str) {
        let Some(field) = self.schema.field(id) else {
            return;
        };
        match check_field(field, self.values.get(id)) {
            Some(message) => {
                self.errors.insert(id.to_string(), message);
            }
            None => {
                self.errors.shift_remove(id);
            }
        }
    }
}

/// Run one field's rules in order; first failure wins.
fn check_field(field: &FieldConfig, value: Option<&Value>) -> Option<String> {
    let Some(value) = value.filter(|v| !value_is_empty(v)) else {
        return field
            .required
            .then(|| format!("{} is required", field.label));
    };

    let rules = &field.validation;
    if let Value::String(s) = value {
        let len = s.chars().count();
        if let Some(min) = rules.min_len {
            if len < min {
                return Some(format!("{} must be at least {min} characters", field.label));
            }
        }
        if let Some(max) = rules.max_len {
            if len > max {
                return Some(format!("{} must be at most {max} characters", field.label));
            }
        }
        if let Some(pattern) = rules.pattern {
            if let Ok(re) = Regex::new(pattern) {
                if !re.is_match(s) {
                    return Some(format!("{} has an invalid format", field.label));
                }
            }
        }
    }
    if let Some(number) = value.as_f64() {
        if let Some(min) = rules.min {
            if number < min {
                return Some(format!("{} must be at least {min}", field.label));
            }
        }
        if let Some(max) = rules.max {
            if number > max {
                return Some(format!("{} must be at most {max}", field.label));
            }
        }
    }
    if let Some(custom) = rules.custom {
        if let Err(message) = custom(value) {
            return Some(message);
        }
    }
    None
}

/// Null, blank strings, and empty arrays count as "not provided".
fn value_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/* --------------------------------------------------------------------------
   Tests
   -------------------------------------------------------------------------- */
