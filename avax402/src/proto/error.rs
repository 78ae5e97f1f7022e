//! Schema validation errors raised while decoding wire messages.

/// A request body failed structural validation.
///
/// `field` is the dotted path of the offending value, such as
/// `paymentPayload.payload.authorization.nonce`. Malformed JSON and non-object
/// bodies are reported at path `$`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid field `{field}`: {reason}")]
pub struct SchemaError {
    /// Dotted path to the field that failed validation.
    pub field: String,
    /// What was wrong with it.
    pub reason: String,
}

impl SchemaError {
    /// Path used for failures that precede any field, such as unparsable JSON.
    pub const ROOT: &'static str = "$";

    /// Creates a schema error for `field`.
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a schema error at the document root.
    pub fn root(reason: impl Into<String>) -> Self {
        Self::new(Self::ROOT, reason)
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(value: serde_json::Error) -> Self {
        Self::root(value.to_string())
    }
}
