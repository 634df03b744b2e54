use thiserror::Error;

/// Failures raised by the document-store adapter.
///
/// The first four variants mark structurally invalid calls — a correct caller
/// never triggers them. `Backend` wraps driver failures from the storage
/// engine itself.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("'{0}' is not a valid collection")]
    InvalidCollection(String),

    #[error("invalid document payload: supply a document or an array of documents")]
    InvalidDocumentShape,

    #[error("invalid conditions: supply an equality-filter document or the all-documents selector")]
    InvalidConditions,

    #[error("invalid update arguments: supply non-empty condition and update documents")]
    InvalidUpdateArguments,

    #[error("stored document is missing its object id")]
    MissingId,

    #[error(transparent)]
    Backend(#[from] mongodb::error::Error),
}

/// Failures raised by the authoring and assessment services.
///
/// `SchemaViolation`, `Unauthorized`, `NotEligible` and `MalformedInput` are
/// routine business outcomes: the caller asked for something the rules do not
/// permit and nothing was mutated. `NotFound`, the codec variants and `Store`
/// indicate a broken call or broken data.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("requester is not the author of this document")]
    Unauthorized,

    #[error("student is not in the required test state")]
    NotEligible,

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("no matching document")]
    NotFound,

    #[error("stored document could not be decoded: {0}")]
    Decode(#[from] mongodb::bson::de::Error),

    #[error("document could not be encoded: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// True for the expected, routine rule violations (ineligible student,
    /// rejected field, bad submission); false for structural or backend
    /// failures that a correct caller should never see.
    pub fn is_business_outcome(&self) -> bool {
        matches!(
            self,
            ServiceError::SchemaViolation(_)
                | ServiceError::Unauthorized
                | ServiceError::NotEligible
                | ServiceError::MalformedInput(_)
        )
    }
}
