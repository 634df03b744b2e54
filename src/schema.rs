//! Declarative field tables for the document kinds the engine persists.
//!
//! A registry answers two questions: which kinds exist, and which fields a
//! kind declares (and whether each is required). The authoring service uses
//! the tables to filter create payloads and to vet single-field updates; the
//! typed models in [`crate::models`] mirror the same field lists.

/// Whether a declared field must be present at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
}

/// An ordered table of `(kind, fields)` entries. Purely declarative.
#[derive(Debug)]
pub struct SchemaRegistry {
    kinds: &'static [(&'static str, &'static [(&'static str, Requirement)])],
}

impl SchemaRegistry {
    /// Names of every registered kind.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.kinds.iter().map(|(name, _)| *name)
    }

    /// The ordered field table for `kind`, or `None` for an unknown kind.
    pub fn fields(&self, kind: &str) -> Option<&'static [(&'static str, Requirement)]> {
        self.kinds
            .iter()
            .find(|(name, _)| *name == kind)
            .map(|(_, fields)| *fields)
    }

    /// Whether `kind` declares `field` at all.
    pub fn declares(&self, kind: &str, field: &str) -> bool {
        self.fields(kind)
            .is_some_and(|fields| fields.iter().any(|(name, _)| *name == field))
    }
}

use Requirement::{Optional, Required};

/// Field tables for question documents.
pub static QUESTION_SCHEMAS: SchemaRegistry = SchemaRegistry {
    kinds: &[(
        "boolean",
        &[
            ("schema", Required),
            ("author", Required),
            ("name", Required),
            ("statement", Required),
            ("singleAnswer", Required),
            ("feedback", Required),
            ("taken", Optional),
        ],
    )],
};

/// Field tables for test documents. Disjoint from the question tables apart
/// from the shared envelope fields.
pub static TEST_SCHEMAS: SchemaRegistry = SchemaRegistry {
    kinds: &[(
        "standard",
        &[
            ("schema", Required),
            ("author", Required),
            ("questions", Required),
            ("available", Optional),
            ("taken", Optional),
        ],
    )],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_registry_lists_boolean_kind() {
        let names: Vec<_> = QUESTION_SCHEMAS.names().collect();
        assert_eq!(names, vec!["boolean"]);
    }

    #[test]
    fn boolean_kind_field_table_is_ordered() {
        let fields = QUESTION_SCHEMAS.fields("boolean").unwrap();
        assert_eq!(fields[0], ("schema", Required));
        assert_eq!(fields[4], ("singleAnswer", Required));
        assert_eq!(fields[6], ("taken", Optional));
    }

    #[test]
    fn unknown_kind_has_no_fields() {
        assert!(QUESTION_SCHEMAS.fields("multiple-choice").is_none());
        assert!(TEST_SCHEMAS.fields("adaptive").is_none());
    }

    #[test]
    fn declares_checks_single_fields() {
        assert!(TEST_SCHEMAS.declares("standard", "questions"));
        assert!(!TEST_SCHEMAS.declares("standard", "statement"));
        assert!(!TEST_SCHEMAS.declares("adaptive", "questions"));
    }
}
