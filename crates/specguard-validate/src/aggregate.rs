//! Folding evaluator violations into per-field errors.

use crate::error::{FieldError, Violation};
use crate::location::Location;

/// Merge `violations` into `existing`, one record per `(field, location)`.
///
/// A violation whose field already has a record in the same location appends
/// its message and kind to that record; otherwise a new record is added at the
/// end. Arrival order is preserved both across and within records.
pub fn aggregate<'a, I>(
    existing: &'a mut Vec<FieldError>,
    violations: I,
    location: Location,
) -> &'a mut Vec<FieldError>
where
    I: IntoIterator<Item = Violation>,
{
    for violation in violations {
        match existing
            .iter_mut()
            .find(|e| e.field == violation.path && e.location == location)
        {
            Some(record) => record.push(violation.message, violation.kind),
            None => existing.push(FieldError::new(
                violation.path,
                location,
                violation.message,
                violation.kind,
            )),
        }
    }
    existing
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn merges_same_field() {
        let mut errors = Vec::new();
        aggregate(
            &mut errors,
            vec![
                Violation::new("name", "\"name\" length must be at least 3 characters long", "string.min"),
                Violation::new("name", "\"name\" must be a valid email", "string.email"),
            ],
            Location::Body,
        );

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].types, ["string.min", "string.email"]);
    }

    #[test]
    fn same_field_in_different_locations_stays_separate() {
        let mut errors = Vec::new();
        aggregate(&mut errors, vec![Violation::new("id", "a", "x")], Location::Query);
        aggregate(&mut errors, vec![Violation::new("id", "b", "y")], Location::Params);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].location, Location::Query);
        assert_eq!(errors[1].location, Location::Params);
    }

    #[test]
    fn empty_batch_is_noop() {
        let mut errors = vec![FieldError::new("a", Location::Body, "m", "k")];
        let before = errors.clone();
        aggregate(&mut errors, Vec::new(), Location::Body);
        assert_eq!(errors, before);
    }

    proptest! {
        #[test]
        fn one_record_per_field(fields in proptest::collection::vec("[a-c]", 0..20)) {
            let mut errors = Vec::new();
            let violations: Vec<_> = fields.iter().map(|f| Violation::new(f.clone(), "m", "k")).collect();
            aggregate(&mut errors, violations, Location::Body);

            let mut seen = std::collections::HashSet::new();
            for record in &errors {
                prop_assert!(seen.insert(record.field.clone()));
                prop_assert_eq!(record.messages.len(), record.types.len());
            }
            let total: usize = errors.iter().map(|e| e.messages.len()).sum();
            prop_assert_eq!(total, fields.len());
        }
    }
}
