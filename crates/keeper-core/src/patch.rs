//! Partial-update builder.
//!
//! Every mutable attribute of a patch is three-state: `None` leaves the
//! column alone, `Some("")` clears it, `Some(v)` sets it. The builder turns
//! the present attributes into column assignments and pins the update to
//! one `(title, owner)` row. It never sees plaintext: sensitive values must
//! already be encrypted.

use keeper_storage::{Column, ColumnAssignment, RecordKind, RecordScope, ScopedUpdate};

/// Collects column assignments for one record.
#[derive(Debug)]
pub struct RecordPatchBuilder {
    kind: RecordKind,
    scope: RecordScope,
    values: Vec<(Column, String)>,
}

impl RecordPatchBuilder {
    /// Start an update of the record `title` owned by `owner_id`.
    #[must_use]
    pub fn new(kind: RecordKind, title: &str, owner_id: i64) -> Self {
        Self {
            kind,
            scope: RecordScope {
                owner_id,
                title: title.to_owned(),
            },
            values: Vec::new(),
        }
    }

    /// Assign `column` if `value` is present. A later call for the same
    /// column replaces the earlier value.
    #[must_use]
    pub fn set(mut self, column: Column, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.values.retain(|(c, _)| *c != column);
            self.values.push((column, value));
        }
        self
    }

    /// Finish the update. Assignments follow the kind's column order;
    /// columns that do not belong to the kind are dropped.
    #[must_use]
    pub fn build(mut self) -> ScopedUpdate {
        let mut assignments = Vec::with_capacity(self.values.len());
        for column in self.kind.mutable_columns() {
            if let Some(pos) = self.values.iter().position(|(c, _)| c == column) {
                let (column, value) = self.values.swap_remove(pos);
                assignments.push(ColumnAssignment { column, value });
            }
        }
        for (column, _) in &self.values {
            tracing::warn!(kind = %self.kind, column = column.name(), "ignoring foreign column");
        }
        ScopedUpdate {
            kind: self.kind,
            assignments,
            scope: self.scope,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use keeper_storage::{RecordPayload, StoredRecord};

    use super::*;

    fn existing() -> StoredRecord {
        StoredRecord {
            owner_id: 7,
            title: "t".into(),
            description: "d".into(),
            payload: RecordPayload::Password { secret: "a".into() },
        }
    }

    fn patched(secret: Option<&str>, description: Option<&str>) -> StoredRecord {
        let update = RecordPatchBuilder::new(RecordKind::Password, "t", 7)
            .set(Column::Secret, secret.map(str::to_owned))
            .set(Column::Description, description.map(str::to_owned))
            .build();
        let mut record = existing();
        assert!(update.apply_to(&mut record));
        record
    }

    #[test]
    fn absent_secret_and_empty_description() {
        let record = patched(None, Some(""));
        assert_eq!(record.payload, RecordPayload::Password { secret: "a".into() });
        assert_eq!(record.description, "");
    }

    #[test]
    fn new_secret_and_absent_description() {
        let record = patched(Some("b"), None);
        assert_eq!(record.payload, RecordPayload::Password { secret: "b".into() });
        assert_eq!(record.description, "d");
    }

    #[test]
    fn scope_always_pins_title_and_owner() {
        let update = RecordPatchBuilder::new(RecordKind::Card, "visa", 42).build();
        assert!(update.is_empty());
        assert_eq!(
            update.scope,
            RecordScope {
                owner_id: 42,
                title: "visa".into()
            }
        );
    }

    #[test]
    fn assignments_follow_column_order_and_skip_foreign_columns() {
        let update = RecordPatchBuilder::new(RecordKind::Card, "visa", 1)
            .set(Column::Description, Some("new".into()))
            .set(Column::Secret, Some("x".into()))
            .set(Column::Number, Some("enc".into()))
            .set(Column::Cvc, None)
            .build();
        let columns: Vec<_> = update.assignments.iter().map(|a| a.column).collect();
        assert_eq!(columns, [Column::Number, Column::Description]);
    }

    #[test]
    fn last_value_wins() {
        let update = RecordPatchBuilder::new(RecordKind::File, "f", 1)
            .set(Column::FileName, Some("a".into()))
            .set(Column::FileName, Some("b".into()))
            .build();
        assert_eq!(update.assignments.len(), 1);
        assert_eq!(update.assignments[0].value, "b");
    }
}
