//! Row scanning
//!
//! Returned columns are bound to fields by name. When a cursor reports
//! anonymous columns (any empty name), binding falls back to position: the
//! n-th column goes to the n-th mapped field, and the column count must equal
//! the field count. Either way the cursor is closed before returning.

use super::codec;
use super::error::{MapperError, Result};
use super::querier::Rows;
use super::record::Record;
use super::schema::{resolve, Schema};
use super::value::DatabaseValue;

/// Target field index for each returned column; `None` for unmatched columns
fn bind_columns(schema: &Schema, columns: &[String]) -> Result<Vec<Option<usize>>> {
    if columns.iter().any(String::is_empty) {
        if columns.len() != schema.len() {
            return Err(MapperError::ColumnCountMismatch {
                expected: schema.len(),
                actual: columns.len(),
            });
        }
        return Ok((0..columns.len()).map(Some).collect());
    }

    Ok(columns
        .iter()
        .map(|column| schema.column_index(column))
        .collect())
}

fn apply_row<T: Record>(
    schema: &Schema,
    columns: &[String],
    binding: &[Option<usize>],
    values: Vec<DatabaseValue>,
    dst: &mut T,
) -> Result<()> {
    if values.len() != columns.len() {
        return Err(MapperError::ColumnCountMismatch {
            expected: columns.len(),
            actual: values.len(),
        });
    }

    for ((column, target), value) in columns.iter().zip(binding).zip(values) {
        match target {
            Some(idx) => codec::store(schema, dst, &schema.fields()[*idx], value)?,
            None => {
                if !dst.accept_extra(column, value) {
                    return Err(MapperError::UnknownColumn(column.clone()));
                }
            }
        }
    }
    Ok(())
}

fn scan_first<T: Record>(op: &'static str, rows: &mut Rows, dst: &mut T) -> Result<()> {
    let schema = resolve::<T>()?;
    let columns = rows.columns().to_vec();
    let binding = bind_columns(&schema, &columns)?;

    let values = match rows.next_row() {
        Some(row) => row.map_err(|e| MapperError::driver(op, e))?,
        None => return Err(MapperError::NotFound),
    };
    apply_row(&schema, &columns, &binding, values, dst)
}

/// [`scan_row`], tagging cursor errors with `op`
pub(crate) fn scan_row_as<T: Record>(
    op: &'static str,
    mut rows: Rows,
    dst: &mut T,
) -> Result<()> {
    let scanned = scan_first(op, &mut rows, dst);
    let closed = rows.close().map_err(|e| MapperError::driver(op, e));
    scanned.and(closed)
}

/// Scan the first row into `dst`
///
/// # Errors
///
/// Returns [`MapperError::NotFound`] if there is no row, unwrapped.
pub fn scan_row<T: Record>(rows: Rows, dst: &mut T) -> Result<()> {
    scan_row_as("scan_row", rows, dst)
}

fn scan_each<T: Record + Default>(
    op: &'static str,
    rows: &mut Rows,
    dst: &mut Vec<T>,
) -> Result<()> {
    let schema = resolve::<T>()?;
    let columns = rows.columns().to_vec();
    let binding = bind_columns(&schema, &columns)?;

    while let Some(row) = rows.next_row() {
        let values = row.map_err(|e| MapperError::driver(op, e))?;
        let mut record = T::default();
        apply_row(&schema, &columns, &binding, values, &mut record)?;
        dst.push(record);
    }
    Ok(())
}

/// [`scan_all`], tagging cursor errors with `op`
pub(crate) fn scan_all_as<T: Record + Default>(
    op: &'static str,
    mut rows: Rows,
    dst: &mut Vec<T>,
) -> Result<()> {
    let scanned = scan_each(op, &mut rows, dst);
    let closed = rows.close().map_err(|e| MapperError::driver(op, e));
    scanned.and(closed)
}

/// Scan every row, appending one new record per row to `dst` in cursor order
///
/// An empty result leaves `dst` unchanged and is not an error.
pub fn scan_all<T: Record + Default>(rows: Rows, dst: &mut Vec<T>) -> Result<()> {
    scan_all_as("scan_all", rows, dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::BoxError;
    use crate::core::querier::{BufferedCursor, Cursor};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Default, PartialEq)]
    struct Pet {
        id: i64,
        name: String,
        legs: i32,
    }

    crate::record!(Pet { id [pk], name, legs });

    #[derive(Debug, Default)]
    struct PetWithExtras {
        id: i64,
        name: String,
        extras: BTreeMap<String, DatabaseValue>,
    }

    impl Record for PetWithExtras {
        fn fields() -> Vec<crate::FieldDef> {
            vec![crate::FieldDef::new("id").pk(), crate::FieldDef::new("name")]
        }

        fn field(&self, name: &str) -> Option<&dyn crate::SqlField> {
            match name {
                "id" => Some(&self.id as &dyn crate::SqlField),
                "name" => Some(&self.name as &dyn crate::SqlField),
                _ => None,
            }
        }

        fn field_mut(&mut self, name: &str) -> Option<&mut dyn crate::SqlField> {
            match name {
                "id" => Some(&mut self.id as &mut dyn crate::SqlField),
                "name" => Some(&mut self.name as &mut dyn crate::SqlField),
                _ => None,
            }
        }

        fn accept_extra(&mut self, column: &str, value: DatabaseValue) -> bool {
            self.extras.insert(column.to_string(), value);
            true
        }
    }

    /// Cursor that records whether it was closed and can fail mid-stream
    struct Probe {
        inner: BufferedCursor,
        fail_after: Option<usize>,
        served: usize,
        closed: Arc<AtomicBool>,
    }

    impl Cursor for Probe {
        fn columns(&self) -> &[String] {
            self.inner.columns()
        }

        fn next_row(&mut self) -> Option<std::result::Result<Vec<DatabaseValue>, BoxError>> {
            if self.fail_after == Some(self.served) {
                return Some(Err("connection reset".into()));
            }
            self.served += 1;
            self.inner.next_row()
        }

        fn close(&mut self) -> std::result::Result<(), BoxError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn probe(
        columns: &[&str],
        rows: Vec<Vec<DatabaseValue>>,
        fail_after: Option<usize>,
    ) -> (Rows, Arc<AtomicBool>) {
        let closed = Arc::new(AtomicBool::new(false));
        let cursor = Probe {
            inner: BufferedCursor::new(columns.iter().map(|c| c.to_string()).collect(), rows),
            fail_after,
            served: 0,
            closed: Arc::clone(&closed),
        };
        (Rows::new(cursor), closed)
    }

    fn pet_row(id: i64, name: &str, legs: i64) -> Vec<DatabaseValue> {
        vec![
            DatabaseValue::Long(id),
            DatabaseValue::from(name),
            DatabaseValue::Long(legs),
        ]
    }

    #[test]
    fn test_scan_row_by_name_in_any_order() {
        let (rows, closed) = probe(
            &["legs", "id", "name"],
            vec![vec![
                DatabaseValue::Long(4),
                DatabaseValue::Long(1),
                DatabaseValue::from("Rex"),
            ]],
            None,
        );
        let mut pet = Pet::default();
        scan_row(rows, &mut pet).unwrap();
        assert_eq!(
            pet,
            Pet {
                id: 1,
                name: "Rex".into(),
                legs: 4
            }
        );
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_scan_row_partial_columns_keep_other_fields() {
        let (rows, _) = probe(&["name"], vec![vec![DatabaseValue::from("Tom")]], None);
        let mut pet = Pet {
            id: 9,
            legs: 4,
            ..Default::default()
        };
        scan_row(rows, &mut pet).unwrap();
        assert_eq!(pet.name, "Tom");
        assert_eq!(pet.id, 9);
    }

    #[test]
    fn test_scan_row_not_found_closes() {
        let (rows, closed) = probe(&["id", "name", "legs"], vec![], None);
        let err = scan_row(rows, &mut Pet::default()).unwrap_err();
        assert!(err.is_not_found());
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_scan_row_unknown_column_closes() {
        let (rows, closed) = probe(
            &["id", "colour"],
            vec![vec![DatabaseValue::Long(1), DatabaseValue::from("red")]],
            None,
        );
        let err = scan_row(rows, &mut Pet::default()).unwrap_err();
        assert!(matches!(err, MapperError::UnknownColumn(ref c) if c == "colour"));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_scan_row_extra_columns_accepted() {
        let (rows, _) = probe(
            &["id", "name", "owner"],
            vec![vec![
                DatabaseValue::Long(3),
                DatabaseValue::from("Rex"),
                DatabaseValue::from("Ann"),
            ]],
            None,
        );
        let mut pet = PetWithExtras::default();
        scan_row(rows, &mut pet).unwrap();
        assert_eq!(pet.id, 3);
        assert_eq!(pet.extras.get("owner"), Some(&DatabaseValue::from("Ann")));
    }

    #[test]
    fn test_positional_fallback_for_anonymous_columns() {
        let (rows, _) = probe(&["", "", ""], vec![pet_row(2, "Tom", 4)], None);
        let mut pet = Pet::default();
        scan_row(rows, &mut pet).unwrap();
        assert_eq!(pet.name, "Tom");

        let (rows, closed) = probe(&["", ""], vec![vec![DatabaseValue::Long(1); 2]], None);
        let err = scan_row(rows, &mut Pet::default()).unwrap_err();
        assert!(matches!(
            err,
            MapperError::ColumnCountMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_scan_all_preserves_order() {
        let (rows, closed) = probe(
            &["id", "name", "legs"],
            vec![pet_row(2, "b", 2), pet_row(1, "a", 4), pet_row(3, "c", 0)],
            None,
        );
        let mut pets: Vec<Pet> = Vec::new();
        scan_all(rows, &mut pets).unwrap();
        let ids: Vec<_> = pets.iter().map(|p| p.id).collect();
        assert_eq!(ids, [2, 1, 3]);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_scan_all_empty_is_ok() {
        let (rows, _) = probe(&["id", "name", "legs"], vec![], None);
        let mut pets: Vec<Pet> = Vec::new();
        scan_all(rows, &mut pets).unwrap();
        assert!(pets.is_empty());
    }

    #[test]
    fn test_scan_all_cursor_error_is_driver_error_and_closes() {
        let (rows, closed) = probe(
            &["id", "name", "legs"],
            vec![pet_row(1, "a", 4), pet_row(2, "b", 4)],
            Some(1),
        );
        let mut pets: Vec<Pet> = Vec::new();
        let err = scan_all(rows, &mut pets).unwrap_err();
        assert!(matches!(err, MapperError::Driver { op: "scan_all", .. }));
        assert_eq!(pets.len(), 1);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_scan_all_type_mismatch() {
        let (rows, _) = probe(
            &["id", "name", "legs"],
            vec![vec![
                DatabaseValue::Long(1),
                DatabaseValue::from("a"),
                DatabaseValue::from("four"),
            ]],
            None,
        );
        let mut pets: Vec<Pet> = Vec::new();
        let err = scan_all(rows, &mut pets).unwrap_err();
        assert!(matches!(err, MapperError::TypeMismatch { .. }));
    }
}
