//! Row marshaling into caller types.
//!
//! Destinations are plain `serde` types. Their shape is read from the
//! `Deserialize` impl itself:
//!
//! - a struct gets the columns named like its fields (serde renames apply)
//! - a map gets the whole row
//! - anything else gets the first column
//!
//! Strict scanning fails when a struct field has no column. Partial scanning
//! leaves such fields at their `Default` value.

use crate::db::JsonRow;
use crate::error::{SqlError, SqlResult};
use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use serde::{Serialize, forward_to_deserialize_any};
use serde_json::Value as JsonValue;
use std::cell::Cell;

/// How a destination type consumes a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Struct(&'static [&'static str]),
    Map,
    Scalar,
}

/// Inspect the shape of `T` without deserializing anything.
pub fn shape_of<T: DeserializeOwned>() -> Shape {
    let shape = Cell::new(None);
    // The probe always errors once it has seen the shape
    let _ = T::deserialize(Probe { shape: &shape });
    shape.get().unwrap_or(Shape::Scalar)
}

/// Scan one row. `None` means the query returned no rows.
pub fn unmarshal_row<T: DeserializeOwned>(row: Option<JsonRow>) -> SqlResult<T> {
    let row = row.ok_or(SqlError::NotFound)?;
    scan_strict(shape_of::<T>(), row)
}

/// Scan every row. No rows is an empty `Vec`, not an error.
pub fn unmarshal_rows<T: DeserializeOwned>(rows: Vec<JsonRow>) -> SqlResult<Vec<T>> {
    let shape = shape_of::<T>();
    rows.into_iter().map(|row| scan_strict(shape, row)).collect()
}

/// Scan one row, tolerating struct fields without a column.
pub fn unmarshal_row_partial<T>(row: Option<JsonRow>) -> SqlResult<T>
where
    T: DeserializeOwned + Default + Serialize,
{
    let row = row.ok_or(SqlError::NotFound)?;
    scan_partial(shape_of::<T>(), row)
}

/// Scan every row, tolerating struct fields without a column.
pub fn unmarshal_rows_partial<T>(rows: Vec<JsonRow>) -> SqlResult<Vec<T>>
where
    T: DeserializeOwned + Default + Serialize,
{
    let shape = shape_of::<T>();
    rows.into_iter().map(|row| scan_partial(shape, row)).collect()
}

fn scan_strict<T: DeserializeOwned>(shape: Shape, mut row: JsonRow) -> SqlResult<T> {
    let value = match shape {
        Shape::Struct(fields) => {
            let missing: Vec<String> = fields
                .iter()
                .filter(|field| !row.contains_key(**field))
                .map(|field| field.to_string())
                .collect();
            if !missing.is_empty() {
                return Err(SqlError::NotMatchDestination { missing });
            }
            JsonValue::Object(select_fields(fields, &mut row))
        }
        Shape::Map => JsonValue::Object(row),
        Shape::Scalar => first_column(row).unwrap_or(JsonValue::Null),
    };
    Ok(serde_json::from_value(value)?)
}

fn scan_partial<T>(shape: Shape, mut row: JsonRow) -> SqlResult<T>
where
    T: DeserializeOwned + Default + Serialize,
{
    let mut base = serde_json::to_value(T::default())?;

    match (shape, &mut base) {
        (Shape::Struct(fields), JsonValue::Object(target)) => {
            target.extend(select_fields(fields, &mut row));
        }
        (Shape::Map, JsonValue::Object(target)) => target.extend(row),
        _ => {
            if let Some(value) = first_column(row) {
                base = value;
            }
        }
    }

    Ok(serde_json::from_value(base)?)
}

/// Take the columns named by `fields` out of `row`, in field order.
fn select_fields(fields: &[&str], row: &mut JsonRow) -> JsonRow {
    fields
        .iter()
        .filter_map(|field| row.remove(*field).map(|v| (field.to_string(), v)))
        .collect()
}

fn first_column(row: JsonRow) -> Option<JsonValue> {
    row.into_iter().next().map(|(_, value)| value)
}

/// Deserializer that records which `deserialize_*` entry point a type uses.
struct Probe<'a> {
    shape: &'a Cell<Option<Shape>>,
}

impl Probe<'_> {
    fn found<V>(self, shape: Shape) -> Result<V, de::value::Error> {
        self.shape.set(Some(shape));
        Err(de::Error::custom("shape probe"))
    }
}

impl<'de> Deserializer<'de> for Probe<'_> {
    type Error = de::value::Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        self.found(Shape::Scalar)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.found(Shape::Struct(fields))
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        self.found(Shape::Map)
    }

    // Option<T> and newtype wrappers take the shape of what they wrap
    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct enum identifier
        ignored_any
    }
}
