//! Record declarations
//!
//! A [`Record`] declares its mappable fields in order with [`Record::fields`]
//! and hands out each field by name as a [`SqlField`]. The [`record!`] macro
//! writes the implementation for a plain struct:
//!
//! ```
//! use rust_record_mapper::record;
//!
//! #[derive(Debug, Default)]
//! struct Person {
//!     id: i64,
//!     name: String,
//!     email: String,
//!     scratch: i32,
//! }
//!
//! record!(Person {
//!     id [pk],
//!     name,
//!     email [column = "email_address", zeroisnull],
//!     scratch [skip],
//! });
//! ```
//!
//! Field options: `pk` marks the primary key, `column = "..."` overrides the
//! column name (the field name is used otherwise), `zeroisnull` writes the
//! zero value as NULL and reads NULL back as zero, `skip` excludes the field.
//! A field whose type has no [`SqlField`] impl is left out of the list instead.
//!
//! [`record!`]: crate::record

use super::field::SqlField;
use super::value::DatabaseValue;

/// Declaration of one record field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name, as accepted by [`Record::field`]
    pub name: &'static str,
    /// Column name override
    pub column: Option<&'static str>,
    /// Field is the primary key
    pub primary_key: bool,
    /// Zero value is stored as NULL
    pub zero_is_null: bool,
    /// Field is not mapped
    pub skip: bool,
}

impl FieldDef {
    /// Declare a field mapped to a column of the same name
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            column: None,
            primary_key: false,
            zero_is_null: false,
            skip: false,
        }
    }

    /// Mark as primary key
    #[must_use]
    pub const fn pk(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Map to a differently named column
    #[must_use]
    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    /// Store the zero value as NULL
    #[must_use]
    pub const fn zeroisnull(mut self) -> Self {
        self.zero_is_null = true;
        self
    }

    /// Exclude from mapping
    #[must_use]
    pub const fn skip(mut self) -> Self {
        self.skip = true;
        self
    }
}

/// A struct that can be stored in and loaded from a table row
pub trait Record: Send + Sync + 'static {
    /// Mappable fields, in declaration order
    fn fields() -> Vec<FieldDef>
    where
        Self: Sized;

    /// Borrow a field by name
    fn field(&self, name: &str) -> Option<&dyn SqlField>;

    /// Mutably borrow a field by name
    fn field_mut(&mut self, name: &str) -> Option<&mut dyn SqlField>;

    /// Offered every returned column that matches no field. Return `true` to
    /// accept it; unaccepted columns fail the scan.
    fn accept_extra(&mut self, _column: &str, _value: DatabaseValue) -> bool {
        false
    }
}

/// Implement [`Record`] for a struct. See the [module docs](crate::core::record).
#[macro_export]
macro_rules! record {
    ($ty:ident { $( $field:ident $( [ $( $opt:ident $( = $arg:expr )? ),* $(,)? ] )? ),* $(,)? }) => {
        impl $crate::Record for $ty {
            fn fields() -> ::std::vec::Vec<$crate::FieldDef> {
                ::std::vec![
                    $(
                        $crate::FieldDef::new(::std::stringify!($field))
                            $( $( .$opt( $( $arg )? ) )* )?
                    ),*
                ]
            }

            fn field(&self, name: &str) -> ::std::option::Option<&dyn $crate::SqlField> {
                match name {
                    $(
                        ::std::stringify!($field) => {
                            ::std::option::Option::Some(&self.$field as &dyn $crate::SqlField)
                        }
                    )*
                    _ => ::std::option::Option::None,
                }
            }

            fn field_mut(
                &mut self,
                name: &str,
            ) -> ::std::option::Option<&mut dyn $crate::SqlField> {
                match name {
                    $(
                        ::std::stringify!($field) => {
                            ::std::option::Option::Some(&mut self.$field as &mut dyn $crate::SqlField)
                        }
                    )*
                    _ => ::std::option::Option::None,
                }
            }
        }
    };
}
