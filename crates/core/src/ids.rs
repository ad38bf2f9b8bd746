//! Opaque identifiers for tables, rows, columns and cells.
//!
//! Ids are strings because the store assigns them; the grid never looks
//! inside them. Placeholder status lives on the row (`RowOrigin`), not in
//! the id text.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

string_id!(
    /// Identity of a table in the store.
    TableId
);

string_id!(
    /// Identity of a row. Either store-assigned (durable) or locally
    /// generated for a placeholder row.
    RowId
);

string_id!(
    /// Identity of a column. Immutable once created.
    ColumnId
);

impl RowId {
    /// Fresh local id for a row the store has not seen yet.
    pub fn local() -> Self {
        Self(format!("local-{}", uuid::Uuid::new_v4().simple()))
    }
}

impl ColumnId {
    /// Fresh id for a column declared in this session.
    pub fn generate() -> Self {
        Self(format!("col-{}", uuid::Uuid::new_v4().simple()))
    }
}

/// A single cell, addressed by row and column identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub row: RowId,
    pub col: ColumnId,
}

impl CellKey {
    pub fn new(row: impl Into<RowId>, col: impl Into<ColumnId>) -> Self {
        Self { row: row.into(), col: col.into() }
    }
}

impl std::fmt::Display for CellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}
