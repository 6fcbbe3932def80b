pub mod column;
pub mod combine;
pub mod data_type;
pub mod error;
pub mod group;
pub mod index_map;
pub mod io;
pub mod join;
pub mod key;
pub mod query;
pub mod table;
pub mod table_index;
pub mod value;

pub use column::{Column, ColumnData};
pub use combine::{cbind, cbind_ref, rbind, rbind_ref};
pub use data_type::DataType;
pub use error::{Result, TableError};
pub use group::GroupMap;
pub use index_map::{IndexEntry, IndexMap, Stage};
pub use join::{Join, JoinKind};
pub use key::{KeyBuilder, NullOrder, RowKey};
pub use query::{Query, Reducer, RowRef};
pub use table::Table;
pub use table_index::{TableIndex, TableView};
pub use value::Value;
