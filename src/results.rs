mod fetched;
mod result_set;
mod row;

pub use fetched::Fetched;
pub use result_set::ResultSet;
pub use row::Row;
