pub mod categories;
pub mod clean;
pub mod keyed_table;
pub mod load;
pub mod utils;

pub use clean::clean_data;
pub use keyed_table::KeyedTable;
pub use load::load_data;
