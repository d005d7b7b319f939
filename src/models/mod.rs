pub mod company;
pub mod item;
pub mod loaders;
pub mod result_set;
pub mod table;

pub use company::{CompanyData, Source};
pub use item::{ItemStatus, SearchItem};
pub use loaders::{load_names_file, load_table_csv, names_from_rows, parse_csv};
pub use result_set::{ItemFilter, PageView, ResultSet};
pub use table::ReferenceTable;
