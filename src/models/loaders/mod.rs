pub mod csv_loader;

pub use csv_loader::{
    load_names_file, load_table_csv, names_from_rows, parse_csv, unique_names,
};
