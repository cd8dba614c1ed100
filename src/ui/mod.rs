pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    deleted, dim, empty, error, header, info, price, section, success, summary_row, warn,
};
pub use table::{render, stats_table, CountRow, NamedRow, ProductRow, VariantRow};
pub use theme::theme;
