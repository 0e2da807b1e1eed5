mod row;
mod table;

pub use row::{DataColumn, DataRow};
pub use table::{DataSet, DataTable};
