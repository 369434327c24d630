pub mod database;
pub mod traits;

pub use database::SqliteWarehouse;
pub use traits::{BatchReport, InsertBatch, Warehouse};
