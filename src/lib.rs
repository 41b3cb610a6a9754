pub mod api;
pub mod config;
pub mod consts;
pub mod extract;
pub mod model;
pub mod schema;
pub mod store;
pub mod workbook;
