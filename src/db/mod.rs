pub mod connection;
pub mod history;
pub mod queries;
pub mod schema;

pub use connection::Database;
