pub mod dashboard;
pub mod routes;
pub mod server;
pub mod types;
