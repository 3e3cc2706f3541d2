pub mod coordinator;
pub mod database;
pub mod recordings;
