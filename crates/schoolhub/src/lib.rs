pub mod classes;
pub mod config;
pub mod db;
pub mod grades;
pub mod server;
pub mod timetable;
pub mod types;
