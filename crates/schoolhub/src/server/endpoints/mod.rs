pub mod classes;
pub mod grades;
pub mod schedule;
pub mod status;
