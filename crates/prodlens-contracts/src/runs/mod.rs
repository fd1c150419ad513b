pub mod outcome;
pub mod summary;
