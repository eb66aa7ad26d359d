pub mod presence;
pub mod processing;
pub mod upload;
