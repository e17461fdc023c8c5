pub mod baseline;
pub mod readings;
