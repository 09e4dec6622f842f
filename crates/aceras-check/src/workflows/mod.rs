pub mod geocoding;
pub mod reports;
