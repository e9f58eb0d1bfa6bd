pub mod data_point;
pub mod data_type;
pub mod location;
pub mod period;
