pub mod converters;
pub mod distribution;
pub mod material_properties;
pub mod parameters;
pub mod storage;
pub mod units;
