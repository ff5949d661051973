pub mod aggregation;
pub mod models;
pub mod rules;
pub mod usage_record;
