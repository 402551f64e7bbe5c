pub mod aggregation;
pub mod chart;
pub mod comparison;
pub mod metadata;
pub mod models;

#[cfg(test)]
pub(crate) mod testing;
