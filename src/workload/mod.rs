pub mod aggregate;
pub mod chart;
pub mod selection;
