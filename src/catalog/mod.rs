pub mod builder;
pub mod raw;
pub mod variant;
