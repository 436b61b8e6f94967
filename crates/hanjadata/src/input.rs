//! Shapes of the upstream artifacts the pipeline consumes.

pub mod meta;
pub mod readings;
pub mod scraped;
