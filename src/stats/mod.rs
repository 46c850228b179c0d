pub mod builder;
pub mod histogram;
pub mod quartiles;

pub use builder::build_snapshot;
