mod encoder;
mod models;

pub use encoder::*;
pub use models::*;
