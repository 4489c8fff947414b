pub mod assets;
pub mod render;
pub mod routes;
pub mod sessions;

pub use routes::{routes, Dashboard};
