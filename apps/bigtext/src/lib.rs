pub mod binding;
pub mod codec;
pub mod config;
pub mod errors;
pub mod fit;
pub mod options;
pub mod render;
pub mod routes;
pub mod session;
pub mod state;
