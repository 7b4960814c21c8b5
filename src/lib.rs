pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod exec;
pub mod fileset;
pub mod parse;
pub mod plan;
pub mod session;
pub mod transfer;
pub mod util;

pub use error::UploadError;
