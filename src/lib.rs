pub mod database;
pub mod error;
pub mod export;
pub mod io;
pub mod nvm;
pub mod pipeline;
pub mod pose;
pub mod reconcile;
pub mod types;

pub use error::{ConvertError, Result};
