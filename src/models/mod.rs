pub mod biomarker;
pub mod enums;

pub use biomarker::*;
pub use enums::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid value '{value}' for enum {field}")]
    InvalidEnum { field: String, value: String },
}
