//! HTTP test clients for the housing and image models

pub mod housing;
pub mod image;
pub mod tensor;

pub use self::housing::{send_row, HousingPrediction};
pub use self::image::{classify_image, ClassifyOutcome};
pub use self::tensor::Tensor;
