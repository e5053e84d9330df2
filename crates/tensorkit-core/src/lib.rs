pub mod container;
pub mod convert;
pub mod dtype;
pub mod error;
pub mod named;
pub mod tensor;

pub use container::*;
pub use convert::*;
pub use dtype::*;
pub use error::*;
pub use named::*;
pub use tensor::*;
