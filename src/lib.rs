pub mod error;
pub mod frame;
mod interpolate;
pub mod io;
pub mod netzero;
pub mod schema;

#[cfg(feature = "python")]
mod python;

pub use error::IamError;
pub use frame::IamFrame;
pub use netzero::{get_netzero_data, NetzeroConfig};
