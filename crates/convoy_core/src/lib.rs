pub mod error;
pub mod events;
pub mod hash;
pub mod plugin;
pub mod types;

pub use error::ConvoyError;
pub use error::ConvoyResult;
