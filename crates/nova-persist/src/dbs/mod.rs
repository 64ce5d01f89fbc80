pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;
#[cfg(feature = "http")]
pub mod http;
