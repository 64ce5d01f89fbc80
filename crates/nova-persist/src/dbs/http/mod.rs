mod client;
mod sse;

pub use client::HttpPersistenceClient;
