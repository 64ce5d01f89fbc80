pub mod assistant;
pub mod feed;
pub mod health;
pub mod messages;
pub mod threads;
