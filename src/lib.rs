pub mod chunks;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notifier;
pub mod page;
pub mod reassembly;
pub mod server;
pub mod shutdown;
pub mod state;
pub mod utils;
pub mod watcher;
