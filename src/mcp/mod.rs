pub mod server;

pub use server::{McpRpc, McpServer};
