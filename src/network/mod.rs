//! Node server and client
//!
//! A thin JSON-over-TCP adapter around the ledger: reading the chain and the
//! pool, posting signed transactions, mining and balance queries.

pub mod client;
pub mod server;

pub use client::send_request;
pub use server::{Request, Response, Server, Status, TransactionRequest};
