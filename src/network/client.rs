use crate::error::{BlockchainError, Result};
use crate::network::{Request, Response};
use serde_json::Deserializer;
use std::io::{BufReader, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

const TCP_WRITE_TIMEOUT: u64 = 5000;

/// Sends one request to a node and waits for its answer
pub fn send_request(addr: &str, request: &Request) -> Result<Response> {
    let mut stream = TcpStream::connect(addr)
        .map_err(|e| BlockchainError::Network(format!("Failed to connect to {addr}: {e}")))?;
    stream
        .set_write_timeout(Some(Duration::from_millis(TCP_WRITE_TIMEOUT)))
        .map_err(|e| BlockchainError::Network(format!("Failed to set write timeout: {e}")))?;

    serde_json::to_writer(&stream, request)?;
    stream
        .flush()
        .and_then(|_| stream.shutdown(Shutdown::Write))
        .map_err(|e| BlockchainError::Network(format!("Failed to send request to {addr}: {e}")))?;

    let reader = BufReader::new(&stream);
    match Deserializer::from_reader(reader).into_iter::<Response>().next() {
        Some(response) => Ok(response?),
        None => Err(BlockchainError::Network(format!(
            "{addr} closed the connection without answering"
        ))),
    }
}
