use crate::core::monetary::{coins_to_units, units_to_coins};
use crate::core::{Block, Blockchain, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{PublicKey, Signature};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Deserializer;
use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

const TCP_READ_TIMEOUT: u64 = 60;

/// Node server: owns the ledger handle and answers one JSON request per line
pub struct Server {
    blockchain: Blockchain,
}

/// A transfer posted by a wallet. Every field is optional on the wire so that
/// incomplete requests can be turned away before any cryptography runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub sender_blockchain_address: Option<String>,
    pub recipient_blockchain_address: Option<String>,
    pub sender_public_key: Option<String>,
    pub value: Option<f64>,
    pub signature: Option<String>,
}

impl TransactionRequest {
    pub fn validate(&self) -> bool {
        self.sender_blockchain_address.is_some()
            && self.recipient_blockchain_address.is_some()
            && self.sender_public_key.is_some()
            && self.value.is_some()
            && self.signature.is_some()
    }

    pub fn into_parts(self) -> Result<(Transaction, PublicKey, Signature)> {
        let missing = || BlockchainError::Transaction("missing field(s)".to_string());
        let sender = self.sender_blockchain_address.ok_or_else(missing)?;
        let recipient = self.recipient_blockchain_address.ok_or_else(missing)?;
        let public_key = PublicKey::from_hex(&self.sender_public_key.ok_or_else(missing)?)?;
        let value = coins_to_units(self.value.ok_or_else(missing)?)?;
        let signature = Signature::from_hex(&self.signature.ok_or_else(missing)?)?;
        Ok((
            Transaction::new(&sender, &recipient, value),
            public_key,
            signature,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    GetChain,
    GetTransactions,
    PostTransaction(TransactionRequest),
    Mine,
    Amount { blockchain_address: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Chain {
        chain: Vec<Block>,
    },
    Transactions {
        transactions: Vec<Transaction>,
        length: usize,
    },
    Status {
        status: Status,
        message: String,
    },
    Mined {
        block: Block,
    },
    Amount {
        amount: f64,
    },
}

impl Response {
    fn fail(message: impl Into<String>) -> Response {
        Response::Status {
            status: Status::Fail,
            message: message.into(),
        }
    }

    fn success(message: impl Into<String>) -> Response {
        Response::Status {
            status: Status::Success,
            message: message.into(),
        }
    }
}

impl Server {
    pub fn new(blockchain: Blockchain) -> Self {
        Self { blockchain }
    }

    /// Bind and serve until the listener fails
    pub fn run(&self, addr: &str) -> Result<()> {
        let listener = Self::bind(addr)?;
        self.serve(listener)
    }

    pub fn bind(addr: &str) -> Result<TcpListener> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| BlockchainError::Network(format!("Failed to bind to {addr}: {e}")))?;
        info!("Server listening on {addr}");
        Ok(listener)
    }

    /// Accept connections, one handler thread each
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let peer_addr = match stream.peer_addr() {
                        Ok(addr) => addr,
                        Err(e) => {
                            error!("Failed to get peer address: {e}");
                            continue;
                        }
                    };

                    let blockchain = self.blockchain.clone();
                    thread::spawn(move || {
                        if let Err(e) = Self::handle_connection(blockchain, stream, peer_addr) {
                            error!("Error handling connection from {peer_addr}: {e}");
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }

        Ok(())
    }

    fn handle_connection(
        blockchain: Blockchain,
        stream: TcpStream,
        peer_addr: SocketAddr,
    ) -> Result<()> {
        stream
            .set_read_timeout(Some(Duration::from_secs(TCP_READ_TIMEOUT)))
            .map_err(|e| BlockchainError::Network(format!("Failed to set read timeout: {e}")))?;

        let reader = BufReader::new(&stream);
        let request_reader = Deserializer::from_reader(reader).into_iter::<Request>();

        for request in request_reader {
            let response = match request {
                Ok(request) => {
                    info!("Received request from {peer_addr}: {request:?}");
                    Self::handle_request(&blockchain, request)
                }
                Err(e) => {
                    warn!("Malformed request from {peer_addr}: {e}");
                    let response = Response::fail(format!("malformed request: {e}"));
                    Self::write_response(&stream, &response)?;
                    return Err(BlockchainError::Network(format!(
                        "Failed to deserialize request: {e}"
                    )));
                }
            };
            Self::write_response(&stream, &response)?;
        }
        Ok(())
    }

    fn write_response(mut stream: &TcpStream, response: &Response) -> Result<()> {
        serde_json::to_writer(stream, response)?;
        stream
            .write_all(b"\n")
            .and_then(|_| stream.flush())
            .map_err(|e| BlockchainError::Network(format!("Failed to write response: {e}")))
    }

    /// Turns one request into one response; ledger errors become fail statuses.
    pub fn handle_request(blockchain: &Blockchain, request: Request) -> Response {
        match request {
            Request::GetChain => match blockchain.chain_snapshot() {
                Ok(chain) => Response::Chain { chain },
                Err(e) => Response::fail(e.to_string()),
            },
            Request::GetTransactions => match blockchain.pool_snapshot() {
                Ok(transactions) => Response::Transactions {
                    length: transactions.len(),
                    transactions,
                },
                Err(e) => Response::fail(e.to_string()),
            },
            Request::PostTransaction(request) => {
                if !request.validate() {
                    error!("ERROR: missing field(s)");
                    return Response::fail("missing field(s)");
                }
                let admitted = request.into_parts().and_then(|(tx, public_key, signature)| {
                    blockchain.try_submit(tx, &public_key, &signature)
                });
                match admitted {
                    Ok(()) => Response::success("transaction admitted"),
                    Err(e) => {
                        warn!("Rejected transaction: {e}");
                        Response::fail(e.to_string())
                    }
                }
            }
            Request::Mine => match blockchain.mine() {
                Ok(block) => Response::Mined { block },
                Err(e) => Response::fail(e.to_string()),
            },
            Request::Amount { blockchain_address } => {
                match blockchain.balance_of(&blockchain_address) {
                    Ok(units) => Response::Amount {
                        amount: units_to_coins(units),
                    },
                    Err(e) => Response::fail(e.to_string()),
                }
            }
        }
    }
}
