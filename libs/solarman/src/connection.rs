//! Logger connection management
//!
//! One TCP socket per logger, strictly one request/response exchange at a time.
//! Each exchange writes the whole request frame and takes the response from a
//! single read; a timed-out or empty read is retried on the same socket up to
//! the configured attempt count. Frames are never reassembled across reads.

use crate::config::LoggerConfig;
use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_ATTEMPTS, DEFAULT_READ_TIMEOUT, RESPONSE_BUFFER_SIZE,
};
use crate::error::ConnectionError;
use common::hex::encode_spaced;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Connection parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    /// Timeout of each individual read attempt
    pub read_timeout: Duration,
    /// Total read attempts per request, including the first
    pub read_attempts: u32,
    /// Log every TX/RX frame as hex at DEBUG level
    pub frame_logging: bool,
}

impl ConnectionParams {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            read_attempts: DEFAULT_READ_ATTEMPTS,
            frame_logging: false,
        }
    }

    pub fn from_config(config: &LoggerConfig) -> Self {
        Self {
            host: config.hostname.clone(),
            port: config.port,
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            read_timeout: Duration::from_millis(config.read_timeout_ms),
            read_attempts: config.read_attempts,
            frame_logging: config.frame_logging,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Result of one read call
#[derive(Debug)]
enum ReadOutcome {
    Data(usize),
    Empty,
    TimedOut,
    Failed(io::Error),
}

/// What the read loop does after an attempt
#[derive(Debug)]
enum ReadStep {
    Done(usize),
    Retry(&'static str),
    Fail(io::Error),
    Exhausted,
}

/// Only empty and timed-out reads are retried, and only while attempts remain
fn next_read_step(outcome: ReadOutcome, attempt: u32, max_attempts: u32) -> ReadStep {
    match outcome {
        ReadOutcome::Data(n) => ReadStep::Done(n),
        ReadOutcome::Failed(e) => ReadStep::Fail(e),
        ReadOutcome::Empty | ReadOutcome::TimedOut if attempt >= max_attempts => {
            ReadStep::Exhausted
        },
        ReadOutcome::Empty => ReadStep::Retry("empty read"),
        ReadOutcome::TimedOut => ReadStep::Retry("read timeout"),
    }
}

/// TCP connection to one data logger
#[derive(Debug)]
pub struct LoggerConnection {
    params: ConnectionParams,
    stream: Option<TcpStream>,
}

impl LoggerConnection {
    /// Open a connection; failures are reported, not retried
    pub async fn connect(params: ConnectionParams) -> Result<Self, ConnectionError> {
        let stream = Self::open(&params).await?;
        Ok(Self {
            params,
            stream: Some(stream),
        })
    }

    async fn open(params: &ConnectionParams) -> Result<TcpStream, ConnectionError> {
        let endpoint = params.endpoint();
        debug!("TCP connecting: {}", endpoint);

        match timeout(params.connect_timeout, TcpStream::connect(&endpoint)).await {
            Ok(Ok(stream)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("TCP_NODELAY: {}", e);
                }
                info!("Logger connected: {}", endpoint);
                Ok(stream)
            },
            Ok(Err(source)) => {
                error!("TCP err: {} - {}", endpoint, source);
                Err(ConnectionError::Connect { endpoint, source })
            },
            Err(_) => {
                warn!("TCP timeout: {}", endpoint);
                Err(ConnectionError::ConnectTimeout {
                    endpoint,
                    timeout_ms: params.connect_timeout.as_millis(),
                })
            },
        }
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Close the current socket (if any) and open a new one
    pub async fn reconnect(&mut self) -> Result<(), ConnectionError> {
        self.close().await;
        self.stream = Some(Self::open(&self.params).await?);
        Ok(())
    }

    /// Best-effort shutdown; safe to call repeatedly
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("TCP shutdown: {}", e);
            }
            info!("Logger disconnected: {}", self.params.endpoint());
        }
    }

    /// Write a request frame and return the bytes of a single response read
    pub async fn send_request(&mut self, frame: &[u8]) -> Result<Vec<u8>, ConnectionError> {
        let endpoint = self.params.endpoint();
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ConnectionError::NotConnected(endpoint.clone()))?;

        if self.params.frame_logging {
            debug!("[TX] {} bytes: [{}]", frame.len(), encode_spaced(frame));
        }

        if let Err(source) = stream.write_all(frame).await {
            error!("TCP TX: {} - {}", endpoint, source);
            return Err(ConnectionError::Write { endpoint, source });
        }
        debug!("TCP TX: {}B", frame.len());

        let max_attempts = self.params.read_attempts.max(1);
        let mut buffer = vec![0u8; RESPONSE_BUFFER_SIZE];
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = match timeout(self.params.read_timeout, stream.read(&mut buffer)).await {
                Ok(Ok(0)) => ReadOutcome::Empty,
                Ok(Ok(n)) => ReadOutcome::Data(n),
                Ok(Err(e)) => ReadOutcome::Failed(e),
                Err(_) => ReadOutcome::TimedOut,
            };

            match next_read_step(outcome, attempt, max_attempts) {
                ReadStep::Done(n) => {
                    debug!("TCP RX: {}B", n);
                    if self.params.frame_logging {
                        debug!("[RX] {} bytes: [{}]", n, encode_spaced(&buffer[..n]));
                    }
                    buffer.truncate(n);
                    return Ok(buffer);
                },
                ReadStep::Retry(reason) => {
                    warn!(
                        "Read {}/{} from {}: {}, retrying",
                        attempt, max_attempts, endpoint, reason
                    );
                },
                ReadStep::Fail(source) => {
                    error!("TCP RX: {} - {}", endpoint, source);
                    return Err(ConnectionError::Read { endpoint, source });
                },
                ReadStep::Exhausted => {
                    error!("No response from {} after {} reads", endpoint, attempt);
                    return Err(ConnectionError::NoData {
                        endpoint,
                        attempts: attempt,
                    });
                },
            }
        }
    }
}
