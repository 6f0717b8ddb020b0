use std::io::{self, Read, Write};

use tetribridge_protocol::{
    PieceKind,
    oracle::{self, OracleResponse, RESPONSE_LEN},
};

/// Failure of one oracle round trip.
///
/// There is no retry or reconnect: a failed query is fatal for the session
/// that issued it.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum OracleError {
    /// The oracle closed the connection before or inside a response.
    #[display("oracle connection lost")]
    ConnectionLost,
    /// Any other transport failure.
    #[display("oracle transport error: {_0}")]
    Io(io::Error),
}

/// Blocking protocol wrapper around the single long-lived oracle socket.
///
/// The wire protocol has no correlation id, so the one shared instance is
/// kept behind a mutex and the lock is held for the full request/response
/// round trip; interleaved queries would corrupt responses.
#[derive(Debug)]
pub struct OracleClient<S> {
    stream: S,
}

impl<S: Read + Write> OracleClient<S> {
    pub const fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Shared reference to the underlying transport.
    pub const fn stream(&self) -> &S {
        &self.stream
    }

    /// Sends one query and blocks until the full 22-byte response arrives.
    ///
    /// Partial reads are retried until the exact count is available; an
    /// end-of-stream before that surfaces as
    /// [`OracleError::ConnectionLost`] rather than a misinterpreted short
    /// response.
    pub fn query(
        &mut self,
        board: &[u8],
        current: PieceKind,
        lines: u32,
    ) -> Result<OracleResponse, OracleError> {
        let query = oracle::encode_query(board, current, lines);
        self.stream.write_all(&query).map_err(map_io)?;
        let mut response = [0_u8; RESPONSE_LEN];
        self.stream.read_exact(&mut response).map_err(map_io)?;
        Ok(oracle::decode_response(&response))
    }
}

fn map_io(error: io::Error) -> OracleError {
    if error.kind() == io::ErrorKind::UnexpectedEof {
        OracleError::ConnectionLost
    } else {
        OracleError::Io(error)
    }
}
