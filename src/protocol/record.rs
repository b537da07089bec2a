//! TLS record layer reader
//!
//! Reads just enough of a TLS stream to reassemble the first handshake
//! message, which must be a ClientHello. Records are framed per RFC 5246
//! §6.2; a handshake message may span several records and a read may pull in
//! bytes of the following record, which are kept for the next iteration.
//!
//! The first record is treated with suspicion: anything that is not a
//! plausible handshake record is rejected from its 5-byte header, before the
//! body is read.

use bytes::BytesMut;
use log::trace;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::client_hello::{ClientHelloMessage, TYPE_CLIENT_HELLO};
use super::error::{Alert, ProtocolError};

/// Maximum plaintext payload of a record
pub const MAX_PLAINTEXT: usize = 16384;
/// Maximum ciphertext payload of a record
pub const MAX_CIPHERTEXT: usize = MAX_PLAINTEXT + 2048;
/// Maximum accepted handshake message body
pub const MAX_HANDSHAKE: usize = 65536;

const RECORD_HEADER_LEN: usize = 5;
const RECORD_TYPE_HANDSHAKE: u8 = 22;
const INITIAL_BLOCK_SIZE: usize = 1024;

/// Raw bytes straight off the wire
#[derive(Debug, Default)]
struct Block {
    data: BytesMut,
}

impl Block {
    /// Grows capacity to at least `n`, doubling from 1 KiB
    fn reserve(&mut self, n: usize) {
        let capacity = self.data.capacity();
        if capacity >= n {
            return;
        }
        let mut target = capacity.max(INITIAL_BLOCK_SIZE);
        while target < n {
            target *= 2;
        }
        self.data.reserve(target - self.data.len());
    }

    /// Reads from `rd` until at least `n` bytes are buffered
    async fn read_from_until<R>(&mut self, rd: &mut R, n: usize) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        if self.data.len() >= n {
            return Ok(());
        }

        self.reserve(n);
        while self.data.len() < n {
            if rd.read_buf(&mut self.data).await? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("stream closed after {} of {} bytes", self.data.len(), n),
                ));
            }
        }
        Ok(())
    }
}

/// Reassembles handshake data from consecutive records
struct RecordReader<R> {
    rd: R,
    next: Block,
    handshake: BytesMut,
}

impl<R: AsyncRead + Unpin> RecordReader<R> {
    fn new(rd: R) -> Self {
        Self {
            rd,
            next: Block::default(),
            handshake: BytesMut::new(),
        }
    }

    /// Reads one record and appends its payload to the handshake buffer
    async fn read_record(&mut self) -> Result<(), ProtocolError> {
        self.next.read_from_until(&mut self.rd, RECORD_HEADER_LEN).await?;

        let header = &self.next.data[..RECORD_HEADER_LEN];
        let typ = header[0];

        // No valid record has type 0x80, but an SSLv2 header starts with a
        // length that has the high bit set.
        if typ == 0x80 {
            return Err(ProtocolError::UnsupportedSslv2);
        }

        let version = u16::from_be_bytes([header[1], header[2]]);
        let n = u16::from_be_bytes([header[3], header[4]]) as usize;
        if n > MAX_CIPHERTEXT {
            return Err(Alert::RecordOverflow.into());
        }

        // A ClientHello fits in well under 12 KiB and no TLS version is >= 16.0
        if typ != RECORD_TYPE_HANDSHAKE || version >= 0x1000 || n >= 0x3000 {
            trace!("Rejecting record header type={:#04x} version={:#06x} length={}", typ, version, n);
            return Err(Alert::UnexpectedMessage.into());
        }

        self.next.read_from_until(&mut self.rd, RECORD_HEADER_LEN + n).await?;

        // anything past this record stays buffered for the next call
        let record = self.next.data.split_to(RECORD_HEADER_LEN + n);
        let payload = &record[RECORD_HEADER_LEN..];
        if payload.len() > MAX_PLAINTEXT {
            return Err(Alert::RecordOverflow.into());
        }

        trace!("Read handshake record of {} bytes", payload.len());
        self.handshake.extend_from_slice(payload);
        Ok(())
    }

    async fn read_client_hello(mut self) -> Result<ClientHelloMessage, ProtocolError> {
        while self.handshake.len() < 4 {
            self.read_record().await?;
        }

        let header = &self.handshake[..4];
        let n = u32::from_be_bytes([0, header[1], header[2], header[3]]) as usize;
        if n > MAX_HANDSHAKE {
            return Err(Alert::InternalError.into());
        }

        while self.handshake.len() < 4 + n {
            self.read_record().await?;
        }

        let message = self.handshake.split_to(4 + n);
        if message[0] != TYPE_CLIENT_HELLO {
            return Err(Alert::UnexpectedMessage.into());
        }

        Ok(ClientHelloMessage::decode(&message)?)
    }
}

/// Read and decode the ClientHello at the start of `rd`
///
/// Bytes beyond the ClientHello may be consumed from `rd`; callers that need
/// them afterwards read through a replaying connection.
///
/// # Errors
///
/// Returns [`ProtocolError::Io`] when the stream fails or ends early, and an
/// alert or [`ProtocolError::UnsupportedSslv2`] for input that is not a
/// well-formed ClientHello.
pub async fn read_client_hello<R>(rd: R) -> Result<ClientHelloMessage, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    RecordReader::new(rd).read_client_hello().await
}
