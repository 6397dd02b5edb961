//! Message framing over the backend byte stream
//!
//! Every exchange with the swICC backend is a size-prefixed [`Message`].
//! A frame is written in one go and read back as header then payload; any
//! short read, short write or out-of-range size fails the call and the caller
//! must treat the connection as broken.

mod contact;
mod message;

#[cfg(test)]
pub(crate) mod mock;

pub use contact::ContactState;
pub use message::{
    check_payload_size, ControlCode, Message, BODY_FIXED_SIZE, HEADER_SIZE, MAX_BUF_SIZE,
    MAX_PAYLOAD_SIZE,
};

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

use log::debug;
use thiserror::Error;

/// Errors raised while framing or moving a message
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("message size {0} is smaller than the fixed body fields")]
    Undersized(usize),

    #[error("message size {0} is larger than the maximum payload")]
    Oversized(usize),

    #[error("unknown control code 0x{0:08X}")]
    UnknownControl(u32),

    #[error("failed to send message: {0}")]
    Send(#[source] io::Error),

    #[error("failed to receive message: {0}")]
    Recv(#[source] io::Error),
}

impl FrameError {
    /// Whether the failure was an expired read or write timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Send(e) | Self::Recv(e) => {
                matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
            }
            _ => false,
        }
    }
}

/// A connected, blocking stream to the backend
pub trait Link: Read + Write {
    /// Shut down both directions of the stream. Failure only matters to the
    /// peer, so callers log it and carry on.
    fn shutdown(&mut self) -> io::Result<()>;
}

impl Link for TcpStream {
    fn shutdown(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

/// Send a message as a single frame
pub fn send<L: Write + ?Sized>(link: &mut L, msg: &Message) -> Result<(), FrameError> {
    let frame = msg.encode()?;
    link.write_all(&frame).map_err(FrameError::Send)?;
    link.flush().map_err(FrameError::Send)?;
    debug!("TX: {}", msg);
    Ok(())
}

/// Receive one frame
///
/// The header is validated before the payload is read, so an oversized
/// declaration never causes more bytes to be pulled off the stream.
pub fn recv<L: Read + ?Sized>(link: &mut L) -> Result<Message, FrameError> {
    let mut header = [0u8; HEADER_SIZE];
    link.read_exact(&mut header).map_err(FrameError::Recv)?;
    let size = check_payload_size(u32::from_le_bytes(header) as usize)?;

    let mut payload = vec![0u8; size];
    link.read_exact(&mut payload).map_err(FrameError::Recv)?;

    let msg = Message::decode_payload(&payload)?;
    debug!("RX: {}", msg);
    Ok(msg)
}

/// Send a request and wait for the reply
pub fn exchange<L: Read + Write + ?Sized>(
    link: &mut L,
    msg: &Message,
) -> Result<Message, FrameError> {
    send(link, msg)?;
    recv(link)
}

#[cfg(test)]
mod tests {
    use super::mock::ScriptedLink;
    use super::*;

    #[test]
    fn test_roundtrip_every_buffer_size() {
        for len in 0..=MAX_BUF_SIZE {
            let msg = Message {
                contact: ContactState::READY,
                ctrl: ControlCode::None,
                expected_len: len as u32,
                buf: (0..len).map(|i| i as u8).collect(),
            };
            let mut link = ScriptedLink::new();
            send(&mut link, &msg).unwrap();
            let mut wire = std::io::Cursor::new(link.written().to_vec());
            assert_eq!(recv(&mut wire).unwrap(), msg);
        }
    }

    #[test]
    fn test_recv_rejects_oversized_header_without_reading_payload() {
        let mut bytes = ((MAX_PAYLOAD_SIZE + 1) as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0xEE; 32]);
        let mut wire = std::io::Cursor::new(bytes);
        assert!(matches!(recv(&mut wire), Err(FrameError::Oversized(_))));
        assert_eq!(wire.position(), HEADER_SIZE as u64);
    }

    #[test]
    fn test_recv_rejects_undersized_header() {
        let mut bytes = 8u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 8]);
        let mut wire = std::io::Cursor::new(bytes);
        assert!(matches!(recv(&mut wire), Err(FrameError::Undersized(8))));
    }

    #[test]
    fn test_recv_short_payload() {
        let mut bytes = 14u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 12]);
        let mut wire = std::io::Cursor::new(bytes);
        assert!(matches!(recv(&mut wire), Err(FrameError::Recv(_))));
    }

    #[test]
    fn test_recv_short_header() {
        let mut wire = std::io::Cursor::new(vec![0x0C, 0x00]);
        assert!(matches!(recv(&mut wire), Err(FrameError::Recv(_))));
    }

    #[test]
    fn test_send_failure_is_fatal() {
        let mut link = ScriptedLink::new();
        link.fail_writes();
        let msg = Message::control(ContactState::EMPTY, ControlCode::KeepAlive);
        assert!(matches!(send(&mut link, &msg), Err(FrameError::Send(_))));
    }

    #[test]
    fn test_timeout_classification() {
        let err = FrameError::Recv(io::Error::from(io::ErrorKind::WouldBlock));
        assert!(err.is_timeout());
        let err = FrameError::Recv(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(!err.is_timeout());
        assert!(!FrameError::Oversized(999).is_timeout());
    }

    #[test]
    fn test_exchange() {
        let mut link = ScriptedLink::new();
        let reply = Message {
            contact: ContactState::READY,
            ctrl: ControlCode::Success,
            expected_len: 0,
            buf: Vec::new(),
        };
        link.push_reply(&reply);
        let request = Message::control(ContactState::READY, ControlCode::KeepAlive);
        let got = exchange(&mut link, &request).unwrap();
        assert_eq!(got, reply);
        assert_eq!(link.sent().len(), 1);
        assert_eq!(link.sent()[0].ctrl, ControlCode::KeepAlive);
    }
}
