//! APDU transmission to the backend
//!
//! [`transmit`] pushes a command through the [`Transfer`] state machine,
//! doing the framed I/O for every chunk it asks for.

mod machine;

pub use machine::{Action, State, Transfer, MAX_IDLE_EXCHANGES};

use log::{debug, error};
use thiserror::Error;

use crate::apdu::{APDUError, Command, Tpdu, SW};
use crate::net::{self, FrameError, Link, Message};
use crate::session::Slot;

/// Errors that end a transfer
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Command(#[from] APDUError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("slot has no backend connection")]
    NotConnected,

    #[error("backend wants {want} bytes but only {remaining} remain to be sent")]
    ExpectedTooLong { want: usize, remaining: usize },

    #[error("backend aborted the transfer with a NACK procedure byte")]
    Nack,

    #[error("unexpected procedure byte 0x{0:02X}")]
    UnexpectedProcedure(u8),

    #[error("backend sent {got} bytes while {remaining} command bytes are still unsent")]
    Desync { got: usize, remaining: usize },

    #[error("final response is {0} bytes, a status word needs 2")]
    ShortResponse(usize),

    #[error("no command bytes were requested in {0} consecutive exchanges")]
    Stalled(usize),

    #[error("reply fed to a transfer that is not waiting for one")]
    NotAwaiting,

    #[error("response of {needed} bytes does not fit in {available} bytes")]
    InsufficientBuffer { needed: usize, available: usize },
}

/// Send `raw` to the card behind `slot` and collect the response TPDU
///
/// `capacity` is the size of the caller's receive buffer. Nothing is
/// returned unless the whole response fits.
pub fn transmit<L: Link>(
    slot: &mut Slot<L>,
    raw: &[u8],
    capacity: usize,
) -> Result<Tpdu, TransferError> {
    let command = Command::parse(raw)?;
    let (link, state) = slot.split().ok_or(TransferError::NotConnected)?;

    debug!(
        "Transmitting {:?}: CLA={:02X} INS={:02X} P1={:02X} P2={:02X} P3={:02X}",
        command.case(),
        command.cla(),
        command.ins(),
        command.p1(),
        command.p2(),
        command.p3()
    );

    let mut transfer = Transfer::new(command, state.expected_len);
    let mut action = transfer.start();
    loop {
        match action {
            Action::Send { offset, len } => {
                let chunk = &command.as_bytes()[offset..offset + len];
                let request = Message::data(state.contact, chunk);
                let reply = net::exchange(link, &request)?;
                state.contact = reply.contact;
                state.expected_len = reply.expected_len;
                action = transfer.on_reply(&reply.buf, reply.expected_len);
            }
            Action::Complete(tpdu) => {
                if tpdu.len() > capacity {
                    error!("Response of {} bytes does not fit in {} bytes", tpdu.len(), capacity);
                    return Err(TransferError::InsufficientBuffer {
                        needed: tpdu.len(),
                        available: capacity,
                    });
                }
                if SW::is_more_data(tpdu.sw()) || SW::is_wrong_le(tpdu.sw()) {
                    debug!("Card asks for a follow-up command: SW={:04X}", tpdu.sw());
                }
                return Ok(tpdu);
            }
            Action::Fail(e) => {
                error!("Transfer failed: {}", e);
                return Err(e);
            }
        }
    }
}
