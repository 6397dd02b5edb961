//! T=0 transfer state machine
//!
//! The backend drives the transfer: every reply says how many command bytes
//! it wants next (`expected_len`) and its buffer is either a procedure byte,
//! a bare status word, an empty administrative marker, or the final response.
//! [`Transfer`] turns each reply into the next [`Action`] without doing any
//! I/O itself.

use crate::apdu::{Command, Procedure, Tpdu};

use super::TransferError;

/// Consecutive exchanges allowed without sending a single command byte
pub const MAX_IDLE_EXCHANGES: usize = 32;

/// Where the transfer stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Ready to pick the next chunk
    Sending,
    /// A chunk went out, waiting for the backend's reply
    AwaitingProcedureByte,
    /// Final response received
    Done,
    /// Transfer aborted
    Failed,
}

/// What the driver must do next
#[derive(Debug)]
pub enum Action {
    /// Send `len` command bytes starting at `offset` (may be empty)
    Send { offset: usize, len: usize },
    /// Transfer finished with this response
    Complete(Tpdu),
    /// Transfer failed
    Fail(TransferError),
}

/// Progress of one command through the backend
#[derive(Debug)]
pub struct Transfer<'a> {
    command: Command<'a>,
    sent: usize,
    expected_len: u32,
    last_len: usize,
    idle: usize,
    state: State,
}

impl<'a> Transfer<'a> {
    /// Start a transfer; `expected_len` is what the backend asked for last
    pub fn new(command: Command<'a>, expected_len: u32) -> Self {
        Self {
            command,
            sent: 0,
            expected_len,
            last_len: 0,
            idle: 0,
            state: State::Sending,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Command bytes not yet handed to the backend
    pub fn remaining(&self) -> usize {
        self.command.len() - self.sent
    }

    /// First action of the transfer
    pub fn start(&mut self) -> Action {
        if self.state != State::Sending {
            return self.fail(TransferError::NotAwaiting);
        }
        self.next_chunk()
    }

    /// Feed the backend's reply to the last chunk
    pub fn on_reply(&mut self, buf: &[u8], expected_len: u32) -> Action {
        if self.state != State::AwaitingProcedureByte {
            return self.fail(TransferError::NotAwaiting);
        }
        self.expected_len = expected_len;
        self.last_len = buf.len();

        match buf.len() {
            0 => {
                self.state = State::Sending;
                self.next_chunk()
            }
            1 => match Procedure::classify(buf[0], self.command.ins()) {
                Procedure::Nack => self.fail(TransferError::Nack),
                Procedure::Ack | Procedure::AckComplement => {
                    self.state = State::Sending;
                    self.next_chunk()
                }
                Procedure::Unexpected(byte) => self.fail(TransferError::UnexpectedProcedure(byte)),
            },
            2 => self.complete(buf),
            got => {
                let remaining = self.remaining();
                if remaining == 0 {
                    self.complete(buf)
                } else {
                    self.fail(TransferError::Desync { got, remaining })
                }
            }
        }
    }

    fn next_chunk(&mut self) -> Action {
        let remaining = self.remaining();

        // The backend is satisfied and nothing is left to send, but the last
        // reply was not a response.
        if remaining == 0 && self.expected_len != 0 {
            return self.fail(TransferError::ShortResponse(self.last_len));
        }

        let want = self.expected_len as usize;
        if remaining < want {
            return self.fail(TransferError::ExpectedTooLong { want, remaining });
        }

        if want == 0 {
            self.idle += 1;
            if self.idle > MAX_IDLE_EXCHANGES {
                return self.fail(TransferError::Stalled(MAX_IDLE_EXCHANGES));
            }
        } else {
            self.idle = 0;
        }

        let offset = self.sent;
        self.sent += want;
        self.state = State::AwaitingProcedureByte;
        Action::Send { offset, len: want }
    }

    fn complete(&mut self, buf: &[u8]) -> Action {
        match Tpdu::from_bytes(buf) {
            Ok(tpdu) => {
                self.state = State::Done;
                Action::Complete(tpdu)
            }
            Err(e) => self.fail(e.into()),
        }
    }

    fn fail(&mut self, error: TransferError) -> Action {
        self.state = State::Failed;
        Action::Fail(error)
    }
}
