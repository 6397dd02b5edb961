//! In-memory backend used by unit tests

use std::collections::VecDeque;
use std::io::{self, Cursor, Read, Write};

use super::{recv, Link, Message};

/// A link that replays queued reply frames and records everything written
#[derive(Debug, Default)]
pub(crate) struct ScriptedLink {
    incoming: VecDeque<u8>,
    outgoing: Vec<u8>,
    write_error: bool,
    shutdown_error: bool,
}

impl ScriptedLink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a reply frame
    pub(crate) fn push_reply(&mut self, msg: &Message) {
        let frame = msg.encode().expect("test reply must fit a frame");
        self.incoming.extend(frame);
    }

    /// Queue raw bytes, for malformed frames
    pub(crate) fn push_raw(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().copied());
    }

    pub(crate) fn fail_writes(&mut self) {
        self.write_error = true;
    }

    pub(crate) fn fail_shutdown(&mut self) {
        self.shutdown_error = true;
    }

    pub(crate) fn written(&self) -> &[u8] {
        &self.outgoing
    }

    /// Decode every frame written so far
    pub(crate) fn sent(&self) -> Vec<Message> {
        let mut wire = Cursor::new(self.outgoing.clone());
        let mut frames = Vec::new();
        while (wire.position() as usize) < self.outgoing.len() {
            frames.push(recv(&mut wire).expect("written frames must decode"));
        }
        frames
    }

    /// Number of queued reply bytes not yet consumed
    pub(crate) fn unread(&self) -> usize {
        self.incoming.len()
    }
}

impl Read for ScriptedLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.incoming.len());
        for (dst, src) in buf.iter_mut().zip(self.incoming.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}

impl Write for ScriptedLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.write_error {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.outgoing.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Link for ScriptedLink {
    fn shutdown(&mut self) -> io::Result<()> {
        if self.shutdown_error {
            Err(io::Error::from(io::ErrorKind::NotConnected))
        } else {
            Ok(())
        }
    }
}
