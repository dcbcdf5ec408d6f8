//! Scripted stand-in for the FPGA used by pipeline tests

use super::ByteChannel;
use crate::error::TransportError;
use std::collections::VecDeque;
use std::io;

/// How the fake device answers each request byte
pub enum Reply {
    /// Send the request byte straight back
    Echo,
    /// Answer with a fixed sequence, one byte per read
    Script(VecDeque<u8>),
}

pub struct ScriptedChannel {
    reply: Reply,
    pending: Option<u8>,
    pub written: Vec<u8>,
    pub reads: usize,
    fail_write_at: Option<usize>,
    fail_read_at: Option<usize>,
}

impl ScriptedChannel {
    pub fn echo() -> Self {
        Self::with_reply(Reply::Echo)
    }

    pub fn scripted(replies: &[u8]) -> Self {
        Self::with_reply(Reply::Script(replies.iter().copied().collect()))
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            pending: None,
            written: Vec::new(),
            reads: 0,
            fail_write_at: None,
            fail_read_at: None,
        }
    }

    /// Fail the write of the `index`-th byte (0-based)
    pub fn fail_write_at(mut self, index: usize) -> Self {
        self.fail_write_at = Some(index);
        self
    }

    /// Fail the `index`-th read (0-based)
    pub fn fail_read_at(mut self, index: usize) -> Self {
        self.fail_read_at = Some(index);
        self
    }
}

impl ByteChannel for ScriptedChannel {
    fn write_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        if self.fail_write_at == Some(self.written.len()) {
            return Err(TransportError::Write(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device unplugged",
            )));
        }
        self.written.push(byte);
        self.pending = Some(byte);
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, TransportError> {
        let index = self.reads;
        self.reads += 1;
        if self.fail_read_at == Some(index) {
            return Err(TransportError::Read(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device unplugged",
            )));
        }
        match self.reply {
            Reply::Echo => self.pending.take().ok_or(TransportError::Closed),
            Reply::Script(ref mut queue) => queue.pop_front().ok_or(TransportError::Closed),
        }
    }
}
