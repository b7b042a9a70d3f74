//! # Mock Transport
//!
//! Scripted transport for exercising the protocol engine without hardware.
//! Each queued chunk is returned by exactly one `read` call; once the script
//! runs dry every read returns no bytes, like a serial read timeout.

use std::collections::VecDeque;
use std::io;

use crate::error::{NiimbotError, Result};

use super::Transport;

#[derive(Debug, Default)]
pub struct MockTransport {
    reads: VecDeque<Vec<u8>>,
    /// Every buffer passed to `write`, in order
    pub written: Vec<Vec<u8>>,
    /// Number of `read` calls served so far
    pub read_calls: usize,
    closed: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one chunk to be returned by a future `read`.
    pub fn push_read(&mut self, chunk: impl Into<Vec<u8>>) {
        self.reads.push_back(chunk.into());
    }

    /// Queue a read that returns nothing.
    pub fn push_empty_read(&mut self) {
        self.reads.push_back(Vec::new());
    }

    /// Make every later read and write fail, as a closed port would.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn pending_reads(&self) -> usize {
        self.reads.len()
    }
}

impl Transport for MockTransport {
    fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        if self.closed {
            return Err(closed_port());
        }
        self.read_calls += 1;

        let Some(mut chunk) = self.reads.pop_front() else {
            return Ok(Vec::new());
        };
        if chunk.len() > max_len {
            let rest = chunk.split_off(max_len);
            self.reads.push_front(rest);
        }
        Ok(chunk)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.closed {
            return Err(closed_port());
        }
        self.written.push(data.to_vec());
        Ok(())
    }
}

fn closed_port() -> NiimbotError {
    io::Error::new(io::ErrorKind::NotConnected, "port closed").into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_follow_script() {
        let mut t = MockTransport::new();
        t.push_read(vec![1, 2, 3]);
        t.push_empty_read();
        t.push_read(vec![4]);

        assert_eq!(t.read(1024).unwrap(), vec![1, 2, 3]);
        assert_eq!(t.read(1024).unwrap(), Vec::<u8>::new());
        assert_eq!(t.read(1024).unwrap(), vec![4]);
        assert_eq!(t.read(1024).unwrap(), Vec::<u8>::new());
        assert_eq!(t.read_calls, 4);
    }

    #[test]
    fn test_read_respects_max_len() {
        let mut t = MockTransport::new();
        t.push_read(vec![1, 2, 3]);
        assert_eq!(t.read(2).unwrap(), vec![1, 2]);
        assert_eq!(t.read(2).unwrap(), vec![3]);
    }

    #[test]
    fn test_records_writes() {
        let mut t = MockTransport::new();
        t.write(&[9, 9]).unwrap();
        assert_eq!(t.written, vec![vec![9, 9]]);
    }

    #[test]
    fn test_closed_port_fails() {
        let mut t = MockTransport::new();
        t.close();
        assert!(matches!(
            t.read(1),
            Err(NiimbotError::Io(e)) if e.kind() == io::ErrorKind::NotConnected
        ));
        assert!(matches!(t.write(&[1]), Err(NiimbotError::Io(_))));
    }
}
