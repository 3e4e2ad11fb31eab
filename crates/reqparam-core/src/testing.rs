//! Byte sources for exercising body readers in tests.
//!
//! [`ScriptedSource`] plays back a body in chunks of chosen sizes, with
//! empty reads and errors where the script puts them. [`StalledSource`]
//! never delivers anything.

use std::collections::VecDeque;
use std::io;

use crate::source::ByteSource;

/// One scripted read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Deliver at most this many bytes.
    Take(usize),
    /// Deliver nothing.
    Zero,
    /// Fail with this error kind.
    Fail(io::ErrorKind),
}

/// A source that plays back `data` following a script.
///
/// Once the script runs out, reads deliver as much as requested until the
/// data is exhausted, then return zero.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    data: Vec<u8>,
    position: usize,
    script: VecDeque<Step>,
    calls: usize,
}

impl ScriptedSource {
    /// A source over `data` with an empty script.
    #[must_use]
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            position: 0,
            script: VecDeque::new(),
            calls: 0,
        }
    }

    /// Append one step to the script.
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.script.push_back(step);
        self
    }

    /// Append reads capped at each of `sizes` (a `0` is an empty read).
    #[must_use]
    pub fn chunks(mut self, sizes: &[usize]) -> Self {
        self.script.extend(sizes.iter().map(|&n| {
            if n == 0 { Step::Zero } else { Step::Take(n) }
        }));
        self
    }

    /// Append `count` empty reads.
    #[must_use]
    pub fn zeros(mut self, count: usize) -> Self {
        self.script.extend(std::iter::repeat_n(Step::Zero, count));
        self
    }

    /// Number of reads requested so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Number of bytes delivered so far.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.position
    }

    /// Bytes not yet delivered.
    #[must_use]
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.position..]
    }

    fn deliver(&mut self, buf: &mut [u8], cap: usize) -> usize {
        let n = buf.len().min(cap).min(self.data.len() - self.position);
        buf[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        n
    }
}

impl ByteSource for ScriptedSource {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.calls += 1;
        match self.script.pop_front() {
            Some(Step::Take(cap)) => Ok(self.deliver(buf, cap)),
            Some(Step::Zero) => Ok(0),
            Some(Step::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
            None => Ok(self.deliver(buf, usize::MAX)),
        }
    }
}

/// A source that never has any bytes ready.
#[derive(Debug, Clone, Default)]
pub struct StalledSource {
    calls: usize,
}

impl StalledSource {
    /// Create a stalled source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reads requested so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl ByteSource for StalledSource {
    fn read_chunk(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        self.calls += 1;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_is_followed_then_reads_are_greedy() {
        let mut source = ScriptedSource::new(b"abcdefgh".to_vec())
            .chunks(&[2, 0, 1])
            .step(Step::Fail(io::ErrorKind::Interrupted));
        let mut buf = [0u8; 4];

        assert_eq!(source.read_chunk(&mut buf).unwrap(), 2);
        assert_eq!(source.read_chunk(&mut buf).unwrap(), 0);
        assert_eq!(source.read_chunk(&mut buf).unwrap(), 1);
        assert_eq!(
            source.read_chunk(&mut buf).unwrap_err().kind(),
            io::ErrorKind::Interrupted
        );
        assert_eq!(source.read_chunk(&mut buf).unwrap(), 4);
        assert_eq!(source.remaining(), b"h");
        assert_eq!(source.calls(), 5);
        assert_eq!(source.consumed(), 7);
    }

    #[test]
    fn stalled_source_counts_calls() {
        let mut source = StalledSource::new();
        let mut buf = [0u8; 4];
        for _ in 0..3 {
            assert_eq!(source.read_chunk(&mut buf).unwrap(), 0);
        }
        assert_eq!(source.calls(), 3);
    }
}
