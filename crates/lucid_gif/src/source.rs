//! Sequential byte source feeding the block parser.
//!
//! Reads are buffered through a fixed 1 KiB chunk so that files and
//! in-memory buffers go through the same code path. The source never
//! fails on end-of-data: reads past the end yield zero bytes and latch
//! an EOF flag that the parser inspects to report truncation with the
//! exact offset.

use std::io::{self, Read};

use crate::{GifError, Result};

const CHUNK_SIZE: usize = 1024;

/// Buffered byte source over any [`Read`] implementation.
pub struct ByteSource<R> {
    reader: R,
    chunk: [u8; CHUNK_SIZE],
    pos: usize,
    len: usize,
    eof: bool,
    offset: usize,
}

impl<R: Read> ByteSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            chunk: [0; CHUNK_SIZE],
            pos: 0,
            len: 0,
            eof: false,
            offset: 0,
        }
    }

    /// Absolute position in the data stream, used for error reporting.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// True once a read has attempted to go past the end of the data.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    fn refill(&mut self) -> Result<()> {
        self.pos = 0;
        self.len = 0;
        loop {
            match self.reader.read(&mut self.chunk) {
                Ok(n) => {
                    self.len = n;
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(GifError::Io {
                        offset: self.offset,
                        source: e,
                    })
                }
            }
        }
    }

    fn can_read(&mut self) -> Result<bool> {
        if self.pos < self.len {
            return Ok(true);
        }
        if self.eof {
            return Ok(false);
        }
        self.refill()?;
        if self.len == 0 {
            self.eof = true;
            return Ok(false);
        }
        Ok(true)
    }

    /// Read a single byte, advancing the cursor. Past end-of-data this
    /// returns `Ok(0)` and [`is_eof`](Self::is_eof) becomes true.
    pub fn read_byte(&mut self) -> Result<u8> {
        if self.can_read()? {
            let byte = self.chunk[self.pos];
            self.pos += 1;
            self.offset += 1;
            Ok(byte)
        } else {
            Ok(0)
        }
    }

    /// Fill `buf` as far as the data allows, returning the count actually
    /// read. A short count means end-of-data was hit.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() && self.can_read()? {
            let avail = (self.len - self.pos).min(buf.len() - filled);
            buf[filled..filled + avail].copy_from_slice(&self.chunk[self.pos..self.pos + avail]);
            self.pos += avail;
            self.offset += avail;
            filled += avail;
        }
        Ok(filled)
    }

    /// Read a little-endian word: low byte first, then high byte.
    pub fn read_word(&mut self) -> Result<u16> {
        let lo = self.read_byte()?;
        let hi = self.read_byte()?;
        Ok(u16::from(lo) | (u16::from(hi) << 8))
    }

    /// Skip `count` bytes without materializing them. Running out of
    /// data mid-skip is a truncation error, not a silent stop.
    pub fn advance(&mut self, count: usize) -> Result<()> {
        let mut remaining = count;
        while remaining > 0 {
            if !self.can_read()? {
                return Err(GifError::NotEnoughData {
                    offset: self.offset,
                });
            }
            let step = remaining.min(self.len - self.pos);
            self.pos += step;
            self.offset += step;
            remaining -= step;
        }
        Ok(())
    }
}
