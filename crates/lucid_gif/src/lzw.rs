//! Variable-code-width LZW decompression for GIF image rasters.
//!
//! Codes are packed least-significant-bit first across byte boundaries.
//! A stored minimum code size `n` yields an initial read width of `n + 1`
//! bits; the width grows each time the dictionary fills the current code
//! space, up to the 12-bit cap. The dictionary is index-based, mirroring
//! the format's own code numbering, but every lookup is bounds-checked so
//! corrupt input is rejected instead of read out of bounds.

use thiserror::Error;

/// Widest code the format allows.
const MAX_CODE_SIZE: u8 = 12;

/// Dictionary storage covers the transient state just before a width bump.
const TABLE_CAPACITY: usize = 1 << (MAX_CODE_SIZE as usize + 1);

/// Errors raised while expanding a compressed raster.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LzwError {
    /// The stored minimum code size is outside 1..=12
    #[error("unsupported minimum code size {0}")]
    BadMinCodeSize(u8),

    /// A code names a dictionary slot that has not been assigned yet
    #[error("code {code} is not present in the dictionary")]
    InvalidCode { code: u16 },

    /// A prefix chain loops back on itself, which only corrupt input produces
    #[error("corrupt prefix chain at code {code}")]
    CorruptPrefixChain { code: u16 },

    /// The compressed stream ran out before the raster was complete
    #[error("compressed stream ended after {actual} of {expected} indices")]
    ShortData { expected: usize, actual: usize },

    /// The compressed stream expands to more indices than the raster holds
    #[error("compressed stream expands past the expected {expected} indices")]
    ExcessData { expected: usize },
}

#[derive(Clone, Copy)]
struct Entry {
    length: u16,
    prefix: Option<u16>,
    suffix: u8,
}

struct Dictionary {
    entries: Vec<Entry>,
    min_code_size: u8,
    code_size: u8,
    clear_code: u16,
    end_code: u16,
}

impl Dictionary {
    fn new(min_code_size: u8) -> Self {
        let clear_code = 1u16 << min_code_size;
        let mut dict = Self {
            entries: Vec::with_capacity(TABLE_CAPACITY),
            min_code_size,
            code_size: 0,
            clear_code,
            end_code: clear_code + 1,
        };
        dict.reset();
        dict
    }

    /// Rebuild the literal entries and reset the read width. Runs at
    /// decompressor entry and on every clear code.
    fn reset(&mut self) {
        self.entries.clear();
        for value in 0..self.clear_code {
            self.entries.push(Entry {
                length: 1,
                prefix: None,
                suffix: value as u8,
            });
        }
        // Clear and end codes occupy the next two slots; they are matched
        // before any table lookup and never expanded.
        for _ in 0..2 {
            self.entries.push(Entry {
                length: 0,
                prefix: None,
                suffix: 0,
            });
        }
        self.code_size = (self.min_code_size + 1).min(MAX_CODE_SIZE);
    }

    /// Index the next learned entry will occupy.
    fn next_code(&self) -> u16 {
        self.entries.len() as u16
    }

    /// First symbol of the sequence named by `code`, found by walking the
    /// prefix links back to a literal.
    fn first_symbol(&self, code: u16) -> Result<u8, LzwError> {
        let mut cursor = code;
        loop {
            let entry = &self.entries[cursor as usize];
            match entry.prefix {
                None => return Ok(entry.suffix),
                Some(p) if p == cursor => return Err(LzwError::CorruptPrefixChain { code: cursor }),
                Some(p) => cursor = p,
            }
        }
    }

    /// Append a learned entry and widen the read width once the next free
    /// index reaches the current code space.
    fn learn(&mut self, prefix: u16, suffix: u8) {
        if self.entries.len() >= TABLE_CAPACITY {
            return;
        }
        let length = self.entries[prefix as usize].length + 1;
        self.entries.push(Entry {
            length,
            prefix: Some(prefix),
            suffix,
        });
        if self.entries.len() == (1usize << self.code_size) && self.code_size < MAX_CODE_SIZE {
            self.code_size += 1;
        }
    }

    /// Write the symbol run named by `code` to `output`, last-resolved
    /// symbol first.
    fn expand(&self, code: u16, expected: usize, output: &mut Vec<u8>) -> Result<(), LzwError> {
        let run = self.entries[code as usize].length as usize;
        if output.len() + run > expected {
            return Err(LzwError::ExcessData { expected });
        }
        let base = output.len();
        output.resize(base + run, 0);

        let mut slot = run;
        let mut cursor = Some(code);
        while let Some(c) = cursor {
            let entry = &self.entries[c as usize];
            if entry.prefix == Some(c) {
                return Err(LzwError::CorruptPrefixChain { code: c });
            }
            slot -= 1;
            output[base + slot] = entry.suffix;
            cursor = entry.prefix;
        }
        Ok(())
    }
}

/// Bit cursor extracting codes low-to-high from the compressed buffer.
struct CodeReader<'a> {
    data: &'a [u8],
    byte: usize,
    bit: u8,
}

impl<'a> CodeReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte: 0,
            bit: 0,
        }
    }

    /// Read one code of `code_size` bits, or `None` once fewer bits remain.
    fn read(&mut self, code_size: u8) -> Option<u16> {
        let mut code = 0u16;
        for i in 0..code_size {
            if self.byte >= self.data.len() {
                return None;
            }
            let bit = (self.data[self.byte] >> self.bit) & 1;
            code |= u16::from(bit) << i;
            self.bit += 1;
            if self.bit == 8 {
                self.bit = 0;
                self.byte += 1;
            }
        }
        Some(code)
    }
}

/// Expand a flattened compressed raster into exactly `expected` color
/// indices.
///
/// `min_code_size` is the byte stored in front of the image's sub-block
/// stream. Decompression stops at the end code or when input runs out;
/// producing anything other than `expected` indices is an error.
pub fn decompress(min_code_size: u8, data: &[u8], expected: usize) -> Result<Vec<u8>, LzwError> {
    if min_code_size == 0 || min_code_size > MAX_CODE_SIZE {
        return Err(LzwError::BadMinCodeSize(min_code_size));
    }

    let mut dict = Dictionary::new(min_code_size);
    let mut reader = CodeReader::new(data);
    let mut output = Vec::with_capacity(expected);
    let mut prev_code: Option<u16> = None;

    while output.len() < expected {
        let Some(code) = reader.read(dict.code_size) else {
            break;
        };

        if code == dict.clear_code {
            dict.reset();
            prev_code = None;
            continue;
        }
        if code == dict.end_code {
            break;
        }

        match prev_code {
            // The first code after a reset must be a seeded literal.
            None => {
                if code >= dict.clear_code {
                    return Err(LzwError::InvalidCode { code });
                }
            }
            Some(prev) => {
                let next = dict.next_code();
                if code > next {
                    return Err(LzwError::InvalidCode { code });
                }
                // KwKwK: a code naming the not-yet-assigned slot takes its
                // suffix from the previous sequence instead.
                let source = if code == next { prev } else { code };
                let suffix = dict.first_symbol(source)?;
                dict.learn(prev, suffix);
            }
        }

        dict.expand(code, expected, &mut output)?;
        prev_code = Some(code);
    }

    if output.len() != expected {
        return Err(LzwError::ShortData {
            expected,
            actual: output.len(),
        });
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Codes below are hand-packed lsb-first at 3 bits for min code size 2:
    // clear = 4, end = 5, first learned entry = 6.

    #[test]
    fn expands_literals() {
        // clear, 1, 1, end
        let data = [0x4C, 0x0A];
        assert_eq!(decompress(2, &data, 2).unwrap(), vec![1, 1]);
    }

    #[test]
    fn kwkwk_case_uses_previous_first_symbol() {
        // clear, 1, 6 -- code 6 is the entry being defined
        let data = [0x8C, 0x01];
        assert_eq!(decompress(2, &data, 3).unwrap(), vec![1, 1, 1]);
    }

    #[test]
    fn clear_code_rebuilds_dictionary() {
        // clear, 1, 1, clear, 2, 2, end
        let data = [0x4C, 0x28, 0x15];
        assert_eq!(decompress(2, &data, 4).unwrap(), vec![1, 1, 2, 2]);
    }

    #[test]
    fn learned_code_is_invalid_after_clear() {
        // clear, 1, 1, clear, 6 -- entry 6 was learned before the reset
        let data = [0x4C, 0x68];
        assert_eq!(
            decompress(2, &data, 8),
            Err(LzwError::InvalidCode { code: 6 })
        );
    }

    #[test]
    fn code_beyond_next_slot_is_invalid() {
        // clear, 1, 7 -- slot 7 is past the next free index (6)
        let data = [0xCC, 0x01];
        assert_eq!(
            decompress(2, &data, 8),
            Err(LzwError::InvalidCode { code: 7 })
        );
    }

    #[test]
    fn truncated_stream_is_short_data() {
        // clear, 1, end but the raster claims four pixels
        let data = [0x4C, 0x01];
        assert_eq!(
            decompress(2, &data, 4),
            Err(LzwError::ShortData {
                expected: 4,
                actual: 1
            })
        );
    }

    #[test]
    fn min_code_size_bounds() {
        assert_eq!(decompress(0, &[], 0), Err(LzwError::BadMinCodeSize(0)));
        assert_eq!(decompress(13, &[], 0), Err(LzwError::BadMinCodeSize(13)));
    }

    #[test]
    fn roundtrip_with_reference_encoder() {
        // Long enough to force several width escalations past 3 bits.
        let indices: Vec<u8> = (0..4096u32).map(|i| ((i * 7 + i / 5) % 4) as u8).collect();
        let compressed = weezl::encode::Encoder::new(weezl::BitOrder::Lsb, 2)
            .encode(&indices)
            .unwrap();
        assert_eq!(decompress(2, &compressed, indices.len()).unwrap(), indices);
    }
}
