//! Shared helpers for synthesizing GIF byte streams in tests.

#![allow(dead_code)]

/// Compress an index stream with the reference LZW encoder.
pub fn lzw_compress(min_code_size: u8, indices: &[u8]) -> Vec<u8> {
    weezl::encode::Encoder::new(weezl::BitOrder::Lsb, min_code_size)
        .encode(indices)
        .unwrap()
}

/// Wrap a payload into a length-prefixed sub-block list with terminator.
pub fn sub_blocks(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in data.chunks(255) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
    out
}

fn palette_size_bits(colors: &[(u8, u8, u8)]) -> u8 {
    assert!(
        colors.len().is_power_of_two() && colors.len() >= 2,
        "palette size must be a power of two >= 2"
    );
    colors.len().trailing_zeros() as u8 - 1
}

fn palette_bytes(colors: &[(u8, u8, u8)]) -> Vec<u8> {
    colors.iter().flat_map(|&(r, g, b)| [r, g, b]).collect()
}

/// Assembles a syntactically valid GIF stream block by block.
pub struct GifBuilder {
    signature: [u8; 6],
    width: u16,
    height: u16,
    background: u8,
    global_palette: Option<Vec<(u8, u8, u8)>>,
    body: Vec<u8>,
}

impl GifBuilder {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            signature: *b"GIF89a",
            width,
            height,
            background: 0,
            global_palette: None,
            body: Vec::new(),
        }
    }

    pub fn signature(mut self, signature: &[u8; 6]) -> Self {
        self.signature = *signature;
        self
    }

    pub fn global_palette(mut self, colors: &[(u8, u8, u8)]) -> Self {
        self.global_palette = Some(colors.to_vec());
        self
    }

    pub fn background(mut self, index: u8) -> Self {
        self.background = index;
        self
    }

    /// Append an image block with LZW-compressed pixel indices.
    pub fn image(
        self,
        left: u16,
        top: u16,
        width: u16,
        height: u16,
        local_palette: Option<&[(u8, u8, u8)]>,
        min_code_size: u8,
        indices: &[u8],
    ) -> Self {
        let compressed = lzw_compress(min_code_size, indices);
        self.image_raw(left, top, width, height, local_palette, min_code_size, &compressed)
    }

    /// Append an image block with a caller-supplied compressed raster.
    pub fn image_raw(
        mut self,
        left: u16,
        top: u16,
        width: u16,
        height: u16,
        local_palette: Option<&[(u8, u8, u8)]>,
        min_code_size: u8,
        compressed: &[u8],
    ) -> Self {
        self.body.push(0x2C);
        for word in [left, top, width, height] {
            self.body.extend_from_slice(&word.to_le_bytes());
        }
        match local_palette {
            Some(colors) => {
                self.body.push(0x80 | palette_size_bits(colors));
                self.body.extend_from_slice(&palette_bytes(colors));
            }
            None => self.body.push(0),
        }
        self.body.push(min_code_size);
        self.body.extend_from_slice(&sub_blocks(compressed));
        self
    }

    pub fn comment(mut self, text: &str) -> Self {
        self.body.extend_from_slice(&[0x21, 0xFE]);
        self.body.extend_from_slice(&sub_blocks(text.as_bytes()));
        self
    }

    pub fn application(mut self, identifier: &[u8; 8], auth_code: &[u8; 3], data: &[u8]) -> Self {
        self.body.extend_from_slice(&[0x21, 0xFF, 11]);
        self.body.extend_from_slice(identifier);
        self.body.extend_from_slice(auth_code);
        self.body.extend_from_slice(&sub_blocks(data));
        self
    }

    pub fn graphics_control(mut self, packed: u8, delay: u16, transparent: u8) -> Self {
        self.body.extend_from_slice(&[0x21, 0xF9, 4, packed]);
        self.body.extend_from_slice(&delay.to_le_bytes());
        self.body.extend_from_slice(&[transparent, 0]);
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn plain_text(
        mut self,
        grid: (u16, u16, u16, u16),
        cell: (u8, u8),
        fg: u8,
        bg: u8,
        text: &str,
    ) -> Self {
        self.body.extend_from_slice(&[0x21, 0x01, 12]);
        for word in [grid.0, grid.1, grid.2, grid.3] {
            self.body.extend_from_slice(&word.to_le_bytes());
        }
        self.body.extend_from_slice(&[cell.0, cell.1, fg, bg]);
        self.body.extend_from_slice(&sub_blocks(text.as_bytes()));
        self
    }

    /// Append raw bytes to the block stream, for malformed-input tests.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(bytes);
        self
    }

    /// Assemble the stream without the trailing `0x3B`.
    pub fn build_without_trailer(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        match &self.global_palette {
            Some(colors) => {
                out.push(0x80 | palette_size_bits(colors));
                out.push(self.background);
                out.push(0);
                out.extend_from_slice(&palette_bytes(colors));
            }
            None => {
                out.push(0);
                out.push(self.background);
                out.push(0);
            }
        }
        out.extend_from_slice(&self.body);
        out
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = self.build_without_trailer();
        out.push(0x3B);
        out
    }
}
