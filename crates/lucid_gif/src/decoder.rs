//! GIF container parsing and frame assembly.
//!
//! The decoder is a single blocking state machine driven by block
//! introducer bytes: signature, logical screen descriptor, optional
//! global color table, then extensions (`0x21`) and image blocks
//! (`0x2C`) until the trailer (`0x3B`). Each image block runs the LZW
//! decompressor over its flattened sub-block stream and maps the
//! resulting index stream through the active palette. Decoding is
//! all-or-nothing: the first failure aborts with the byte offset where
//! it was detected.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::extensions::{
    ApplicationExtension, CommentExtension, ExtensionKind, ExtensionRegistry, GraphicsControl,
    PlainTextExtension, SubBlocks,
};
use crate::lzw::{self, LzwError};
use crate::source::ByteSource;
use crate::{
    GifError, Result, BLOCK_INTRODUCER_EXT, BLOCK_INTRODUCER_IMG, EXT_LABEL_APPLICATION,
    EXT_LABEL_COMMENT, EXT_LABEL_GRAPHICS, EXT_LABEL_PLAINTEXT, TRAILER,
};

/// GIF format version, taken from the 6-byte signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Gif87a,
    Gif89a,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Gif87a => f.write_str("GIF87a"),
            Version::Gif89a => f.write_str("GIF89a"),
        }
    }
}

/// One RGB palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Color table of 2 to 256 entries; the size is always a power of two.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn get(&self, index: u8) -> Option<Color> {
        self.colors.get(usize::from(index)).copied()
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }
}

/// Logical screen descriptor, the 7 bytes following the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenDescriptor {
    pub width: u16,
    pub height: u16,
    pub packed_fields: u8,
    pub background_index: u8,
    pub pixel_aspect_ratio: u8,
}

impl ScreenDescriptor {
    /// Bit 7 of the packed fields: a global color table follows.
    pub fn has_global_table(&self) -> bool {
        self.packed_fields & 0x80 != 0
    }
}

/// Image descriptor, the 9 bytes following an image introducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub packed_fields: u8,
}

impl ImageDescriptor {
    /// Bit 7 of the packed fields: a local color table follows.
    pub fn has_local_table(&self) -> bool {
        self.packed_fields & 0x80 != 0
    }
}

/// A decoded image block: descriptor plus `width * height` RGB pixels in
/// row-major order.
#[derive(Debug, Clone)]
pub struct Frame {
    pub descriptor: ImageDescriptor,
    pub pixels: Vec<Color>,
}

impl Frame {
    pub fn width(&self) -> u16 {
        self.descriptor.width
    }

    pub fn height(&self) -> u16 {
        self.descriptor.height
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<Color> {
        if x >= self.descriptor.width || y >= self.descriptor.height {
            return None;
        }
        let index = usize::from(y) * usize::from(self.descriptor.width) + usize::from(x);
        self.pixels.get(index).copied()
    }
}

/// A fully decoded GIF: version, screen descriptor, global palette and
/// every frame in stream order.
#[derive(Debug, Clone)]
pub struct Gif {
    version: Version,
    screen: ScreenDescriptor,
    global_palette: Option<Palette>,
    frames: Vec<Frame>,
}

impl Gif {
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn screen(&self) -> &ScreenDescriptor {
        &self.screen
    }

    /// Logical screen width in pixels.
    pub fn width(&self) -> u16 {
        self.screen.width
    }

    /// Logical screen height in pixels.
    pub fn height(&self) -> u16 {
        self.screen.height
    }

    pub fn global_palette(&self) -> Option<&Palette> {
        self.global_palette.as_ref()
    }

    /// Background color, resolved through the global palette when one
    /// exists and covers the background index.
    pub fn background_color(&self) -> Option<Color> {
        self.global_palette
            .as_ref()
            .and_then(|palette| palette.get(self.screen.background_index))
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Result<&Frame> {
        self.frames.get(index).ok_or(GifError::InvalidImageIndex {
            index,
            count: self.frames.len(),
        })
    }
}

/// Decode a complete GIF stream from memory.
///
/// # Example
///
/// ```no_run
/// let data = std::fs::read("animation.gif").unwrap();
/// let gif = lucid_gif::gif_decode(&data).unwrap();
/// assert!(gif.frame_count() > 0);
/// ```
pub fn gif_decode(data: &[u8]) -> Result<Gif> {
    Decoder::new(ByteSource::new(data), None).decode()
}

/// Decode a complete GIF stream from memory, notifying the registry's
/// observers for every extension block encountered.
pub fn gif_decode_with(data: &[u8], registry: &ExtensionRegistry) -> Result<Gif> {
    Decoder::new(ByteSource::new(data), Some(registry)).decode()
}

/// Decode a GIF file. A missing file is [`GifError::NotFound`].
pub fn gif_decode_file(path: impl AsRef<Path>) -> Result<Gif> {
    let file = open_file(path.as_ref())?;
    Decoder::new(ByteSource::new(file), None).decode()
}

/// Decode a GIF file with extension observers.
pub fn gif_decode_file_with(path: impl AsRef<Path>, registry: &ExtensionRegistry) -> Result<Gif> {
    let file = open_file(path.as_ref())?;
    Decoder::new(ByteSource::new(file), Some(registry)).decode()
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => GifError::NotFound(path.to_path_buf()),
        _ => GifError::Io {
            offset: 0,
            source: e,
        },
    })
}

struct Decoder<'r, R> {
    source: ByteSource<R>,
    registry: Option<&'r ExtensionRegistry>,
}

impl<'r, R: Read> Decoder<'r, R> {
    fn new(source: ByteSource<R>, registry: Option<&'r ExtensionRegistry>) -> Self {
        Self { source, registry }
    }

    fn decode(mut self) -> Result<Gif> {
        let version = self.validate_header()?;
        let screen = self.read_screen_descriptor()?;
        let global_palette = if screen.has_global_table() {
            Some(self.read_color_table(screen.packed_fields)?)
        } else {
            None
        };

        let mut gif = Gif {
            version,
            screen,
            global_palette,
            frames: Vec::new(),
        };

        loop {
            let introducer = self.expect_byte()?;
            match introducer {
                TRAILER => break,
                BLOCK_INTRODUCER_EXT => self.read_extension()?,
                BLOCK_INTRODUCER_IMG => {
                    let frame = self.read_image(gif.screen, gif.global_palette.as_ref())?;
                    gif.frames.push(frame);
                }
                _ => {
                    return Err(GifError::UnexpectedData {
                        offset: self.source.offset() - 1,
                    })
                }
            }
        }

        Ok(gif)
    }

    /// Read one byte, treating end-of-data as truncation.
    fn expect_byte(&mut self) -> Result<u8> {
        let byte = self.source.read_byte()?;
        if self.source.is_eof() {
            return Err(GifError::NotEnoughData {
                offset: self.source.offset(),
            });
        }
        Ok(byte)
    }

    /// Read one little-endian word, treating end-of-data as truncation.
    fn expect_word(&mut self) -> Result<u16> {
        let word = self.source.read_word()?;
        if self.source.is_eof() {
            return Err(GifError::NotEnoughData {
                offset: self.source.offset(),
            });
        }
        Ok(word)
    }

    /// Fill `buf` completely, treating a short read as truncation.
    fn expect_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        let read = self.source.read_bytes(buf)?;
        if read != buf.len() {
            return Err(GifError::NotEnoughData {
                offset: self.source.offset(),
            });
        }
        Ok(())
    }

    fn validate_header(&mut self) -> Result<Version> {
        let mut signature = [0u8; 6];
        self.expect_bytes(&mut signature)?;
        match &signature {
            b"GIF87a" => Ok(Version::Gif87a),
            b"GIF89a" => Ok(Version::Gif89a),
            _ => Err(GifError::InvalidSignature { offset: 0 }),
        }
    }

    fn read_screen_descriptor(&mut self) -> Result<ScreenDescriptor> {
        Ok(ScreenDescriptor {
            width: self.expect_word()?,
            height: self.expect_word()?,
            packed_fields: self.expect_byte()?,
            background_index: self.expect_byte()?,
            pixel_aspect_ratio: self.expect_byte()?,
        })
    }

    /// Read `2 << (fields & 7)` RGB triples.
    fn read_color_table(&mut self, packed_fields: u8) -> Result<Palette> {
        let count = 2usize << (packed_fields & 0x07);
        let mut raw = vec![0u8; count * 3];
        self.expect_bytes(&mut raw)?;
        let colors = raw
            .chunks_exact(3)
            .map(|rgb| Color {
                r: rgb[0],
                g: rgb[1],
                b: rgb[2],
            })
            .collect();
        Ok(Palette { colors })
    }

    /// Skip a sub-block list without materializing it, still failing on
    /// truncation.
    fn skip_sub_blocks(&mut self) -> Result<()> {
        loop {
            let size = self.expect_byte()?;
            if size == 0 {
                return Ok(());
            }
            self.source.advance(usize::from(size))?;
        }
    }

    /// Collect a sub-block list, preserving the block boundaries.
    fn read_sub_blocks(&mut self) -> Result<SubBlocks> {
        let mut blocks = SubBlocks::new();
        loop {
            let size = self.expect_byte()?;
            if size == 0 {
                return Ok(blocks);
            }
            let mut block = vec![0u8; usize::from(size)];
            self.expect_bytes(&mut block)?;
            blocks.push(block);
        }
    }

    /// Collect a sub-block list into one flattened buffer, as the LZW
    /// decompressor consumes it.
    fn read_raster_data(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        loop {
            let size = self.expect_byte()?;
            if size == 0 {
                return Ok(data);
            }
            let start = data.len();
            data.resize(start + usize::from(size), 0);
            self.expect_bytes(&mut data[start..])?;
        }
    }

    fn wants(&self, kind: ExtensionKind) -> bool {
        self.registry
            .is_some_and(|registry| registry.observer_count(kind) > 0)
    }

    fn read_extension(&mut self) -> Result<()> {
        let label = self.expect_byte()?;
        match label {
            EXT_LABEL_APPLICATION => self.read_ext_application(),
            EXT_LABEL_PLAINTEXT => self.read_ext_plain_text(),
            EXT_LABEL_GRAPHICS => self.read_ext_graphics(),
            EXT_LABEL_COMMENT => self.read_ext_comment(),
            _ => Err(GifError::UnexpectedData {
                offset: self.source.offset() - 1,
            }),
        }
    }

    fn read_ext_application(&mut self) -> Result<()> {
        if !self.wants(ExtensionKind::Application) {
            return self.skip_sub_blocks();
        }

        // Header block size byte, always 11 for this extension
        self.expect_byte()?;

        let mut identifier = [0u8; 8];
        self.expect_bytes(&mut identifier)?;
        let mut auth_code = [0u8; 3];
        self.expect_bytes(&mut auth_code)?;
        let data = self.read_sub_blocks()?;

        let ext = ApplicationExtension {
            identifier,
            auth_code,
            data,
        };
        if let Some(registry) = self.registry {
            registry.notify_application(&ext);
        }
        Ok(())
    }

    fn read_ext_plain_text(&mut self) -> Result<()> {
        if !self.wants(ExtensionKind::PlainText) {
            return self.skip_sub_blocks();
        }

        // Header block size byte, always 12 for this extension
        self.expect_byte()?;

        let ext = PlainTextExtension {
            grid_left: self.expect_word()?,
            grid_top: self.expect_word()?,
            grid_width: self.expect_word()?,
            grid_height: self.expect_word()?,
            cell_width: self.expect_byte()?,
            cell_height: self.expect_byte()?,
            fg_color_index: self.expect_byte()?,
            bg_color_index: self.expect_byte()?,
            data: self.read_sub_blocks()?,
        };
        if let Some(registry) = self.registry {
            registry.notify_plain_text(&ext);
        }
        Ok(())
    }

    fn read_ext_graphics(&mut self) -> Result<()> {
        if !self.wants(ExtensionKind::Graphics) {
            return self.skip_sub_blocks();
        }

        // Fixed payload: size byte, packed byte, delay word, transparent
        // index, block terminator
        self.expect_byte()?;
        let ext = GraphicsControl {
            packed_fields: self.expect_byte()?,
            delay_time: self.expect_word()?,
            transparent_color_index: self.expect_byte()?,
        };
        if let Some(registry) = self.registry {
            registry.notify_graphics(&ext);
        }
        self.expect_byte()?;
        Ok(())
    }

    fn read_ext_comment(&mut self) -> Result<()> {
        if !self.wants(ExtensionKind::Comment) {
            return self.skip_sub_blocks();
        }

        let ext = CommentExtension {
            data: self.read_sub_blocks()?,
        };
        if let Some(registry) = self.registry {
            registry.notify_comment(&ext);
        }
        Ok(())
    }

    fn read_image(
        &mut self,
        screen: ScreenDescriptor,
        global_palette: Option<&Palette>,
    ) -> Result<Frame> {
        let descriptor = ImageDescriptor {
            left: self.expect_word()?,
            top: self.expect_word()?,
            width: self.expect_word()?,
            height: self.expect_word()?,
            packed_fields: self.expect_byte()?,
        };

        // A frame must fit the logical screen; malformed descriptors are
        // rejected, never clamped.
        let fits = u32::from(descriptor.left) + u32::from(descriptor.width)
            <= u32::from(screen.width)
            && u32::from(descriptor.top) + u32::from(descriptor.height) <= u32::from(screen.height);
        if !fits {
            return Err(GifError::UnexpectedData {
                offset: self.source.offset(),
            });
        }

        let local_palette = if descriptor.has_local_table() {
            Some(self.read_color_table(descriptor.packed_fields)?)
        } else {
            None
        };
        let active_palette = match (local_palette.as_ref(), global_palette) {
            (Some(palette), _) => palette,
            (None, Some(palette)) => palette,
            (None, None) => {
                return Err(GifError::NoColorTable {
                    offset: self.source.offset(),
                })
            }
        };

        let min_code_size = self.expect_byte()?;
        let raster_offset = self.source.offset();
        let compressed = self.read_raster_data()?;

        let expected = usize::from(descriptor.width) * usize::from(descriptor.height);
        let indices = lzw::decompress(min_code_size, &compressed, expected)
            .map_err(|e| self.map_lzw_error(e, raster_offset))?;

        assemble_frame(descriptor, &indices, active_palette, raster_offset)
    }

    fn map_lzw_error(&self, err: LzwError, raster_offset: usize) -> GifError {
        match err {
            LzwError::ShortData { .. } => GifError::NotEnoughData {
                offset: self.source.offset(),
            },
            _ => GifError::UnexpectedData {
                offset: raster_offset,
            },
        }
    }
}

/// Map a decoded index stream through the active palette. An index past
/// the palette is a decode error, never clamped.
fn assemble_frame(
    descriptor: ImageDescriptor,
    indices: &[u8],
    palette: &Palette,
    offset: usize,
) -> Result<Frame> {
    let mut pixels = Vec::with_capacity(indices.len());
    for &index in indices {
        let color = palette.get(index).ok_or(GifError::ColorIndexOutOfBounds {
            offset,
            index,
            palette_len: palette.len(),
        })?;
        pixels.push(color);
    }
    Ok(Frame { descriptor, pixels })
}
