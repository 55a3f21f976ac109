//! # lucid_gif
//!
//! A 100% Rust decoder for the GIF image container format.
//!
//! ## Features
//!
//! - **Decoder**: Walks the full block stream (screen descriptor, color
//!   tables, extensions, image blocks) and reconstructs every frame's
//!   pixel buffer through a bounds-checked LZW decompressor
//! - **Extension observers**: Typed, per-kind observer lists that receive
//!   parsed extension payloads (comments, application data, graphics
//!   control, plain text) during the decode
//!
//! ## Quick Start
//!
//! ### Decoding a GIF from memory
//!
//! ```ignore
//! use lucid_gif::gif_decode;
//!
//! let data = std::fs::read("animation.gif")?;
//! let gif = gif_decode(&data)?;
//! println!("{}x{}, {} frame(s)", gif.width(), gif.height(), gif.frame_count());
//! ```
//!
//! ### Watching comment extensions
//!
//! ```ignore
//! use lucid_gif::{gif_decode_with, ExtensionRegistry};
//!
//! let mut registry = ExtensionRegistry::new();
//! registry.register_comment(|comment| {
//!     println!("comment: {}", String::from_utf8_lossy(&comment.data.concat()));
//! })?;
//! let gif = gif_decode_with(&data, &registry)?;
//! ```

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub mod decoder;
pub mod extensions;
pub mod lzw;
pub mod source;

pub use decoder::{
    gif_decode, gif_decode_file, gif_decode_file_with, gif_decode_with, Color, Frame, Gif,
    ImageDescriptor, Palette, ScreenDescriptor, Version,
};
pub use extensions::{
    ApplicationExtension, CommentExtension, ExtensionKind, ExtensionRegistry, GraphicsControl,
    ObserverId, PlainTextExtension, SubBlocks,
};

/// Errors that can occur while decoding a GIF stream.
///
/// Every variant raised by the block parser or the LZW decompressor
/// carries the absolute byte offset at which the problem was detected.
#[derive(Debug, Error)]
pub enum GifError {
    /// The input file does not exist
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// The byte source failed while reading or seeking
    #[error("I/O failure at offset {offset}: {source}")]
    Io {
        offset: usize,
        #[source]
        source: io::Error,
    },

    /// The stream ended before the structure being read was complete
    #[error("not enough data at offset {offset}")]
    NotEnoughData { offset: usize },

    /// The first six bytes are neither `GIF87a` nor `GIF89a`
    #[error("invalid GIF signature at offset {offset}")]
    InvalidSignature { offset: usize },

    /// A structurally invalid byte or block was encountered
    #[error("unexpected data at offset {offset}")]
    UnexpectedData { offset: usize },

    /// An image block has neither a local nor a global color table
    #[error("no color table available for image at offset {offset}")]
    NoColorTable { offset: usize },

    /// A decoded color index does not fit the active palette
    #[error("color index {index} out of bounds for palette of {palette_len} at offset {offset}")]
    ColorIndexOutOfBounds {
        offset: usize,
        index: u8,
        palette_len: usize,
    },

    /// A frame index passed to [`Gif::frame`] is out of range
    #[error("invalid image index {index} (gif holds {count} frame(s))")]
    InvalidImageIndex { index: usize, count: usize },

    /// The observer list for this extension kind is full
    #[error("too many observers registered for {kind:?} extensions")]
    TooManyObservers { kind: ExtensionKind },
}

/// Result type for GIF operations.
pub type Result<T> = core::result::Result<T, GifError>;

// Block stream constants shared by the decoder modules
pub(crate) const BLOCK_INTRODUCER_EXT: u8 = 0x21;
pub(crate) const BLOCK_INTRODUCER_IMG: u8 = 0x2C;
pub(crate) const TRAILER: u8 = 0x3B;

pub(crate) const EXT_LABEL_PLAINTEXT: u8 = 0x01;
pub(crate) const EXT_LABEL_GRAPHICS: u8 = 0xF9;
pub(crate) const EXT_LABEL_COMMENT: u8 = 0xFE;
pub(crate) const EXT_LABEL_APPLICATION: u8 = 0xFF;
