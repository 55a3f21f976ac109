//! Typed extension payloads and the observer registry.
//!
//! The registry is a plain value owned by the caller and handed to
//! [`gif_decode_with`](crate::gif_decode_with) by shared reference; there
//! is no process-wide state. Observers are invoked synchronously while
//! the decoder holds that shared borrow, so they receive an immutable
//! view of the payload and cannot re-enter the registry. The registry is
//! not `Sync`; sharing it between threads requires external
//! synchronization.

use std::fmt;

use crate::{GifError, Result};

/// Hard cap on observers per extension kind.
pub const MAX_OBSERVERS_PER_KIND: usize = 4;

/// The four extension kinds a GIF89a stream can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionKind {
    Application,
    Graphics,
    PlainText,
    Comment,
}

/// Ordered sequence of raw sub-blocks, each at most 255 bytes.
///
/// The stream encodes these as length-prefixed chunks terminated by a
/// zero size byte, so the count is only known once the terminator has
/// been read.
#[derive(Debug, Clone, Default)]
pub struct SubBlocks {
    blocks: Vec<Vec<u8>>,
}

impl SubBlocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, block: Vec<u8>) {
        self.blocks.push(block);
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total payload size across all sub-blocks.
    pub fn total_len(&self) -> usize {
        self.blocks.iter().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.blocks.iter().map(Vec::as_slice)
    }

    /// Flatten the sub-blocks into one contiguous buffer.
    pub fn concat(&self) -> Vec<u8> {
        self.blocks.concat()
    }
}

/// Graphics control extension payload (label `0xF9`). Fixed-size, no
/// sub-block list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsControl {
    pub packed_fields: u8,
    /// Frame delay in hundredths of a second
    pub delay_time: u16,
    pub transparent_color_index: u8,
}

impl GraphicsControl {
    /// Transparent palette index, if the transparency flag is set.
    pub fn transparent_index(&self) -> Option<u8> {
        (self.packed_fields & 0x01 != 0).then_some(self.transparent_color_index)
    }

    /// Raw disposal method bits (0-7).
    pub fn disposal_method(&self) -> u8 {
        (self.packed_fields >> 2) & 0x07
    }

    pub fn delay_millis(&self) -> u32 {
        u32::from(self.delay_time) * 10
    }
}

/// Application extension payload (label `0xFF`).
#[derive(Debug, Clone)]
pub struct ApplicationExtension {
    pub identifier: [u8; 8],
    pub auth_code: [u8; 3],
    pub data: SubBlocks,
}

/// Plain text extension payload (label `0x01`).
#[derive(Debug, Clone)]
pub struct PlainTextExtension {
    pub grid_left: u16,
    pub grid_top: u16,
    pub grid_width: u16,
    pub grid_height: u16,
    pub cell_width: u8,
    pub cell_height: u8,
    pub fg_color_index: u8,
    pub bg_color_index: u8,
    pub data: SubBlocks,
}

/// Comment extension payload (label `0xFE`).
#[derive(Debug, Clone)]
pub struct CommentExtension {
    pub data: SubBlocks,
}

impl CommentExtension {
    /// Comment body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data.concat()).into_owned()
    }
}

/// Handle returned by the `register_*` methods, used to unregister a
/// single observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId {
    kind: ExtensionKind,
    serial: u64,
}

impl ObserverId {
    pub fn kind(&self) -> ExtensionKind {
        self.kind
    }
}

type ApplicationObserver = Box<dyn Fn(&ApplicationExtension)>;
type GraphicsObserver = Box<dyn Fn(&GraphicsControl)>;
type PlainTextObserver = Box<dyn Fn(&PlainTextExtension)>;
type CommentObserver = Box<dyn Fn(&CommentExtension)>;

/// Per-kind observer lists, each capped at [`MAX_OBSERVERS_PER_KIND`].
///
/// Configure the registry before decoding; the decoder only ever borrows
/// it shared.
#[derive(Default)]
pub struct ExtensionRegistry {
    serial: u64,
    application: Vec<(u64, ApplicationObserver)>,
    graphics: Vec<(u64, GraphicsObserver)>,
    plain_text: Vec<(u64, PlainTextObserver)>,
    comment: Vec<(u64, CommentObserver)>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self, kind: ExtensionKind) -> ObserverId {
        self.serial += 1;
        ObserverId {
            kind,
            serial: self.serial,
        }
    }

    pub fn register_application(
        &mut self,
        observer: impl Fn(&ApplicationExtension) + 'static,
    ) -> Result<ObserverId> {
        if self.application.len() >= MAX_OBSERVERS_PER_KIND {
            return Err(GifError::TooManyObservers {
                kind: ExtensionKind::Application,
            });
        }
        let id = self.next_id(ExtensionKind::Application);
        self.application.push((id.serial, Box::new(observer)));
        Ok(id)
    }

    pub fn register_graphics(
        &mut self,
        observer: impl Fn(&GraphicsControl) + 'static,
    ) -> Result<ObserverId> {
        if self.graphics.len() >= MAX_OBSERVERS_PER_KIND {
            return Err(GifError::TooManyObservers {
                kind: ExtensionKind::Graphics,
            });
        }
        let id = self.next_id(ExtensionKind::Graphics);
        self.graphics.push((id.serial, Box::new(observer)));
        Ok(id)
    }

    pub fn register_plain_text(
        &mut self,
        observer: impl Fn(&PlainTextExtension) + 'static,
    ) -> Result<ObserverId> {
        if self.plain_text.len() >= MAX_OBSERVERS_PER_KIND {
            return Err(GifError::TooManyObservers {
                kind: ExtensionKind::PlainText,
            });
        }
        let id = self.next_id(ExtensionKind::PlainText);
        self.plain_text.push((id.serial, Box::new(observer)));
        Ok(id)
    }

    pub fn register_comment(
        &mut self,
        observer: impl Fn(&CommentExtension) + 'static,
    ) -> Result<ObserverId> {
        if self.comment.len() >= MAX_OBSERVERS_PER_KIND {
            return Err(GifError::TooManyObservers {
                kind: ExtensionKind::Comment,
            });
        }
        let id = self.next_id(ExtensionKind::Comment);
        self.comment.push((id.serial, Box::new(observer)));
        Ok(id)
    }

    /// Remove the observer the id was issued for. Unknown ids are a no-op.
    pub fn unregister(&mut self, id: ObserverId) {
        match id.kind {
            ExtensionKind::Application => self.application.retain(|(s, _)| *s != id.serial),
            ExtensionKind::Graphics => self.graphics.retain(|(s, _)| *s != id.serial),
            ExtensionKind::PlainText => self.plain_text.retain(|(s, _)| *s != id.serial),
            ExtensionKind::Comment => self.comment.retain(|(s, _)| *s != id.serial),
        }
    }

    /// Drop every observer of one kind.
    pub fn clear(&mut self, kind: ExtensionKind) {
        match kind {
            ExtensionKind::Application => self.application.clear(),
            ExtensionKind::Graphics => self.graphics.clear(),
            ExtensionKind::PlainText => self.plain_text.clear(),
            ExtensionKind::Comment => self.comment.clear(),
        }
    }

    /// Drop every observer of every kind.
    pub fn clear_all(&mut self) {
        self.application.clear();
        self.graphics.clear();
        self.plain_text.clear();
        self.comment.clear();
    }

    pub fn observer_count(&self, kind: ExtensionKind) -> usize {
        match kind {
            ExtensionKind::Application => self.application.len(),
            ExtensionKind::Graphics => self.graphics.len(),
            ExtensionKind::PlainText => self.plain_text.len(),
            ExtensionKind::Comment => self.comment.len(),
        }
    }

    pub(crate) fn notify_application(&self, ext: &ApplicationExtension) {
        for (_, observer) in &self.application {
            observer(ext);
        }
    }

    pub(crate) fn notify_graphics(&self, ext: &GraphicsControl) {
        for (_, observer) in &self.graphics {
            observer(ext);
        }
    }

    pub(crate) fn notify_plain_text(&self, ext: &PlainTextExtension) {
        for (_, observer) in &self.plain_text {
            observer(ext);
        }
    }

    pub(crate) fn notify_comment(&self, ext: &CommentExtension) {
        for (_, observer) in &self.comment {
            observer(ext);
        }
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("application", &self.application.len())
            .field("graphics", &self.graphics.len())
            .field("plain_text", &self.plain_text.len())
            .field("comment", &self.comment.len())
            .finish()
    }
}
