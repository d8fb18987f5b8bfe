//! Broadcast identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a broadcast carousel (a logical channel on which files are
/// transmitted repeatedly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CarouselId(u8);

impl CarouselId {
    /// Construct a `CarouselId` from its wire value.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// The raw wire value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for CarouselId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// Identifier of a file transmission, unique within its carousel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(u32);

impl FileId {
    /// Construct a `FileId` from its wire value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The raw wire value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Key of an in-flight file reassembly: carousel plus file id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssemblyKey {
    /// Carousel the file is broadcast on.
    pub carousel: CarouselId,
    /// File transmission id within the carousel.
    pub file: FileId,
}

impl AssemblyKey {
    /// Construct a key from raw wire values.
    #[must_use]
    pub const fn new(carousel: u8, file: u32) -> Self {
        Self {
            carousel: CarouselId::new(carousel),
            file: FileId::new(file),
        }
    }
}

impl fmt::Display for AssemblyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.carousel, self.file)
    }
}
