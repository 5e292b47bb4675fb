//! Program image files.
//!
//! An image is the raw byte sequence placed into memory by the loader:
//! instruction and data words in little-endian order, no header.

use crate::cpu::memory::MEMORY_SIZE;
use std::path::Path;
use thiserror::Error;

/// Flatten words into little-endian image bytes.
pub fn words_to_bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Reassemble image bytes into words. A trailing odd byte is zero-extended.
pub fn bytes_to_words(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
        .collect()
}

/// Load an image file from disk.
pub fn load_image_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, ImageError> {
    let bytes = std::fs::read(path.as_ref())?;
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }
    if bytes.len() > MEMORY_SIZE {
        return Err(ImageError::TooLarge(bytes.len()));
    }
    Ok(bytes)
}

/// Save an image file to disk.
pub fn save_image_file<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), ImageError> {
    if bytes.len() > MEMORY_SIZE {
        return Err(ImageError::TooLarge(bytes.len()));
    }
    std::fs::write(path.as_ref(), bytes)?;
    Ok(())
}

/// Errors that can occur while reading or writing images.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image is empty")]
    Empty,

    #[error("image of {0} bytes does not fit in memory")]
    TooLarge(usize),
}
