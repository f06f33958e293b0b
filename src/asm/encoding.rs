//! Formatters which can read and write object images to disk.
//!
//! The [`ObjFileFormat`] trait describes an implementation of reading/writing object images.
//! This module provides two implementations of the trait:
//! - [`BinaryFormat`]: the raw word stream, as loaded by LC-3 simulators
//! - [`TextFormat`]: one hex word per line, for reading and diffing

use super::ObjectImage;

/// A trait defining object file formats.
pub trait ObjFileFormat {
    /// Representation of the serialized format.
    ///
    /// For binary formats, `[u8]` should be used.
    /// For text-based formats,`str` should be used.
    type Stream: ToOwned + ?Sized;
    /// Serializes into the stream format.
    fn serialize(o: &ObjectImage) -> <Self::Stream as ToOwned>::Owned;
    /// Deserializes from the stream format, returning `None`
    /// if an error occurred during deserialization.
    fn deserialize(i: &Self::Stream) -> Option<ObjectImage>;
}

// BINARY!
/// A binary format of object image data.
///
/// The image is written as a flat sequence of big-endian 16-bit words.
/// Each `.ORIG` block contributes its load address, followed by its contents.
///
/// # Example
/// ```
/// use lc3_asm::asm::ObjectImage;
/// use lc3_asm::asm::encoding::{BinaryFormat, ObjFileFormat};
///
/// let image = ObjectImage::new(vec![0x3000, 0x5020]);
/// assert_eq!(BinaryFormat::serialize(&image), [0x30, 0x00, 0x50, 0x20]);
/// assert_eq!(BinaryFormat::deserialize(&[0x30, 0x00, 0x50, 0x20]), Some(image));
/// ```
pub struct BinaryFormat;

impl ObjFileFormat for BinaryFormat {
    type Stream = [u8];

    fn serialize(o: &ObjectImage) -> <Self::Stream as ToOwned>::Owned {
        o.words()
            .iter()
            .flat_map(|w| w.to_be_bytes())
            .collect()
    }

    fn deserialize(bytes: &Self::Stream) -> Option<ObjectImage> {
        let words = map_chunks(bytes, u16::from_be_bytes)?;
        Some(ObjectImage::new(words))
    }
}

/// Splits data into fixed-size chunks and maps each one.
///
/// Returns `None` if the data does not divide evenly into chunks.
fn map_chunks<T, const N: usize>(data: &[u8], mut f: impl FnMut([u8; N]) -> T) -> Option<Vec<T>> {
    if data.len() % N != 0 { return None; }

    data.chunks_exact(N)
        .map(|c| <[_; N]>::try_from(c).ok().map(&mut f))
        .collect()
}

// TEXT!
/// A text-based format of object image data.
///
/// Each word is written on its own line as 4 upper-case hex digits.
/// When reading, blank lines and `//` comments are ignored.
///
/// # Example
/// ```
/// use lc3_asm::asm::ObjectImage;
/// use lc3_asm::asm::encoding::{ObjFileFormat, TextFormat};
///
/// let image = ObjectImage::new(vec![0x3000, 0xF025]);
/// assert_eq!(TextFormat::serialize(&image), "3000\nF025\n");
/// assert_eq!(TextFormat::deserialize("3000 // origin\n\nf025\n"), Some(image));
/// ```
pub struct TextFormat;

impl ObjFileFormat for TextFormat {
    type Stream = str;

    fn serialize(o: &ObjectImage) -> <Self::Stream as ToOwned>::Owned {
        o.words()
            .iter()
            .map(|w| format!("{w:04X}\n"))
            .collect()
    }

    fn deserialize(string: &Self::Stream) -> Option<ObjectImage> {
        let words = string.lines()
            .map(|l| l.split_once("//").map_or(l, |(left, _)| left).trim()) // remove comments
            .filter(|l| !l.is_empty())
            .map(hex2u16)
            .collect::<Option<Vec<_>>>()?;

        Some(ObjectImage::new(words))
    }
}

fn hex2u16(s: &str) -> Option<u16> {
    match s.len() == 4 {
        true => u16::from_str_radix(s, 16).ok(),
        false => None
    }
}

#[cfg(test)]
mod tests {
    use super::{BinaryFormat, ObjFileFormat, TextFormat};
    use crate::asm::ObjectImage;

    #[test]
    fn test_binary_big_endian() {
        let image = ObjectImage::new(vec![0x3000, 0x0061, 0xABCD]);
        let bytes = BinaryFormat::serialize(&image);
        assert_eq!(bytes, [0x30, 0x00, 0x00, 0x61, 0xAB, 0xCD]);
    }

    #[test]
    fn test_binary_rejects_odd_length() {
        assert_eq!(BinaryFormat::deserialize(&[0x30, 0x00, 0x50]), None);
        assert_eq!(BinaryFormat::deserialize(&[]), Some(ObjectImage::default()));
    }

    #[test]
    fn test_text_format() {
        let image = ObjectImage::new(vec![0x3000, 0x000A, 0xFFFF]);
        let text = TextFormat::serialize(&image);
        assert_eq!(text, "3000\n000A\nFFFF\n");
        assert_eq!(TextFormat::deserialize(&text), Some(image));

        // only 4-digit hex words
        assert_eq!(TextFormat::deserialize("3000\n12345\n"), None);
        assert_eq!(TextFormat::deserialize("3000\nHALT\n"), None);
        assert_eq!(TextFormat::deserialize("x300\n"), None);
    }
}
