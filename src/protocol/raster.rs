//! # Raster Encoder
//!
//! Converts a grayscale image into PRINT_BITMAP_ROW packets, one per scanline.
//!
//! ## Row Packet Payload
//!
//! ```text
//! ┌──────────┬────┬────┬────┬────────┬──────────────────────┐
//! │ row u16BE│ c0 │ c1 │ c2 │ marker │ packed pixels ...    │
//! └──────────┴────┴────┴────┴────────┴──────────────────────┘
//!   2 bytes    always 0       always 1  ceil(width / 8) bytes
//! ```
//!
//! The three counters are always zero. They look like run-length hints the
//! current firmware ignores, so they are carried as explicit fields.
//!
//! ## Bit Packing
//!
//! - Bit 7 (MSB) = leftmost dot
//! - 1 = inked (black), 0 = paper (white)
//! - Rows are padded with zero bits to a whole number of bytes
//!
//! ## Polarity
//!
//! The source image is inverted before thresholding, so dark pixels become
//! set bits:
//!
//! ```text
//! luma 0   (black) → inverted 255 → bit 1
//! luma 255 (white) → inverted 0   → bit 0
//! ```
//!
//! ## Example
//!
//! ```
//! use image::{GrayImage, Luma};
//! use niimbot::protocol::raster;
//!
//! let img = GrayImage::from_pixel(8, 1, Luma([0]));
//! let rows: Vec<_> = raster::encode_image(&img)?.collect();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].data, vec![0, 0, 0, 0, 0, 1, 0xFF]);
//! # Ok::<(), niimbot::error::NiimbotError>(())
//! ```

use image::{GrayImage, imageops};

use crate::error::{NiimbotError, Result};

use super::commands::RequestCode;
use super::packet::{MAX_PAYLOAD, Packet};

/// Inverted luma at or above this value is printed
pub const THRESHOLD: u8 = 128;

/// Marker byte following the counters in every row packet
pub const ROW_MARKER: u8 = 1;

/// Row index, counters and marker
pub const ROW_HEADER_LEN: usize = 6;

/// Widest image whose rows fit in one packet (1992 dots)
pub const MAX_ROW_WIDTH: u32 = ((MAX_PAYLOAD - ROW_HEADER_LEN) * 8) as u32;

/// Tallest image: row indices and SET_DIMENSION heights are 16 bits
pub const MAX_ROWS: u32 = u16::MAX as u32;

/// How grayscale is reduced to one bit per pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dithering {
    /// Hard threshold at mid-gray
    #[default]
    Threshold,
    /// Floyd–Steinberg error diffusion, for photos
    FloydSteinberg,
}

/// Header of one raster row packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowHeader {
    pub row: u16,
    /// Unused by current firmware; always zero
    pub counts: [u8; 3],
    pub marker: u8,
}

impl RowHeader {
    pub fn new(row: u16) -> Self {
        Self {
            row,
            counts: [0; 3],
            marker: ROW_MARKER,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.row.to_be_bytes());
        out.extend_from_slice(&self.counts);
        out.push(self.marker);
    }
}

/// Lazy iterator over the row packets of one image.
pub struct RasterEncoder {
    image: GrayImage,
    row: u32,
}

impl RasterEncoder {
    /// Prepare `image` for encoding: invert, then reduce to bi-level.
    ///
    /// Fails with [`NiimbotError::PayloadTooLarge`] when a row would not fit
    /// in one packet (wider than [`MAX_ROW_WIDTH`]), and with
    /// [`NiimbotError::InvalidArgument`] above [`MAX_ROWS`] rows.
    pub fn new(image: &GrayImage, dithering: Dithering) -> Result<Self> {
        let payload = ROW_HEADER_LEN + image.width().div_ceil(8) as usize;
        if payload > MAX_PAYLOAD {
            return Err(NiimbotError::PayloadTooLarge(payload));
        }
        if image.height() > MAX_ROWS {
            return Err(NiimbotError::InvalidArgument(format!(
                "image has {} rows, at most {} can be printed",
                image.height(),
                MAX_ROWS
            )));
        }

        let mut inverted = image.clone();
        imageops::invert(&mut inverted);

        if dithering == Dithering::FloydSteinberg {
            imageops::dither(&mut inverted, &imageops::BiLevel);
        }

        Ok(Self {
            image: inverted,
            row: 0,
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    fn encode_row(&self, y: u32) -> Packet {
        let width = self.image.width();
        let mut data = Vec::with_capacity(ROW_HEADER_LEN + width.div_ceil(8) as usize);
        // y < height <= MAX_ROWS, checked in `new`
        RowHeader::new(y as u16).write(&mut data);
        data.extend(pack_row(
            (0..width).map(|x| self.image.get_pixel(x, y)[0] >= THRESHOLD),
        ));
        Packet::new(RequestCode::PrintBitmapRow.code(), data)
    }
}

impl Iterator for RasterEncoder {
    type Item = Packet;

    fn next(&mut self) -> Option<Packet> {
        if self.row >= self.image.height() {
            return None;
        }
        let pkt = self.encode_row(self.row);
        self.row += 1;
        Some(pkt)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.image.height() - self.row) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for RasterEncoder {}

/// Encode `image` with the default threshold.
pub fn encode_image(image: &GrayImage) -> Result<RasterEncoder> {
    RasterEncoder::new(image, Dithering::Threshold)
}

/// Pack dots MSB-first into bytes, padding the last byte with zeros.
pub fn pack_row(dots: impl IntoIterator<Item = bool>) -> Vec<u8> {
    let mut out = Vec::new();
    let mut byte = 0u8;
    let mut bits = 0;

    for dot in dots {
        byte = (byte << 1) | dot as u8;
        bits += 1;
        if bits == 8 {
            out.push(byte);
            byte = 0;
            bits = 0;
        }
    }
    if bits > 0 {
        out.push(byte << (8 - bits));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_white_row_is_blank() {
        let img = GrayImage::from_pixel(8, 1, Luma([255]));
        let rows: Vec<_> = encode_image(&img).unwrap().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, 0x85);
        assert_eq!(rows[0].data, vec![0x00, 0x00, 0, 0, 0, 1, 0x00]);
    }

    #[test]
    fn test_black_row_is_inked() {
        let img = GrayImage::from_pixel(8, 1, Luma([0]));
        let rows: Vec<_> = encode_image(&img).unwrap().collect();
        assert_eq!(rows[0].data[6..], [0xFF]);
    }

    #[test]
    fn test_row_indices_top_to_bottom() {
        let img = GrayImage::from_pixel(3, 300, Luma([255]));
        let rows: Vec<_> = encode_image(&img).unwrap().collect();
        assert_eq!(rows.len(), 300);
        assert_eq!(&rows[0].data[..2], &[0x00, 0x00]);
        assert_eq!(&rows[1].data[..2], &[0x00, 0x01]);
        assert_eq!(&rows[299].data[..2], &[0x01, 0x2B]);
    }

    #[test]
    fn test_padding_and_bit_order() {
        // 10 px: black, white x8, black
        let mut img = GrayImage::from_pixel(10, 1, Luma([255]));
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(9, 0, Luma([0]));
        let rows: Vec<_> = encode_image(&img).unwrap().collect();
        assert_eq!(rows[0].data[6..], [0b1000_0000, 0b0100_0000]);
    }

    #[test]
    fn test_threshold_midpoint() {
        let mut img = GrayImage::from_pixel(2, 1, Luma([127]));
        img.put_pixel(1, 0, Luma([128]));
        let rows: Vec<_> = encode_image(&img).unwrap().collect();
        // 127 inverts to 128 (inked), 128 inverts to 127 (blank)
        assert_eq!(rows[0].data[6..], [0b1000_0000]);
    }

    #[test]
    fn test_encoder_is_lazy_and_restartable() {
        let img = GrayImage::from_pixel(8, 4, Luma([0]));
        let mut first = encode_image(&img).unwrap();
        assert_eq!(first.len(), 4);
        first.next();
        assert_eq!(first.len(), 3);

        let again: Vec<_> = encode_image(&img).unwrap().collect();
        assert_eq!(again.len(), 4);
    }

    #[test]
    fn test_dithering_keeps_solid_colors() {
        let img = GrayImage::from_pixel(16, 2, Luma([0]));
        let rows: Vec<_> = RasterEncoder::new(&img, Dithering::FloydSteinberg)
            .unwrap()
            .collect();
        assert_eq!(rows[0].data[6..], [0xFF, 0xFF]);

        let img = GrayImage::from_pixel(16, 2, Luma([255]));
        let rows: Vec<_> = RasterEncoder::new(&img, Dithering::FloydSteinberg)
            .unwrap()
            .collect();
        assert_eq!(rows[1].data[6..], [0x00, 0x00]);
    }

    #[test]
    fn test_widest_row_fills_one_packet() {
        let img = GrayImage::from_pixel(MAX_ROW_WIDTH, 1, Luma([0]));
        let rows: Vec<_> = encode_image(&img).unwrap().collect();
        assert_eq!(MAX_ROW_WIDTH, 1992);
        assert_eq!(rows[0].data.len(), MAX_PAYLOAD);
        assert!(rows[0].to_bytes().is_ok());
    }

    #[test]
    fn test_row_too_wide_for_packet() {
        let img = GrayImage::new(MAX_ROW_WIDTH + 1, 1);
        assert!(matches!(
            encode_image(&img),
            Err(NiimbotError::PayloadTooLarge(256))
        ));
    }

    #[test]
    fn test_too_many_rows() {
        let img = GrayImage::new(1, MAX_ROWS + 1);
        assert!(matches!(
            encode_image(&img),
            Err(NiimbotError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_pack_row() {
        assert_eq!(pack_row(std::iter::empty()), Vec::<u8>::new());
        assert_eq!(pack_row([true]), vec![0x80]);
        assert_eq!(pack_row([false, true, false, true, false, true, false, true]), vec![0x55]);
    }

    #[test]
    fn test_row_header() {
        let mut out = Vec::new();
        RowHeader::new(0x1234).write(&mut out);
        assert_eq!(out, vec![0x12, 0x34, 0, 0, 0, 1]);
    }
}
