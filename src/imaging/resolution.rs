//! Minimal resolution-metadata reader for JPEG and PNG buffers.
//!
//! Extracts the pixel density an encoder recorded, if any:
//! - JPEG: JFIF APP0 segment (`units`, `Xdensity`, `Ydensity`).
//! - PNG: `pHYs` chunk (pixels per unit + unit specifier).
//!
//! A density whose unit is "aspect ratio only" (JFIF units 0, PNG unit 0)
//! carries no physical resolution and is reported as absent.

/// Physical density unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DensityUnit {
    PerInch,
    PerCentimetre,
    PerMetre,
}

/// Pixel density recorded in an image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub x: u32,
    pub y: u32,
    pub unit: DensityUnit,
}

/// Read the recorded resolution, dispatching on the buffer's signature.
/// Returns `None` for unknown formats and on any parse failure.
pub fn read_resolution(data: &[u8]) -> Option<Resolution> {
    if data.starts_with(&[0xFF, 0xD8]) {
        read_jfif_density(data)
    } else if data.starts_with(PNG_SIGNATURE) {
        read_png_phys(data)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// JPEG: JFIF APP0
// ---------------------------------------------------------------------------

const JFIF_IDENT: &[u8] = b"JFIF\0";

/// Walk JPEG marker segments until APP0/JFIF or start-of-scan.
///
/// APP0 payload layout after the identifier:
///   Bytes 0-1: version
///   Byte 2:    units (0 = aspect only, 1 = dpi, 2 = dpcm)
///   Bytes 3-4: Xdensity (big-endian u16)
///   Bytes 5-6: Ydensity (big-endian u16)
fn read_jfif_density(data: &[u8]) -> Option<Resolution> {
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        // SOS (0xDA) means image data starts — stop scanning
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }
        // Markers without length field
        if (0xD0..=0xD7).contains(&marker) || marker == 0x01 {
            pos += 2;
            continue;
        }

        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let seg_start = pos + 4;
        let seg_end = (pos + 2 + seg_len).min(data.len());
        if seg_len < 2 || seg_start > seg_end {
            return None;
        }

        if marker == 0xE0 {
            let segment = &data[seg_start..seg_end];
            if let Some(payload) = segment.strip_prefix(JFIF_IDENT)
                && payload.len() >= 7
            {
                let unit = match payload[2] {
                    1 => DensityUnit::PerInch,
                    2 => DensityUnit::PerCentimetre,
                    _ => return None,
                };
                let x = u16::from_be_bytes([payload[3], payload[4]]) as u32;
                let y = u16::from_be_bytes([payload[5], payload[6]]) as u32;
                return (x > 0 && y > 0).then_some(Resolution { x, y, unit });
            }
        }

        pos += 2 + seg_len;
    }
    None
}

// ---------------------------------------------------------------------------
// PNG: pHYs chunk
// ---------------------------------------------------------------------------

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Walk PNG chunks until `pHYs` or `IDAT`.
///
/// Chunk layout: length (4, BE) + type (4) + data (length) + CRC (4).
/// `pHYs` data: X ppu (4, BE), Y ppu (4, BE), unit (1; 1 = metre).
fn read_png_phys(data: &[u8]) -> Option<Resolution> {
    let mut pos = PNG_SIGNATURE.len();
    while pos + 8 <= data.len() {
        let len =
            u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        let kind = &data[pos + 4..pos + 8];
        let body_start = pos + 8;
        let body_end = body_start.checked_add(len)?;
        if body_end > data.len() {
            return None;
        }

        match kind {
            b"pHYs" if len >= 9 => {
                let body = &data[body_start..body_end];
                let x = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
                let y = u32::from_be_bytes([body[4], body[5], body[6], body[7]]);
                if body[8] != 1 || x == 0 || y == 0 {
                    return None;
                }
                return Some(Resolution {
                    x,
                    y,
                    unit: DensityUnit::PerMetre,
                });
            }
            b"IDAT" | b"IEND" => return None,
            _ => {}
        }

        pos = body_end + 4;
    }
    None
}
