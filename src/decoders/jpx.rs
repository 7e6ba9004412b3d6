//! JPXDecode (JPEG 2000) adapter.
//!
//! Header inspection works on both JP2 files and raw codestreams without
//! any external library. Decoding pixels needs OpenJPEG through the
//! `jpeg2k` crate and is only available with the `jpeg2000` feature.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.4.9 - JPXDecode Filter

use crate::error::{Error, Result};

/// Signature at the start of a raw codestream: SOC followed by SIZ.
const CODESTREAM_SIGNATURE: [u8; 4] = [0xff, 0x4f, 0xff, 0x51];

/// Bit depth value in `ihdr` meaning the components differ.
const VARIABLE_BIT_DEPTH: u8 = 0xff;

/// Image properties read from a JPEG 2000 header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpxInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Number of components
    pub components: u32,
    /// Bit depth of the first component
    pub bits_per_component: u32,
}

/// Decoded JPEG 2000 image with interleaved 8-bit samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpxImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Samples per pixel
    pub components: u32,
    /// `width * height * components` samples, row by row
    pub data: Vec<u8>,
}

fn read_u16(data: &[u8], pos: usize) -> Option<u16> {
    data.get(pos..pos + 2).map(|b| u16::from_be_bytes([b[0], b[1]]))
}

fn read_u32(data: &[u8], pos: usize) -> Option<u32> {
    data.get(pos..pos + 4).map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// One box of a JP2 file.
struct JpBox<'a> {
    kind: [u8; 4],
    contents: &'a [u8],
}

/// Iterator over consecutive boxes.
struct Boxes<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Boxes<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl<'a> Iterator for Boxes<'a> {
    type Item = JpBox<'a>;

    fn next(&mut self) -> Option<JpBox<'a>> {
        let start = self.pos;
        let length = read_u32(self.data, start)? as u64;
        let kind: [u8; 4] = self.data.get(start + 4..start + 8)?.try_into().ok()?;
        let (header, length) = match length {
            0 => (8, (self.data.len() - start) as u64),
            1 => {
                let high = u64::from(read_u32(self.data, start + 8)?);
                let low = u64::from(read_u32(self.data, start + 12)?);
                (16, (high << 32) | low)
            },
            _ => (8, length),
        };
        if length < header as u64 {
            return None;
        }
        let end = usize::try_from(length).ok().and_then(|len| start.checked_add(len))?;
        let contents = self.data.get(start + header..end)?;
        self.pos = end;
        Some(JpBox { kind, contents })
    }
}

/// Read width, height, components and depth from a SIZ marker segment
/// that starts right after SOC.
fn read_siz(codestream: &[u8]) -> Result<JpxInfo> {
    if !codestream.starts_with(&CODESTREAM_SIGNATURE) {
        return Err(Error::Image("JPEG 2000 codestream does not start with SOC/SIZ".to_string()));
    }
    let siz = &codestream[4..];
    let truncated = || Error::Image("JPEG 2000 SIZ marker truncated".to_string());
    let x_size = read_u32(siz, 4).ok_or_else(truncated)?;
    let y_size = read_u32(siz, 8).ok_or_else(truncated)?;
    let x_offset = read_u32(siz, 12).ok_or_else(truncated)?;
    let y_offset = read_u32(siz, 16).ok_or_else(truncated)?;
    let components = read_u16(siz, 36).ok_or_else(truncated)?;
    let depth = *siz.get(38).ok_or_else(truncated)?;

    let width = x_size.saturating_sub(x_offset);
    let height = y_size.saturating_sub(y_offset);
    if width == 0 || height == 0 || components == 0 {
        return Err(Error::Image("JPEG 2000 image is empty".to_string()));
    }
    Ok(JpxInfo {
        width,
        height,
        components: u32::from(components),
        bits_per_component: u32::from(depth & 0x7f) + 1,
    })
}

fn read_jp2(data: &[u8]) -> Result<JpxInfo> {
    let mut header = None;
    let mut codestream = None;
    for jp_box in Boxes::new(data) {
        match &jp_box.kind {
            b"jp2h" => {
                header = Boxes::new(jp_box.contents)
                    .find(|child| &child.kind == b"ihdr")
                    .map(|ihdr| ihdr.contents);
            },
            b"jp2c" => {
                codestream = Some(jp_box.contents);
                break;
            },
            _ => {},
        }
    }

    let Some(ihdr) = header else {
        return codestream
            .map(read_siz)
            .unwrap_or_else(|| Err(Error::Image("JP2 file has no image header".to_string())));
    };
    let truncated = || Error::Image("JP2 image header truncated".to_string());
    let height = read_u32(ihdr, 0).ok_or_else(truncated)?;
    let width = read_u32(ihdr, 4).ok_or_else(truncated)?;
    let components = read_u16(ihdr, 8).ok_or_else(truncated)?;
    let depth = *ihdr.get(10).ok_or_else(truncated)?;

    let bits_per_component = if depth == VARIABLE_BIT_DEPTH {
        let codestream = codestream.ok_or_else(|| Error::Image("JP2 file has no codestream".to_string()))?;
        read_siz(codestream)?.bits_per_component
    } else {
        u32::from(depth & 0x7f) + 1
    };
    if width == 0 || height == 0 || components == 0 {
        return Err(Error::Image("JPEG 2000 image is empty".to_string()));
    }
    Ok(JpxInfo {
        width,
        height,
        components: u32::from(components),
        bits_per_component,
    })
}

/// Read the image properties from a JP2 file or a raw codestream.
pub fn load_info(src: &[u8]) -> Result<JpxInfo> {
    if src.starts_with(&CODESTREAM_SIGNATURE) {
        read_siz(src)
    } else {
        read_jp2(src)
    }
}

/// Decode a JPEG 2000 image to interleaved 8-bit samples.
///
/// Components with more than 8 bits are scaled down; subsampled
/// components are stretched to the image size.
#[cfg(feature = "jpeg2000")]
pub fn decode(src: &[u8]) -> Result<JpxImage> {
    use jpeg2k::Image;

    let image = Image::from_bytes(src).map_err(|e| Error::Image(format!("JPXDecode failed: {:?}", e)))?;
    let width = image.width();
    let height = image.height();
    let components = image.components();
    if width == 0 || height == 0 || components.is_empty() {
        return Err(Error::Image("JPEG 2000 image is empty".to_string()));
    }
    let shift = load_info(src)
        .map(|info| info.bits_per_component.saturating_sub(8))
        .unwrap_or(0);

    let mut data = Vec::with_capacity(width as usize * height as usize * components.len());
    for y in 0..height {
        for x in 0..width {
            for component in components {
                let (comp_width, comp_height) = (component.width().max(1), component.height().max(1));
                let cx = (u64::from(x) * u64::from(comp_width) / u64::from(width)) as usize;
                let cy = (u64::from(y) * u64::from(comp_height) / u64::from(height)) as usize;
                let value = component
                    .data()
                    .get(cy * comp_width as usize + cx)
                    .copied()
                    .unwrap_or(0);
                data.push((value >> shift).clamp(0, 255) as u8);
            }
        }
    }

    log::debug!(
        "JPXDecode: {}x{} with {} components",
        width,
        height,
        components.len()
    );
    Ok(JpxImage {
        width,
        height,
        components: components.len() as u32,
        data,
    })
}

/// Decode a JPEG 2000 image to interleaved 8-bit samples.
///
/// Always fails: the crate was built without the `jpeg2000` feature.
#[cfg(not(feature = "jpeg2000"))]
pub fn decode(_src: &[u8]) -> Result<JpxImage> {
    Err(Error::UnsupportedFilter(
        "JPXDecode (enable the 'jpeg2000' feature)".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn siz(width: u32, height: u32, depth: u8, components: u16) -> Vec<u8> {
        let mut data = CODESTREAM_SIGNATURE.to_vec();
        data.extend_from_slice(&(38 + 3 * components).to_be_bytes());
        data.extend_from_slice(&[0, 0]);
        for value in [width, height, 0, 0, width, height, 0, 0] {
            data.extend_from_slice(&value.to_be_bytes());
        }
        data.extend_from_slice(&components.to_be_bytes());
        for _ in 0..components {
            data.extend_from_slice(&[depth, 1, 1]);
        }
        data
    }

    fn jp_box(kind: &[u8; 4], contents: &[u8]) -> Vec<u8> {
        let mut data = ((contents.len() + 8) as u32).to_be_bytes().to_vec();
        data.extend_from_slice(kind);
        data.extend_from_slice(contents);
        data
    }

    fn ihdr(width: u32, height: u32, components: u16, depth: u8) -> Vec<u8> {
        let mut contents = height.to_be_bytes().to_vec();
        contents.extend_from_slice(&width.to_be_bytes());
        contents.extend_from_slice(&components.to_be_bytes());
        contents.extend_from_slice(&[depth, 7, 0, 0]);
        jp_box(b"ihdr", &contents)
    }

    fn jp2(header: &[u8], codestream: &[u8]) -> Vec<u8> {
        let mut data = jp_box(b"jP  ", &[0x0d, 0x0a, 0x87, 0x0a]);
        data.extend(jp_box(b"ftyp", b"jp2 \0\0\0\0jp2 "));
        data.extend(jp_box(b"jp2h", header));
        data.extend(jp_box(b"jp2c", codestream));
        data
    }

    #[test]
    fn test_raw_codestream() {
        let info = load_info(&siz(640, 480, 7, 3)).unwrap();
        assert_eq!(
            info,
            JpxInfo {
                width: 640,
                height: 480,
                components: 3,
                bits_per_component: 8,
            }
        );
    }

    #[test]
    fn test_jp2_header_box() {
        let data = jp2(&ihdr(100, 50, 1, 15), &siz(100, 50, 15, 1));
        let info = load_info(&data).unwrap();
        assert_eq!((info.width, info.height, info.components), (100, 50, 1));
        assert_eq!(info.bits_per_component, 16);
    }

    #[test]
    fn test_jp2_variable_depth_reads_codestream() {
        let data = jp2(&ihdr(10, 10, 3, VARIABLE_BIT_DEPTH), &siz(10, 10, 11, 3));
        assert_eq!(load_info(&data).unwrap().bits_per_component, 12);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(load_info(&[]).is_err());
        assert!(load_info(b"not a jpeg 2000 file").is_err());
        assert!(load_info(&CODESTREAM_SIGNATURE).is_err());
        assert!(load_info(&siz(0, 10, 7, 1)).is_err());
    }

    #[test]
    #[cfg(not(feature = "jpeg2000"))]
    fn test_decode_needs_feature() {
        assert!(matches!(decode(&siz(4, 4, 7, 1)), Err(Error::UnsupportedFilter(_))));
    }
}
