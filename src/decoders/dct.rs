//! DCTDecode (JPEG) adapter.
//!
//! Header inspection happens here; the entropy decoding and IDCT are done by
//! the `jpeg-decoder` crate. Before handing data to it, the adapter skips
//! leading garbage up to the SOI marker, forces an EOI trailer, and repairs
//! one known producer bug (a height of `0xFFFF` in the frame header). All
//! patches are made on a private copy of the data.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.4.8 - DCTDecode Filter

use crate::decoders::scanline::{ScanlineDecoder, ScanlineGeometry, ScanlineState};
use crate::error::{Error, Result};

/// Largest width or height accepted in a frame header.
const JPEG_MAX_DIMENSION: u32 = 65500;

/// Most components a frame may declare.
const MAX_COMPONENTS: u32 = 10;

/// Offsets of the height field in files written by a producer that stores
/// `0xFFFF` there.
const KNOWN_BAD_HEIGHT_OFFSETS: [usize; 2] = [94, 163];

/// Distance from the height field back to its SOFn marker.
const SOF_MARKER_DISTANCE: usize = 5;

/// Image properties read from a JPEG header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Number of colour components
    pub components: u32,
    /// Sample precision
    pub bits_per_component: u32,
    /// The samples are stored as YCbCr or YCCK and need a colour transform
    pub color_transform: bool,
}

/// Frame and marker data gathered up to the first SOS.
#[derive(Debug, Clone, Default)]
struct FrameHeader {
    width: u32,
    height: u32,
    precision: u32,
    component_ids: Vec<u8>,
    saw_jfif: bool,
    adobe_transform: Option<u8>,
}

impl FrameHeader {
    /// Guess the stored colour space the way libjpeg does and report
    /// whether it is YCbCr or YCCK.
    fn color_transform(&self) -> bool {
        match self.component_ids.as_slice() {
            [_, _, _] if self.saw_jfif => true,
            [_, _, _] if self.adobe_transform.is_some() => self.adobe_transform != Some(0),
            [b'R', b'G', b'B'] => false,
            [_, _, _] => true,
            [_, _, _, _] => self.adobe_transform.is_some_and(|transform| transform != 0),
            _ => false,
        }
    }
}

/// Offset of the first SOI marker, or 0 if there is none.
fn scan_soi(src: &[u8]) -> usize {
    src.windows(2).position(|pair| pair == [0xff, 0xd8]).unwrap_or(0)
}

fn is_sof_marker(marker: u8) -> bool {
    // C4 (DHT), C8 (JPG) and CC (DAC) share the range but are not frames
    (0xc0..=0xcf).contains(&marker) && !matches!(marker, 0xc4 | 0xc8 | 0xcc)
}

fn truncated() -> Error {
    Error::Image("JPEG header truncated".to_string())
}

/// Walk the markers from SOI to the first SOS.
fn read_frame_header(data: &[u8]) -> Result<FrameHeader> {
    if !data.starts_with(&[0xff, 0xd8]) {
        return Err(Error::Image("JPEG data does not start with SOI".to_string()));
    }

    let mut header: Option<FrameHeader> = None;
    let mut saw_jfif = false;
    let mut adobe_transform = None;
    let mut pos = 2;
    loop {
        // Skip garbage and fill bytes before the marker code
        while pos < data.len() && data[pos] != 0xff {
            pos += 1;
        }
        while pos < data.len() && data[pos] == 0xff {
            pos += 1;
        }
        let marker = *data.get(pos).ok_or_else(truncated)?;
        pos += 1;

        match marker {
            0x01 | 0xd0..=0xd8 => continue,
            0xd9 => return Err(Error::Image("JPEG EOI before start of scan".to_string())),
            _ => {},
        }

        let length = data
            .get(pos..pos + 2)
            .map(|bytes| usize::from(u16::from_be_bytes([bytes[0], bytes[1]])))
            .ok_or_else(truncated)?;
        if length < 2 {
            return Err(Error::Image(format!("JPEG marker 0x{:02X} has length {}", marker, length)));
        }
        let segment = data.get(pos + 2..pos + length).ok_or_else(truncated)?;

        match marker {
            _ if is_sof_marker(marker) => {
                if header.is_some() {
                    return Err(Error::Image("JPEG has more than one frame header".to_string()));
                }
                header = Some(parse_sof(segment)?);
            },
            0xe0 if segment.len() >= 14 && segment.starts_with(b"JFIF\0") => saw_jfif = true,
            0xee if segment.len() >= 12 && segment.starts_with(b"Adobe") => adobe_transform = Some(segment[11]),
            0xda => {
                let mut header = header.ok_or_else(|| Error::Image("JPEG scan before frame header".to_string()))?;
                header.saw_jfif = saw_jfif;
                header.adobe_transform = adobe_transform;
                return Ok(header);
            },
            _ => {},
        }
        pos += length;
    }
}

fn parse_sof(segment: &[u8]) -> Result<FrameHeader> {
    if segment.len() < 6 {
        return Err(truncated());
    }
    let (fixed, components) = segment.split_at(6);
    let (precision, count) = (fixed[0], fixed[5]);
    if components.len() != usize::from(count) * 3 {
        return Err(Error::Image(format!(
            "JPEG frame header length does not match {} components",
            count
        )));
    }
    Ok(FrameHeader {
        width: u32::from(u16::from_be_bytes([fixed[3], fixed[4]])),
        height: u32::from(u16::from_be_bytes([fixed[1], fixed[2]])),
        precision: u32::from(precision),
        component_ids: components.chunks_exact(3).map(|component| component[0]).collect(),
        ..FrameHeader::default()
    })
}

/// Read the image properties from a JPEG header.
///
/// Leading bytes before the SOI marker are skipped. Fails if no frame
/// header precedes the first scan, or if the frame is empty, larger than
/// 65500 pixels in either direction, or not 8-bit.
pub fn load_info(src: &[u8]) -> Result<JpegInfo> {
    let header = read_frame_header(&src[scan_soi(src)..])?;
    let components = header.component_ids.len() as u32;
    if header.width == 0 || header.height == 0 || components == 0 {
        return Err(Error::Image("JPEG image is empty".to_string()));
    }
    if header.width > JPEG_MAX_DIMENSION || header.height > JPEG_MAX_DIMENSION {
        return Err(Error::Image(format!(
            "JPEG dimensions {}x{} too large",
            header.width, header.height
        )));
    }
    if components > MAX_COMPONENTS {
        return Err(Error::Image(format!("JPEG has {} components", components)));
    }
    if header.precision != 8 {
        return Err(Error::Image(format!("unsupported JPEG precision {}", header.precision)));
    }
    Ok(JpegInfo {
        width: header.width,
        height: header.height,
        components,
        bits_per_component: header.precision,
        color_transform: header.color_transform(),
    })
}

/// Offset of a `0xFFFF` height that should read `height`.
///
/// Every check has to agree, so well-formed files are never touched.
fn known_bad_height_offset(data: &[u8], width: u32, height: u32) -> Option<usize> {
    let header = read_frame_header(data).ok()?;
    let hints_valid = (1..=JPEG_MAX_DIMENSION).contains(&width) && (1..=JPEG_MAX_DIMENSION).contains(&height);
    if header.height != 0xffff || header.width >= JPEG_MAX_DIMENSION || !hints_valid {
        return None;
    }
    let expected = [0xff, 0xff, (width >> 8) as u8, width as u8];
    KNOWN_BAD_HEIGHT_OFFSETS.iter().copied().find(|&offset| {
        data.len() > offset + 3
            && data[offset - SOF_MARKER_DISTANCE] == 0xff
            && (0xc0..=0xcf).contains(&data[offset - SOF_MARKER_DISTANCE + 1])
            && data[offset..offset + 4] == expected
    })
}

/// Scanline decoder over DCTDecode data.
///
/// Rows are `width * components` bytes, padded to a multiple of 4. The
/// image is decoded on the first rewind; later rewinds only reset the row
/// cursor.
pub struct JpegScanlineDecoder {
    state: ScanlineState,
    data: Vec<u8>,
    color_transform: bool,
    pixels: Option<Vec<u8>>,
    row_bytes: usize,
    next_row: usize,
    scanline: Vec<u8>,
}

impl JpegScanlineDecoder {
    /// Create a decoder for JPEG data described by the image dictionary as
    /// `width` x `height` with `components` colour components.
    ///
    /// The header may report more components or a larger width than the
    /// hints, never fewer; the header's dimensions are used.
    pub fn create(src: &[u8], width: u32, height: u32, components: u32, color_transform: bool) -> Result<Self> {
        let span = &src[scan_soi(src)..];
        if span.len() < 2 {
            return Err(Error::Image("JPEG data too short".to_string()));
        }

        let mut data = span.to_vec();
        let len = data.len();
        data[len - 2] = 0xff;
        data[len - 1] = 0xd9;

        let info = match load_info(&data) {
            Ok(info) => info,
            Err(err) => {
                let offset = known_bad_height_offset(&data, width, height).ok_or(err)?;
                log::warn!(
                    "DCTDecode: repairing invalid JPEG height at offset {} to {}",
                    offset,
                    height
                );
                data[offset..offset + 2].copy_from_slice(&(height as u16).to_be_bytes());
                load_info(&data)?
            },
        };

        if info.components < components {
            return Err(Error::InvalidParameter(format!(
                "JPEG has {} components, image expects {}",
                info.components, components
            )));
        }
        if info.width < width {
            return Err(Error::InvalidParameter(format!(
                "JPEG width {} smaller than image width {}",
                info.width, width
            )));
        }

        let row_bytes = (info.width * info.components) as usize;
        let pitch = (row_bytes + 3) / 4 * 4;
        Ok(Self {
            state: ScanlineState::new(ScanlineGeometry::new(
                info.width,
                info.height,
                info.components,
                8,
                pitch,
            )),
            data,
            color_transform: color_transform || info.color_transform,
            pixels: None,
            row_bytes,
            next_row: 0,
            scanline: vec![0; pitch],
        })
    }

    /// Whether the samples were stored in a transformed colour space.
    pub fn color_transform(&self) -> bool {
        self.color_transform
    }

    fn decode_pixels(&self) -> Result<Vec<u8>> {
        let mut decoder = jpeg_decoder::Decoder::new(self.data.as_slice());
        let pixels = decoder
            .decode()
            .map_err(|e| Error::Image(format!("JPEG decode failed: {}", e)))?;
        let info = decoder
            .info()
            .ok_or_else(|| Error::Image("JPEG decoder returned no image info".to_string()))?;

        let components = match info.pixel_format {
            jpeg_decoder::PixelFormat::L8 => 1,
            jpeg_decoder::PixelFormat::RGB24 => 3,
            jpeg_decoder::PixelFormat::CMYK32 => 4,
            other => return Err(Error::Image(format!("unsupported JPEG pixel format {:?}", other))),
        };
        let geometry = self.state.geometry();
        if components != geometry.components
            || u32::from(info.width) != geometry.orig_width
            || u32::from(info.height) != geometry.orig_height
        {
            return Err(Error::Image(format!(
                "JPEG decoded as {}x{}x{}, header said {}x{}x{}",
                info.width, info.height, components, geometry.orig_width, geometry.orig_height, geometry.components
            )));
        }
        if pixels.len() < self.row_bytes * geometry.orig_height as usize {
            return Err(Error::Image("JPEG decoder returned too few samples".to_string()));
        }
        Ok(pixels)
    }
}

impl ScanlineDecoder for JpegScanlineDecoder {
    fn state(&self) -> &ScanlineState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ScanlineState {
        &mut self.state
    }

    fn rewind_source(&mut self) -> bool {
        self.next_row = 0;
        if self.pixels.is_none() {
            match self.decode_pixels() {
                Ok(pixels) => self.pixels = Some(pixels),
                Err(e) => {
                    log::warn!("DCTDecode: {}", e);
                    return false;
                },
            }
        }
        true
    }

    fn read_next_line(&mut self) -> bool {
        let Some(pixels) = &self.pixels else {
            return false;
        };
        let start = self.next_row * self.row_bytes;
        let Some(row) = pixels.get(start..start + self.row_bytes) else {
            return false;
        };
        self.scanline[..self.row_bytes].copy_from_slice(row);
        self.next_row += 1;
        true
    }

    fn current_line(&self) -> &[u8] {
        &self.scanline
    }

    fn src_offset(&self) -> usize {
        if self.pixels.is_some() {
            self.data.len()
        } else {
            0
        }
    }
}
