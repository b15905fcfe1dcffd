// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Assembly of elementary streams for decoders that consume raw bitstreams.
//!
//! VC-1 payloads get an end-of-sequence start code appended. H.264 clips are stored in MP4
//! containers, so the SPS and PPS are pulled out of the `avcC` box and emitted in Annex B form
//! ahead of the slice data.

use remain::sorted;
use thiserror::Error as ThisError;

use crate::buffer::AllocationFailed;
use crate::buffer::GrowableBuffer;

pub const START_CODE: [u8; 3] = [0x00, 0x00, 0x01];

const VC1_END_OF_SEQUENCE: [u8; 4] = [0x00, 0x00, 0x01, 0x0a];
const NAL_END_OF_SEQUENCE: u8 = 0x0a;
const NAL_FILLER_DATA: u8 = 0x0c;
const FILLER_PAYLOAD: [u8; 3] = [0xff, 0x80, 0x00];

#[sorted]
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum BitstreamError {
    #[error(transparent)]
    AllocationFailed(#[from] AllocationFailed),
    #[error("`{0}` box not found")]
    MissingBox(&'static str),
    #[error("no avc1 compatible brand in ftyp box")]
    NotAvc,
    #[error("not an ISO base media file")]
    NotIsoMedia,
    #[error("container truncated at offset {0}")]
    Truncated(usize),
}

pub type Result<T> = std::result::Result<T, BitstreamError>;

/// How an H.264 stream is terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamEnd {
    /// End-of-sequence NAL unit, so the decoder outputs the last picture.
    EndOfSequence,
    /// Filler data NAL unit, for decoders flushed by other means.
    FillerData,
}

/// Returns `video_data` followed by a VC-1 end-of-sequence start code.
pub fn vc1_with_end_of_sequence(video_data: &[u8]) -> Result<Vec<u8>> {
    let mut buffer = GrowableBuffer::new(video_data.len() + VC1_END_OF_SEQUENCE.len())?;
    buffer.append(video_data)?;
    buffer.append(&VC1_END_OF_SEQUENCE)?;
    Ok(buffer.steal())
}

const fn tag(code: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*code)
}

/// Boxes that may precede `stsd`, and whether their contents can be skipped whole.
const KNOWN_BOXES: &[(u32, bool)] = &[
    (tag(b"moov"), false),
    (tag(b"mvhd"), true),
    (tag(b"iods"), true),
    (tag(b"trak"), false),
    (tag(b"tkhd"), true),
    (tag(b"tref"), true),
    (tag(b"edts"), false),
    (tag(b"elst"), true),
    (tag(b"mdia"), false),
    (tag(b"mdhd"), true),
    (tag(b"hdlr"), true),
    (tag(b"minf"), false),
    (tag(b"vmhd"), true),
    (tag(b"smhd"), true),
    (tag(b"hmhd"), true),
    (tag(b"dinf"), false),
    (tag(b"dref"), true),
    (tag(b"stbl"), false),
    (tag(b"stts"), true),
    (tag(b"ctts"), true),
    (tag(b"stss"), true),
    (tag(b"stsd"), true),
    (tag(b"stsz"), true),
    (tag(b"stsc"), true),
    (tag(b"stco"), true),
    (tag(b"co64"), true),
    (tag(b"stsh"), true),
    (tag(b"stdp"), true),
    (tag(b"mdat"), true),
    (tag(b"free"), true),
    (tag(b"skip"), true),
    (tag(b"udta"), true),
];

/// Size of a `VisualSampleEntry` up to its child boxes, header included.
const VISUAL_SAMPLE_ENTRY_SIZE: usize = 86;

/// Bytes of the `avcC` box before the SPS count: header, version, profile, compatibility, level
/// and NAL length size.
const AVCC_PREFIX_SIZE: usize = 13;

/// Big-endian reader over a byte slice that never reads out of bounds.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn bytes_at(&self, pos: usize, len: usize) -> Result<&'a [u8]> {
        pos.checked_add(len)
            .and_then(|end| self.data.get(pos..end))
            .ok_or(BitstreamError::Truncated(pos))
    }

    fn u32_at(&self, pos: usize) -> Result<u32> {
        let b = self.bytes_at(pos, 4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let b = self.bytes_at(self.pos, len)?;
        self.pos += len;
        Ok(b)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let v = self.u32_at(self.pos)?;
        self.pos += 4;
        Ok(v)
    }

    fn skip(&mut self, len: usize) -> Result<()> {
        self.bytes(len).map(|_| ())
    }

    /// Advances to the start of the first `name` box, descending into known containers.
    fn find_box(&mut self, name: &'static str, kind: u32) -> Result<()> {
        loop {
            let size = self.u32_at(self.pos)? as usize;
            let current = self.u32_at(self.pos + 4)?;
            if current == kind {
                return Ok(());
            }
            let (_, leaf) = KNOWN_BOXES
                .iter()
                .find(|(known, _)| *known == current)
                .ok_or(BitstreamError::MissingBox(name))?;
            if *leaf {
                if size < 8 {
                    return Err(BitstreamError::Truncated(self.pos));
                }
                self.pos = self.pos.saturating_add(size);
            } else {
                self.pos += 8;
            }
            if self.pos >= self.data.len() {
                return Err(BitstreamError::MissingBox(name));
            }
        }
    }
}

fn append_nal(buffer: &mut GrowableBuffer, nal: &[u8]) -> Result<()> {
    buffer.append(&START_CODE)?;
    buffer.append(nal)?;
    Ok(())
}

/// Builds an Annex B H.264 stream from an MP4 clip and the slice data of its first picture.
pub fn h264_annexb_from_mp4(
    video_data: &[u8],
    slice_data: &[u8],
    end: StreamEnd,
) -> Result<Vec<u8>> {
    let mut buffer = GrowableBuffer::new(video_data.len())?;
    let mut reader = Reader {
        data: video_data,
        pos: 0,
    };

    let ftyp_size = reader.u32()? as usize;
    if reader.u32()? != tag(b"ftyp") || reader.u32()? != tag(b"isom") {
        return Err(BitstreamError::NotIsoMedia);
    }
    reader.skip(4)?; // minor_version
    let mut is_avc = false;
    for _ in 0..(ftyp_size / 4).saturating_sub(4) {
        if reader.u32()? == tag(b"avc1") {
            is_avc = true;
        }
    }
    if !is_avc {
        return Err(BitstreamError::NotAvc);
    }

    reader.find_box("stsd", tag(b"stsd"))?;
    reader.skip(12)?; // FullBox('stsd', 0, 0)
    let mut entries = reader.u32()?;
    loop {
        if entries == 0 {
            return Err(BitstreamError::MissingBox("avc1"));
        }
        if reader.u32_at(reader.pos + 4)? == tag(b"avc1") {
            break;
        }
        let size = reader.u32_at(reader.pos)? as usize;
        reader.skip(size.max(8))?;
        entries -= 1;
    }
    reader.skip(VISUAL_SAMPLE_ENTRY_SIZE)?;
    if reader.u32_at(reader.pos + 4)? != tag(b"avcC") {
        return Err(BitstreamError::MissingBox("avcC"));
    }
    reader.skip(AVCC_PREFIX_SIZE)?;

    let num_sps = reader.u8()? & 0x1f;
    for _ in 0..num_sps {
        let len = reader.u16()? as usize;
        append_nal(&mut buffer, reader.bytes(len)?)?;
    }
    let num_pps = reader.u8()?;
    for _ in 0..num_pps {
        let len = reader.u16()? as usize;
        append_nal(&mut buffer, reader.bytes(len)?)?;
    }

    append_nal(&mut buffer, slice_data)?;
    match end {
        StreamEnd::EndOfSequence => append_nal(&mut buffer, &[NAL_END_OF_SEQUENCE])?,
        StreamEnd::FillerData => {
            append_nal(&mut buffer, &[NAL_FILLER_DATA])?;
            buffer.append(&FILLER_PAYLOAD)?;
        }
    }
    Ok(buffer.steal())
}
