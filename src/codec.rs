// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Codec-side description of a single coded picture.
//!
//! A [`CodecSource`] exposes the parsed headers of one picture together with its slices. The
//! harness gathers those into a [`DecodeRequest`], the only shape a hardware decoder ever sees.

use std::fmt;
use std::fmt::Display;

use remain::sorted;
use thiserror::Error as ThisError;

use crate::bitstream;
use crate::bitstream::BitstreamError;
use crate::bitstream::StreamEnd;

#[sorted]
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum CodecError {
    #[error("failed to assemble elementary stream: {0}")]
    Bitstream(#[from] BitstreamError),
    #[error("{codec} source has no picture parameters of its own kind")]
    MismatchedPicture { codec: Codec },
    #[error("{codec} source returned tables for another codec")]
    MismatchedTables { codec: Codec },
    #[error("{0} source has no slice {1}")]
    MissingSlice(Codec, usize),
    #[error("{0} source has no quantisation tables")]
    MissingTables(Codec),
    #[error("slice {index} holds {actual} bytes but its header announces {expected}")]
    SliceSizeMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, CodecError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Codec {
    Mpeg2,
    Mpeg4,
    H264,
    Vc1,
    Jpeg,
}

/// Decoding profile a hardware decoder is configured with for each codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    Mpeg2Main,
    Mpeg4AdvancedSimple,
    H264High,
    Vc1Advanced,
    JpegBaseline,
}

impl Codec {
    pub fn profile(self) -> Profile {
        match self {
            Codec::Mpeg2 => Profile::Mpeg2Main,
            Codec::Mpeg4 => Profile::Mpeg4AdvancedSimple,
            Codec::H264 => Profile::H264High,
            Codec::Vc1 => Profile::Vc1Advanced,
            Codec::Jpeg => Profile::JpegBaseline,
        }
    }
}

impl Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Codec::*;
        match self {
            Mpeg2 => write!(f, "mpeg2"),
            Mpeg4 => write!(f, "mpeg4"),
            H264 => write!(f, "h264"),
            Vc1 => write!(f, "vc1"),
            Jpeg => write!(f, "jpeg"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mpeg2PictureInfo {
    pub width: u16,
    pub height: u16,
    pub picture_coding_type: u8,
    /// `f_code[s][t]`, forward then backward, horizontal then vertical.
    pub f_code: [[u8; 2]; 2],
    pub intra_dc_precision: u8,
    pub picture_structure: u8,
    pub top_field_first: bool,
    pub frame_pred_frame_dct: bool,
    pub concealment_motion_vectors: bool,
    pub q_scale_type: bool,
    pub intra_vlc_format: bool,
    pub alternate_scan: bool,
    pub repeat_first_field: bool,
    pub progressive_frame: bool,
    pub is_first_field: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mpeg4PictureInfo {
    pub width: u16,
    pub height: u16,
    pub short_video_header: bool,
    pub chroma_format: u8,
    pub interlaced: bool,
    pub obmc_disable: bool,
    pub sprite_enable: u8,
    pub sprite_warping_accuracy: u8,
    pub quant_type: bool,
    pub quarter_sample: bool,
    pub data_partitioned: bool,
    pub reversible_vlc: bool,
    pub resync_marker_disable: bool,
    pub no_of_sprite_warping_points: u8,
    pub sprite_trajectory_du: [i16; 3],
    pub sprite_trajectory_dv: [i16; 3],
    pub quant_precision: u8,
    pub vop_coding_type: u8,
    pub backward_reference_vop_coding_type: u8,
    pub vop_rounding_type: bool,
    pub intra_dc_vlc_thr: u8,
    pub top_field_first: bool,
    pub alternate_vertical_scan: bool,
    pub vop_fcode_forward: u8,
    pub vop_fcode_backward: u8,
    pub vop_time_increment_resolution: u16,
    pub num_gobs_in_vop: u8,
    pub num_macroblocks_in_gob: u8,
    pub trb: i16,
    pub trd: i16,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct H264PictureInfo {
    pub profile_idc: u8,
    pub level_idc: u8,
    pub width: u16,
    pub height: u16,
    pub width_in_mbs_minus1: u16,
    pub height_in_mbs_minus1: u16,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    pub num_ref_frames: u8,
    pub chroma_format_idc: u8,
    pub frame_mbs_only: bool,
    pub mb_adaptive_frame_field: bool,
    pub direct_8x8_inference: bool,
    pub log2_max_frame_num_minus4: u8,
    pub pic_order_cnt_type: u8,
    pub log2_max_pic_order_cnt_lsb_minus4: u8,
    pub delta_pic_order_always_zero: bool,
    pub pic_init_qp_minus26: i8,
    pub pic_init_qs_minus26: i8,
    pub chroma_qp_index_offset: i8,
    pub second_chroma_qp_index_offset: i8,
    pub entropy_coding_mode: bool,
    pub weighted_pred: bool,
    pub weighted_bipred_idc: u8,
    pub transform_8x8_mode: bool,
    pub field_pic: bool,
    pub constrained_intra_pred: bool,
    pub pic_order_present: bool,
    pub deblocking_filter_control_present: bool,
    pub redundant_pic_cnt_present: bool,
    pub reference_pic: bool,
}

/// VC-1 raw coding or bitplane flags for one macroblock-level syntax element each.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Vc1MacroblockFlags {
    pub mv_type_mb: bool,
    pub direct_mb: bool,
    pub skip_mb: bool,
    pub field_tx: bool,
    pub forward_mb: bool,
    pub ac_pred: bool,
    pub overflags: bool,
}

impl Vc1MacroblockFlags {
    pub fn any(&self) -> bool {
        self.mv_type_mb
            || self.direct_mb
            || self.skip_mb
            || self.field_tx
            || self.forward_mb
            || self.ac_pred
            || self.overflags
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Vc1PictureInfo {
    pub profile: u8,
    pub level: u8,
    pub width: u16,
    pub height: u16,
    pub pulldown: bool,
    pub interlace: bool,
    pub tfcntrflag: bool,
    pub finterpflag: bool,
    pub psf: bool,
    pub multires: bool,
    pub overlap: bool,
    pub syncmarker: bool,
    pub rangered: bool,
    pub max_b_frames: u8,
    pub broken_link: bool,
    pub closed_entry: bool,
    pub panscan: bool,
    pub loopfilter: bool,
    pub conditional_overlap: u8,
    pub fast_uvmc: bool,
    pub b_picture_fraction: u8,
    pub cbp_table: u8,
    pub mb_mode_table: u8,
    pub range_reduction_frame: bool,
    pub rounding_control: bool,
    pub post_processing: u8,
    pub picture_resolution_index: u8,
    pub luma_scale: u8,
    pub luma_shift: u8,
    pub picture_type: u8,
    pub frame_coding_mode: u8,
    pub top_field_first: bool,
    pub is_first_field: bool,
    pub intensity_compensation: bool,
    pub raw_coding: Vc1MacroblockFlags,
    pub bitplane_present: Vc1MacroblockFlags,
    pub mv_mode: u8,
    pub mv_mode2: u8,
    pub mv_table: u8,
    pub extended_mv_range: u8,
    pub extended_dmv_range: u8,
    pub dquant: u8,
    pub quantizer: u8,
    pub half_qp: bool,
    pub pic_quantizer_scale: u8,
    pub pic_quantizer_type: bool,
    pub alt_pic_quantizer: u8,
    pub variable_sized_transform: bool,
    pub frame_level_transform_type: u8,
    pub transform_ac_codingset_idx1: u8,
    pub transform_ac_codingset_idx2: u8,
    pub intra_transform_dc_table: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JpegComponent {
    pub component_id: u8,
    pub h_sampling_factor: u8,
    pub v_sampling_factor: u8,
    pub quantiser_table_selector: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JpegPictureInfo {
    pub width: u16,
    pub height: u16,
    pub components: Vec<JpegComponent>,
}

/// Picture-level parameters, tagged by codec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PictureInfo {
    Mpeg2(Mpeg2PictureInfo),
    Mpeg4(Mpeg4PictureInfo),
    H264(H264PictureInfo),
    Vc1(Vc1PictureInfo),
    Jpeg(JpegPictureInfo),
}

impl PictureInfo {
    pub fn codec(&self) -> Codec {
        match self {
            PictureInfo::Mpeg2(_) => Codec::Mpeg2,
            PictureInfo::Mpeg4(_) => Codec::Mpeg4,
            PictureInfo::H264(_) => Codec::H264,
            PictureInfo::Vc1(_) => Codec::Vc1,
            PictureInfo::Jpeg(_) => Codec::Jpeg,
        }
    }

    /// Coded picture size in pixels.
    pub fn size(&self) -> (u32, u32) {
        let (width, height) = match self {
            PictureInfo::Mpeg2(p) => (p.width, p.height),
            PictureInfo::Mpeg4(p) => (p.width, p.height),
            PictureInfo::H264(p) => (p.width, p.height),
            PictureInfo::Vc1(p) => (p.width, p.height),
            PictureInfo::Jpeg(p) => (p.width, p.height),
        };
        (width.into(), height.into())
    }
}

/// An 8x8 quantiser matrix in zigzag order, and whether the stream loads it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuantMatrix {
    pub load: bool,
    pub coefficients: [u8; 64],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IqMatrix {
    Mpeg2 {
        intra: QuantMatrix,
        non_intra: QuantMatrix,
        chroma_intra: QuantMatrix,
        chroma_non_intra: QuantMatrix,
    },
    Mpeg4 {
        intra: QuantMatrix,
        non_intra: QuantMatrix,
    },
    H264 {
        scaling_list_4x4: [[u8; 16]; 6],
        scaling_list_8x8: [[u8; 64]; 2],
    },
    Jpeg {
        quantiser_tables: [QuantMatrix; 4],
    },
}

impl IqMatrix {
    fn codec(&self) -> Codec {
        match self {
            IqMatrix::Mpeg2 { .. } => Codec::Mpeg2,
            IqMatrix::Mpeg4 { .. } => Codec::Mpeg4,
            IqMatrix::H264 { .. } => Codec::H264,
            IqMatrix::Jpeg { .. } => Codec::Jpeg,
        }
    }
}

/// One JPEG Huffman table pair (DC and AC).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HuffmanTable {
    pub load: bool,
    pub num_dc_codes: [u8; 16],
    pub dc_values: [u8; 12],
    pub num_ac_codes: [u8; 16],
    pub ac_values: Vec<u8>,
}

/// Quantisation and entropy tables that accompany a picture.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tables {
    pub iq_matrix: Option<IqMatrix>,
    pub huffman: Vec<HuffmanTable>,
}

/// Per-slice header fields shared by every codec; unused fields are zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SliceInfo {
    pub data_size: usize,
    pub data_offset: usize,
    pub macroblock_offset: u32,
    pub horizontal_position: u32,
    pub vertical_position: u32,
    pub quantiser_scale: i32,
}

/// Parsed content of a single coded picture.
pub trait CodecSource {
    fn codec(&self) -> Codec;
    fn picture_info(&self) -> PictureInfo;
    fn tables(&self) -> Tables {
        Tables::default()
    }
    /// The whole coded clip, as stored on disk.
    fn video_data(&self) -> &[u8];
    /// VC-1 bitplane buffer, when the picture carries one.
    fn bitplane(&self) -> Option<&[u8]> {
        None
    }
    fn slice_count(&self) -> usize;
    fn slice_info(&self, index: usize) -> Option<SliceInfo>;
    fn slice_data(&self, index: usize) -> Option<&[u8]>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slice<'a> {
    pub info: SliceInfo,
    pub data: &'a [u8],
}

/// Everything a hardware decoder needs to decode one picture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeRequest<'a> {
    pub codec: Codec,
    pub profile: Profile,
    pub width: u32,
    pub height: u32,
    pub picture: PictureInfo,
    pub tables: Tables,
    pub bitplane: Option<&'a [u8]>,
    pub slices: Vec<Slice<'a>>,
    /// The picture as an elementary stream, for decoders that parse bitstreams themselves.
    pub stream: Vec<u8>,
}

impl<'a> DecodeRequest<'a> {
    /// Gathers the picture exposed by `source`, checking it for internal consistency.
    pub fn from_source(source: &'a dyn CodecSource) -> Result<Self> {
        let codec = source.codec();
        let picture = source.picture_info();
        if picture.codec() != codec {
            return Err(CodecError::MismatchedPicture { codec });
        }
        let (width, height) = picture.size();

        let tables = source.tables();
        match &tables.iq_matrix {
            Some(iq) if iq.codec() != codec => {
                return Err(CodecError::MismatchedTables { codec })
            }
            None if codec == Codec::Jpeg => return Err(CodecError::MissingTables(codec)),
            _ => (),
        }

        let bitplane = match &picture {
            PictureInfo::Vc1(vc1) if vc1.bitplane_present.any() => source.bitplane(),
            _ => None,
        };

        let mut slices = Vec::with_capacity(source.slice_count());
        for index in 0..source.slice_count() {
            let info = source
                .slice_info(index)
                .ok_or(CodecError::MissingSlice(codec, index))?;
            let data = source
                .slice_data(index)
                .ok_or(CodecError::MissingSlice(codec, index))?;
            // H.264 headers carry no slice size.
            if codec != Codec::H264 && data.len() != info.data_size {
                return Err(CodecError::SliceSizeMismatch {
                    index,
                    expected: info.data_size,
                    actual: data.len(),
                });
            }
            slices.push(Slice { info, data });
        }

        let stream = match codec {
            Codec::Vc1 => bitstream::vc1_with_end_of_sequence(source.video_data())?,
            Codec::H264 => {
                let first = slices
                    .first()
                    .ok_or(CodecError::MissingSlice(codec, 0))?;
                bitstream::h264_annexb_from_mp4(
                    source.video_data(),
                    first.data,
                    StreamEnd::EndOfSequence,
                )?
            }
            Codec::Mpeg2 | Codec::Mpeg4 | Codec::Jpeg => source.video_data().to_vec(),
        };

        Ok(DecodeRequest {
            codec,
            profile: codec.profile(),
            width,
            height,
            picture,
            tables,
            bitplane,
            slices,
            stream,
        })
    }
}
