// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Parameter set parsing and per-unit dispatch over an Annex B stream.

use std::collections::BTreeMap;
use std::rc::Rc;

use thiserror::Error;

use crate::codec::h264::nalu::Nalu;
use crate::codec::h264::nalu::NaluHeader;
use crate::codec::h264::nalu::NaluIterator;
use crate::codec::h264::nalu::NaluType;
use crate::codec::h264::rbsp::BitReader;
use crate::codec::h264::rbsp::ReadBitsError;

/// Profiles whose SPS grammar carries the chroma format, bit depth and
/// scaling matrix fields. See 7.3.2.1.1 in the specification.
const EXTENDED_PROFILE_IDCS: [u8; 10] = [100, 110, 122, 244, 44, 83, 86, 118, 128, 138];

/// The maximum number of pictures in the DPB, as per A.3.1, clause h)
const DPB_MAX_SIZE: u32 = 16;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid NALU type, expected {expected:?}, got {got:?}")]
    TypeMismatch {
        expected: NaluType,
        got: NaluType,
    },
    #[error("failed to decode a syntax element: {0}")]
    Read(#[from] ReadBitsError),
}

#[derive(Debug, Error)]
pub enum StreamError {
    /// The caller handed over a buffer with no bytes at all. Unlike a
    /// corrupt unit, there is nothing to resynchronize to.
    #[error("empty input buffer")]
    EmptyStream,
}

/// Fields parsed only when `profile_idc` selects the extended grammar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpsExt {
    /// Specifies the chroma sampling relative to the luma sampling as
    /// specified in clause 6.2.
    pub chroma_format_idc: u8,

    /// Specifies whether the three colour components of the 4:4:4 chroma
    /// format are coded separately.
    pub separate_colour_plane_flag: bool,

    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    pub qpprime_y_zero_transform_bypass_flag: bool,

    /// Whether scaling matrices were present in the bitstream. Their
    /// contents are structurally consumed but not retained.
    pub seq_scaling_matrix_present_flag: bool,
}

/// Picture order count configuration, keyed by `pic_order_cnt_type`. The
/// mode-specific fields only exist in the variant that carries them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PicOrderCnt {
    /// `pic_order_cnt_type == 0`: order counts are coded as LSBs in the
    /// slice headers.
    Lsb {
        log2_max_pic_order_cnt_lsb_minus4: u8,
    },
    /// `pic_order_cnt_type == 1`: order counts follow a coded cycle of
    /// expected deltas.
    Cycle {
        delta_pic_order_always_zero_flag: bool,
        offset_for_non_ref_pic: i32,
        offset_for_top_to_bottom_field: i32,
        /// One entry per reference frame in the picture order count
        /// cycle, sized by `num_ref_frames_in_pic_order_cnt_cycle`.
        offsets_for_ref_frame: Vec<i32>,
    },
    /// `pic_order_cnt_type == 2`: display order follows decoding order.
    FrameNum,
}

impl PicOrderCnt {
    /// Returns the `pic_order_cnt_type` code this variant was parsed from.
    pub fn type_(&self) -> u8 {
        match self {
            PicOrderCnt::Lsb { .. } => 0,
            PicOrderCnt::Cycle { .. } => 1,
            PicOrderCnt::FrameNum => 2,
        }
    }
}

/// Frame cropping offsets, in crop units. Present iff
/// `frame_cropping_flag` is set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CropOffsets {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

/// A H264 Sequence Parameter Set. A syntax structure containing syntax
/// elements that apply to zero or more entire coded video sequences, as
/// selected by the `seq_parameter_set_id` referenced from each picture
/// parameter set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sps {
    /// Identifies the sequence parameter set that is referred to by the
    /// picture parameter set.
    pub seq_parameter_set_id: u8,

    /// Profile to which the coded video sequence conforms.
    pub profile_idc: u8,

    /// Retains the same meaning as in the specification. See 7.4.2.1.1.
    pub constraint_set0_flag: bool,
    /// Retains the same meaning as in the specification. See 7.4.2.1.1.
    pub constraint_set1_flag: bool,
    /// Retains the same meaning as in the specification. See 7.4.2.1.1.
    pub constraint_set2_flag: bool,
    /// Retains the same meaning as in the specification. See 7.4.2.1.1.
    pub constraint_set3_flag: bool,
    /// Retains the same meaning as in the specification. See 7.4.2.1.1.
    pub constraint_set4_flag: bool,
    /// Retains the same meaning as in the specification. See 7.4.2.1.1.
    pub constraint_set5_flag: bool,

    /// Level to which the coded video sequence conforms, as the raw
    /// `level_idc` code. Conformance checking against the level tables is
    /// up to the caller.
    pub level_idc: u8,

    /// Extended-profile fields, present iff `profile_idc` is one of
    /// [`EXTENDED_PROFILE_IDCS`].
    pub ext: Option<SpsExt>,

    /// Specifies the value of the variable MaxFrameNum that is used in
    /// frame_num related derivations as follows: MaxFrameNum = 2 ^
    /// (log2_max_frame_num_minus4 + 4).
    pub log2_max_frame_num_minus4: u8,

    /// Picture order count mode and its mode-specific fields.
    pub pic_order_cnt: PicOrderCnt,

    /// Specifies the maximum number of short-term and long-term reference
    /// frames that may be used by the decoding process for inter
    /// prediction of any picture in the sequence.
    pub max_num_ref_frames: u8,

    pub gaps_in_frame_num_value_allowed_flag: bool,

    /// Plus 1 specifies the width of each decoded picture in units of
    /// macroblocks.
    pub pic_width_in_mbs_minus1: u16,
    /// Plus 1 specifies the height in slice group map units of a decoded
    /// frame or field.
    pub pic_height_in_map_units_minus1: u16,

    /// If true, every coded picture of the sequence is a frame containing
    /// only frame macroblocks; otherwise pictures may be coded fields or
    /// coded frames.
    pub frame_mbs_only_flag: bool,

    /// Whether frame/field macroblock switching may occur within frames.
    /// Only coded when `frame_mbs_only_flag` is unset.
    pub mb_adaptive_frame_field_flag: bool,

    pub direct_8x8_inference_flag: bool,

    /// Cropping rectangle offsets, present iff `frame_cropping_flag` was
    /// set.
    pub crop: Option<CropOffsets>,
}

impl Sps {
    /// Returns the coded width of the stream.
    ///
    /// See 7-13 through 7-17 in the specification.
    pub const fn width(&self) -> u32 {
        (self.pic_width_in_mbs_minus1 as u32 + 1) * 16
    }

    /// Returns the coded height of the stream.
    ///
    /// See 7-13 through 7-17 in the specification.
    pub const fn height(&self) -> u32 {
        (self.pic_height_in_map_units_minus1 as u32 + 1)
            * 16
            * (2 - self.frame_mbs_only_flag as u32)
    }

    /// Same as MaxFrameNum. See 7-10 in the specification.
    pub fn max_frame_num(&self) -> u32 {
        1 << (self.log2_max_frame_num_minus4 + 4)
    }

    /// `chroma_format_idc`, inferred as 1 (4:2:0) when the profile does
    /// not code it.
    pub fn chroma_format_idc(&self) -> u8 {
        match &self.ext {
            Some(ext) => ext.chroma_format_idc,
            None => 1,
        }
    }

    /// Returns `ChromaArrayType`, as computed in the specification.
    pub fn chroma_array_type(&self) -> u8 {
        match &self.ext {
            Some(ext) if ext.separate_colour_plane_flag => 0,
            _ => self.chroma_format_idc(),
        }
    }

    /// Returns `SubWidthC` and `SubHeightC`.
    ///
    /// See table 6-1 in the specification.
    fn sub_width_height_c(&self) -> (u32, u32) {
        match self.chroma_array_type() {
            1 => (2, 2),
            2 => (2, 1),
            3 => (1, 1),
            // monochrome or separate colour planes.
            _ => (1, 1),
        }
    }

    /// Returns `CropUnitX` and `CropUnitY`.
    ///
    /// See 7-19 through 7-22 in the specification.
    fn crop_unit_x_y(&self) -> (u32, u32) {
        match self.chroma_array_type() {
            0 => (1, 2 - u32::from(self.frame_mbs_only_flag)),
            _ => {
                let (sub_width_c, sub_height_c) = self.sub_width_height_c();
                (
                    sub_width_c,
                    sub_height_c * (2 - u32::from(self.frame_mbs_only_flag)),
                )
            }
        }
    }

    /// The displayed picture size: the coded size with the cropping
    /// rectangle applied, or the coded size itself without cropping.
    pub fn visible_size(&self) -> (u32, u32) {
        let crop = match &self.crop {
            Some(crop) => crop,
            None => return (self.width(), self.height()),
        };

        let (crop_unit_x, crop_unit_y) = self.crop_unit_x_y();

        let width = self
            .width()
            .saturating_sub((crop.left + crop.right) * crop_unit_x);
        let height = self
            .height()
            .saturating_sub((crop.top + crop.bottom) * crop_unit_y);

        (width, height)
    }
}

/// Slice group map geometry, keyed by `slice_group_map_type`. See table
/// 7-3 and 8.2.2 in the specification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SliceGroupMap {
    /// `slice_group_map_type == 0`: each group cycles through a coded run
    /// length of map units.
    Interleaved {
        /// One entry per slice group.
        run_length_minus1: Vec<u32>,
    },
    /// `slice_group_map_type == 1`: dispersed mapping, no coded geometry.
    Dispersed,
    /// `slice_group_map_type == 2`: one foreground rectangle per slice
    /// group except the last, which takes the leftover.
    ForegroundLeftover {
        top_left: Vec<u32>,
        bottom_right: Vec<u32>,
    },
    /// `slice_group_map_type == 3..=5`: two groups whose boundary moves
    /// at a coded rate.
    Changing {
        slice_group_map_type: u8,
        slice_group_change_direction_flag: bool,
        slice_group_change_rate_minus1: u32,
    },
    /// `slice_group_map_type == 6`: an explicit group id per map unit,
    /// each coded with just enough bits to span the group count.
    Explicit {
        slice_group_id: Vec<u32>,
    },
}

impl SliceGroupMap {
    /// Returns the `slice_group_map_type` code this variant was parsed
    /// from.
    pub fn type_(&self) -> u8 {
        match self {
            SliceGroupMap::Interleaved { .. } => 0,
            SliceGroupMap::Dispersed => 1,
            SliceGroupMap::ForegroundLeftover { .. } => 2,
            SliceGroupMap::Changing {
                slice_group_map_type,
                ..
            } => *slice_group_map_type,
            SliceGroupMap::Explicit { .. } => 6,
        }
    }
}

/// Slice group configuration, present iff `num_slice_groups_minus1 > 0`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SliceGroups {
    pub num_slice_groups_minus1: u32,
    pub map: SliceGroupMap,
}

/// A H264 Picture Parameter Set. A syntax structure containing syntax
/// elements that apply to zero or more entire coded pictures, as selected
/// by the `pic_parameter_set_id` referenced from each slice header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pps {
    /// Identifies the picture parameter set that is referred to in the
    /// slice header.
    pub pic_parameter_set_id: u8,

    /// Refers to the active sequence parameter set.
    pub seq_parameter_set_id: u8,

    /// Selects the entropy decoding method: Exp-Golomb/CAVLC when unset,
    /// CABAC when set. See clause 9.
    pub entropy_coding_mode_flag: bool,

    /// Whether the picture-order syntax elements for the bottom field of
    /// a coded frame are present in the slice headers.
    pub bottom_field_pic_order_in_frame_present_flag: bool,

    /// Slice group count and geometry, present iff the stream codes more
    /// than one slice group.
    pub slice_groups: Option<SliceGroups>,

    /// Specifies how `num_ref_idx_l0_active_minus1` is inferred for P, SP
    /// and B slices with `num_ref_idx_active_override_flag` not set.
    pub num_ref_idx_l0_default_active_minus1: u8,

    /// Specifies how `num_ref_idx_l1_active_minus1` is inferred for B
    /// slices with `num_ref_idx_active_override_flag` not set.
    pub num_ref_idx_l1_default_active_minus1: u8,

    /// Whether explicit weighted prediction applies to P and SP slices.
    pub weighted_pred_flag: bool,

    /// Weighted prediction mode for B slices: 0 default, 1 explicit, 2
    /// implicit.
    pub weighted_bipred_idc: u8,

    /// Specifies the initial value minus 26 of SliceQPY for each slice.
    pub pic_init_qp_minus26: i8,

    /// Specifies the initial value minus 26 of SliceQSY for all
    /// macroblocks in SP or SI slices.
    pub pic_init_qs_minus26: i8,

    /// Specifies the offset added to QPY and QSY when addressing the
    /// table of QPC values for the Cb chroma component.
    pub chroma_qp_index_offset: i8,

    /// Whether deblocking filter control syntax is present in the slice
    /// headers.
    pub deblocking_filter_control_present_flag: bool,

    /// Whether intra prediction is constrained to intra-coded neighbours.
    pub constrained_intra_pred_flag: bool,

    /// Whether the `redundant_pic_cnt` syntax element is present in slice
    /// headers referring to this picture parameter set.
    pub redundant_pic_cnt_present_flag: bool,
}

impl Pps {
    /// Plus 1 is the number of slice groups for a picture; 0 when all
    /// slices belong to the same group.
    pub fn num_slice_groups_minus1(&self) -> u32 {
        match &self.slice_groups {
            Some(groups) => groups.num_slice_groups_minus1,
            None => 0,
        }
    }
}

/// One record per NAL unit discovered in a stream. `sps`/`pps` are filled
/// for units of the matching type; every other type carries header fields
/// only.
#[derive(Debug, Clone)]
pub struct NaluRecord {
    pub header: NaluHeader,
    pub sps: Option<Rc<Sps>>,
    pub pps: Option<Rc<Pps>>,
}

/// Stream parser holding the currently active parameter sets.
#[derive(Debug, Default)]
pub struct Parser {
    active_spses: BTreeMap<u8, Rc<Sps>>,
    active_ppses: BTreeMap<u8, Rc<Pps>>,
}

impl Parser {
    /// Structurally consumes the scaling matrices of a parameter set. The
    /// coefficients never land in the data model, but the cursor must
    /// advance over exactly the codewords the grammar carries.
    fn skip_scaling_matrices(r: &mut BitReader, chroma_format_idc: u8) -> Result<(), ParseError> {
        let num_lists = if chroma_format_idc != 3 { 8 } else { 12 };

        for i in 0..num_lists {
            let scaling_list_present_flag = r.read_bit()?;
            if scaling_list_present_flag {
                let num_coefficients = if i < 6 { 16 } else { 64 };
                r.skip_codewords(num_coefficients)?;
            }
        }

        Ok(())
    }

    fn parse_slice_groups(r: &mut BitReader, num_slice_groups_minus1: u32) -> Result<SliceGroups, ParseError> {
        let slice_group_map_type: u8 = r.read_ue_max(6)?;

        let map = match slice_group_map_type {
            0 => {
                let mut run_length_minus1 = Vec::with_capacity(num_slice_groups_minus1 as usize + 1);
                for _ in 0..=num_slice_groups_minus1 {
                    run_length_minus1.push(r.read_ue()?);
                }

                SliceGroupMap::Interleaved { run_length_minus1 }
            }
            1 => SliceGroupMap::Dispersed,
            2 => {
                let mut top_left = Vec::with_capacity(num_slice_groups_minus1 as usize);
                let mut bottom_right = Vec::with_capacity(num_slice_groups_minus1 as usize);
                for _ in 0..num_slice_groups_minus1 {
                    top_left.push(r.read_ue()?);
                    bottom_right.push(r.read_ue()?);
                }

                SliceGroupMap::ForegroundLeftover {
                    top_left,
                    bottom_right,
                }
            }
            3..=5 => SliceGroupMap::Changing {
                slice_group_map_type,
                slice_group_change_direction_flag: r.read_bit()?,
                slice_group_change_rate_minus1: r.read_ue()?,
            },
            _ => {
                let pic_size_in_map_units_minus1: u32 = r.read_ue()?;

                // Just enough bits to span the group count: count the
                // right-shifts it takes to clear the value.
                let mut bits_needed = 0;
                let mut value = num_slice_groups_minus1 + 1;
                while value > 0 {
                    bits_needed += 1;
                    value >>= 1;
                }

                let mut slice_group_id = Vec::new();
                for _ in 0..=pic_size_in_map_units_minus1 {
                    slice_group_id.push(r.read_bits(bits_needed)?);
                }

                SliceGroupMap::Explicit { slice_group_id }
            }
        };

        Ok(SliceGroups {
            num_slice_groups_minus1,
            map,
        })
    }

    /// Parse a SPS and add it to the set of active SPSes.
    ///
    /// Returns a reference to the parsed SPS.
    pub fn parse_sps(&mut self, nalu: &Nalu) -> Result<&Rc<Sps>, ParseError> {
        if !matches!(nalu.header.type_, NaluType::Sps) {
            return Err(ParseError::TypeMismatch {
                expected: NaluType::Sps,
                got: nalu.header.type_,
            });
        }

        let mut r = BitReader::new(&nalu.rbsp);

        let profile_idc = r.read_bits(8)?;
        let constraint_set0_flag = r.read_bit()?;
        let constraint_set1_flag = r.read_bit()?;
        let constraint_set2_flag = r.read_bit()?;
        let constraint_set3_flag = r.read_bit()?;
        let constraint_set4_flag = r.read_bit()?;
        let constraint_set5_flag = r.read_bit()?;

        // reserved_zero_2bits
        r.skip_bits(2)?;

        let level_idc = r.read_bits(8)?;
        let seq_parameter_set_id = r.read_ue_max(31)?;

        let ext = if EXTENDED_PROFILE_IDCS.contains(&profile_idc) {
            let chroma_format_idc = r.read_ue_max(3)?;
            let separate_colour_plane_flag = if chroma_format_idc == 3 {
                r.read_bit()?
            } else {
                false
            };

            let bit_depth_luma_minus8 = r.read_ue_max(6)?;
            let bit_depth_chroma_minus8 = r.read_ue_max(6)?;
            let qpprime_y_zero_transform_bypass_flag = r.read_bit()?;

            let seq_scaling_matrix_present_flag = r.read_bit()?;
            if seq_scaling_matrix_present_flag {
                Parser::skip_scaling_matrices(&mut r, chroma_format_idc)?;
            }

            Some(SpsExt {
                chroma_format_idc,
                separate_colour_plane_flag,
                bit_depth_luma_minus8,
                bit_depth_chroma_minus8,
                qpprime_y_zero_transform_bypass_flag,
                seq_scaling_matrix_present_flag,
            })
        } else {
            None
        };

        let log2_max_frame_num_minus4 = r.read_ue_max(12)?;

        let pic_order_cnt = match r.read_ue_max::<u8>(2)? {
            0 => PicOrderCnt::Lsb {
                log2_max_pic_order_cnt_lsb_minus4: r.read_ue_max(12)?,
            },
            1 => {
                let delta_pic_order_always_zero_flag = r.read_bit()?;
                let offset_for_non_ref_pic = r.read_se()?;
                let offset_for_top_to_bottom_field = r.read_se()?;

                let num_ref_frames_in_pic_order_cnt_cycle: u8 = r.read_ue_max(254)?;
                let mut offsets_for_ref_frame =
                    Vec::with_capacity(usize::from(num_ref_frames_in_pic_order_cnt_cycle));
                for _ in 0..num_ref_frames_in_pic_order_cnt_cycle {
                    offsets_for_ref_frame.push(r.read_se()?);
                }

                PicOrderCnt::Cycle {
                    delta_pic_order_always_zero_flag,
                    offset_for_non_ref_pic,
                    offset_for_top_to_bottom_field,
                    offsets_for_ref_frame,
                }
            }
            _ => PicOrderCnt::FrameNum,
        };

        let max_num_ref_frames = r.read_ue_max(DPB_MAX_SIZE)?;
        let gaps_in_frame_num_value_allowed_flag = r.read_bit()?;
        let pic_width_in_mbs_minus1 = r.read_ue()?;
        let pic_height_in_map_units_minus1 = r.read_ue()?;

        let frame_mbs_only_flag = r.read_bit()?;
        let mb_adaptive_frame_field_flag = if !frame_mbs_only_flag {
            r.read_bit()?
        } else {
            false
        };

        let direct_8x8_inference_flag = r.read_bit()?;

        let frame_cropping_flag = r.read_bit()?;
        let crop = if frame_cropping_flag {
            Some(CropOffsets {
                left: r.read_ue()?,
                right: r.read_ue()?,
                top: r.read_ue()?,
                bottom: r.read_ue()?,
            })
        } else {
            None
        };

        let sps = Sps {
            seq_parameter_set_id,
            profile_idc,
            constraint_set0_flag,
            constraint_set1_flag,
            constraint_set2_flag,
            constraint_set3_flag,
            constraint_set4_flag,
            constraint_set5_flag,
            level_idc,
            ext,
            log2_max_frame_num_minus4,
            pic_order_cnt,
            max_num_ref_frames,
            gaps_in_frame_num_value_allowed_flag,
            pic_width_in_mbs_minus1,
            pic_height_in_map_units_minus1,
            frame_mbs_only_flag,
            mb_adaptive_frame_field_flag,
            direct_8x8_inference_flag,
            crop,
        };

        let key = sps.seq_parameter_set_id;
        self.active_spses.remove(&key);
        Ok(self.active_spses.entry(key).or_insert(Rc::new(sps)))
    }

    /// Parse a PPS and add it to the set of active PPSes.
    ///
    /// Returns a reference to the parsed PPS.
    pub fn parse_pps(&mut self, nalu: &Nalu) -> Result<&Rc<Pps>, ParseError> {
        if !matches!(nalu.header.type_, NaluType::Pps) {
            return Err(ParseError::TypeMismatch {
                expected: NaluType::Pps,
                got: nalu.header.type_,
            });
        }

        let mut r = BitReader::new(&nalu.rbsp);

        let pic_parameter_set_id = r.read_ue_max(255)?;
        let seq_parameter_set_id = r.read_ue_max(31)?;

        let entropy_coding_mode_flag = r.read_bit()?;
        let bottom_field_pic_order_in_frame_present_flag = r.read_bit()?;

        let num_slice_groups_minus1 = r.read_ue_max(7)?;
        let slice_groups = if num_slice_groups_minus1 > 0 {
            Some(Parser::parse_slice_groups(&mut r, num_slice_groups_minus1)?)
        } else {
            None
        };

        let num_ref_idx_l0_default_active_minus1 = r.read_ue_max(31)?;
        let num_ref_idx_l1_default_active_minus1 = r.read_ue_max(31)?;

        let weighted_pred_flag = r.read_bit()?;
        let weighted_bipred_idc = r.read_bits(2)?;

        // -(26 + QpBdOffsetY) at the deepest supported bit depth.
        let pic_init_qp_minus26 = r.read_se_bounded(-62, 25)?;
        let pic_init_qs_minus26 = r.read_se_bounded(-26, 25)?;
        let chroma_qp_index_offset = r.read_se_bounded(-12, 12)?;

        let deblocking_filter_control_present_flag = r.read_bit()?;
        let constrained_intra_pred_flag = r.read_bit()?;
        let redundant_pic_cnt_present_flag = r.read_bit()?;

        let pps = Pps {
            pic_parameter_set_id,
            seq_parameter_set_id,
            entropy_coding_mode_flag,
            bottom_field_pic_order_in_frame_present_flag,
            slice_groups,
            num_ref_idx_l0_default_active_minus1,
            num_ref_idx_l1_default_active_minus1,
            weighted_pred_flag,
            weighted_bipred_idc,
            pic_init_qp_minus26,
            pic_init_qs_minus26,
            chroma_qp_index_offset,
            deblocking_filter_control_present_flag,
            constrained_intra_pred_flag,
            redundant_pic_cnt_present_flag,
        };

        let key = pps.pic_parameter_set_id;
        self.active_ppses.remove(&key);
        Ok(self.active_ppses.entry(key).or_insert(Rc::new(pps)))
    }

    pub fn get_sps(&self, sps_id: u8) -> Option<&Rc<Sps>> {
        self.active_spses.get(&sps_id)
    }

    pub fn get_pps(&self, pps_id: u8) -> Option<&Rc<Pps>> {
        self.active_ppses.get(&pps_id)
    }

    /// Walks a whole Annex B buffer and emits one record per NAL unit.
    ///
    /// A unit whose parameter set fails to decode is skipped and scanning
    /// resumes at the next start code, so corruption in one unit does not
    /// block recovery of the units that follow. Only an empty input
    /// buffer is fatal.
    pub fn parse_stream(&mut self, data: &[u8]) -> Result<Vec<NaluRecord>, StreamError> {
        if data.is_empty() {
            return Err(StreamError::EmptyStream);
        }

        let mut records = Vec::new();

        for nalu in NaluIterator::new(data) {
            let mut record = NaluRecord {
                header: nalu.header,
                sps: None,
                pps: None,
            };

            match nalu.header.type_ {
                NaluType::Sps => match self.parse_sps(&nalu) {
                    Ok(sps) => record.sps = Some(Rc::clone(sps)),
                    Err(err) => {
                        log::warn!("skipping undecodable SPS unit: {}", err);
                        continue;
                    }
                },
                NaluType::Pps => match self.parse_pps(&nalu) {
                    Ok(pps) => record.pps = Some(Rc::clone(pps)),
                    Err(err) => {
                        log::warn!("skipping undecodable PPS unit: {}", err);
                        continue;
                    }
                },
                _ => (),
            }

            records.push(record);
        }

        Ok(records)
    }
}
