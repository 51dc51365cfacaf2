//! Conversion between bit-packed raw vectors and network patterns.
//!
//! A raw vector is a little-endian bit field. Bits `[0, input_bits)` hold
//! the sensor features, the next `output_bits` hold the commands (training
//! targets on the way in, decisions on the way out). Anything above that is
//! reserved and ignored.

use crate::network::Dimensions;

use std::fmt;

/// Width of a raw vector on the wire.
pub const VECTOR_BYTES: usize = 4;
/// Number of addressable bits in a raw vector.
pub const VECTOR_BITS: usize = VECTOR_BYTES * 8;

/// The fixed-width wire representation exchanged with the transport.
pub type RawVector = [u8; VECTOR_BYTES];

/// Named bits of the reference sensor/command layout (24 features, 7
/// commands).
pub mod bits {
    pub const INPUT_VELOCITY_BACK: u32 = 0x0000_0001;
    pub const INPUT_VELOCITY_STOP: u32 = 0x0000_0002;
    pub const INPUT_VELOCITY_FWD1: u32 = 0x0000_0004;
    pub const INPUT_VELOCITY_FWD2: u32 = 0x0000_0008;

    pub const INPUT_HEADING_N: u32 = 0x0000_0010;
    pub const INPUT_HEADING_NE: u32 = 0x0000_0020;
    pub const INPUT_HEADING_E: u32 = 0x0000_0040;
    pub const INPUT_HEADING_SE: u32 = 0x0000_0080;
    pub const INPUT_HEADING_S: u32 = 0x0000_0100;
    pub const INPUT_HEADING_SW: u32 = 0x0000_0200;
    pub const INPUT_HEADING_W: u32 = 0x0000_0400;
    pub const INPUT_HEADING_NW: u32 = 0x0000_0800;

    pub const INPUT_GOAL_HEADING_N: u32 = 0x0000_1000;
    pub const INPUT_GOAL_HEADING_E: u32 = 0x0000_2000;
    pub const INPUT_GOAL_HEADING_S: u32 = 0x0000_4000;
    pub const INPUT_GOAL_HEADING_W: u32 = 0x0000_8000;

    pub const INPUT_OBSTACLE_FIELD_A: u32 = 0x0001_0000;
    pub const INPUT_OBSTACLE_FIELD_B: u32 = 0x0002_0000;
    pub const INPUT_OBSTACLE_FIELD_C: u32 = 0x0004_0000;
    pub const INPUT_OBSTACLE_FIELD_D: u32 = 0x0008_0000;
    pub const INPUT_OBSTACLE_FIELD_E: u32 = 0x0010_0000;
    pub const INPUT_OBSTACLE_FIELD_F: u32 = 0x0020_0000;
    pub const INPUT_OBSTACLE_FIELD_G: u32 = 0x0040_0000;
    pub const INPUT_OBSTACLE_FIELD_H: u32 = 0x0080_0000;

    pub const OUTPUT_VELOCITY_BACK: u32 = 0x0100_0000;
    pub const OUTPUT_VELOCITY_STOP: u32 = 0x0200_0000;
    pub const OUTPUT_VELOCITY_FWD1: u32 = 0x0400_0000;
    pub const OUTPUT_VELOCITY_FWD2: u32 = 0x0800_0000;

    pub const OUTPUT_STEER_LEFT: u32 = 0x1000_0000;
    pub const OUTPUT_STEER_STRAIGHT: u32 = 0x2000_0000;
    pub const OUTPUT_STEER_RIGHT: u32 = 0x4000_0000;
}

use self::bits::*;

const INPUT_NAMES: [(u32, &str); 24] = [
    (INPUT_VELOCITY_BACK, "velocity back"),
    (INPUT_VELOCITY_STOP, "velocity stop"),
    (INPUT_VELOCITY_FWD1, "velocity fwd1"),
    (INPUT_VELOCITY_FWD2, "velocity fwd2"),
    (INPUT_HEADING_N, "heading N"),
    (INPUT_HEADING_NE, "heading NE"),
    (INPUT_HEADING_E, "heading E"),
    (INPUT_HEADING_SE, "heading SE"),
    (INPUT_HEADING_S, "heading S"),
    (INPUT_HEADING_SW, "heading SW"),
    (INPUT_HEADING_W, "heading W"),
    (INPUT_HEADING_NW, "heading NW"),
    (INPUT_GOAL_HEADING_N, "goal heading N"),
    (INPUT_GOAL_HEADING_E, "goal heading E"),
    (INPUT_GOAL_HEADING_S, "goal heading S"),
    (INPUT_GOAL_HEADING_W, "goal heading W"),
    (INPUT_OBSTACLE_FIELD_A, "obstacle field A"),
    (INPUT_OBSTACLE_FIELD_B, "obstacle field B"),
    (INPUT_OBSTACLE_FIELD_C, "obstacle field C"),
    (INPUT_OBSTACLE_FIELD_D, "obstacle field D"),
    (INPUT_OBSTACLE_FIELD_E, "obstacle field E"),
    (INPUT_OBSTACLE_FIELD_F, "obstacle field F"),
    (INPUT_OBSTACLE_FIELD_G, "obstacle field G"),
    (INPUT_OBSTACLE_FIELD_H, "obstacle field H"),
];

const OUTPUT_NAMES: [(u32, &str); 7] = [
    (OUTPUT_VELOCITY_BACK, "velocity back"),
    (OUTPUT_VELOCITY_STOP, "velocity stop"),
    (OUTPUT_VELOCITY_FWD1, "velocity fwd1"),
    (OUTPUT_VELOCITY_FWD2, "velocity fwd2"),
    (OUTPUT_STEER_LEFT, "steer left"),
    (OUTPUT_STEER_STRAIGHT, "steer straight"),
    (OUTPUT_STEER_RIGHT, "steer right"),
];

/// Packs a 32-bit field into its wire representation.
pub fn raw_from_word(word: u32) -> RawVector {
    word.to_le_bytes()
}

/// Unpacks the wire representation into a 32-bit field.
pub fn word_from_raw(raw: &RawVector) -> u32 {
    u32::from_le_bytes(*raw)
}

/// A decoded raw vector: sensor features and command targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    pub inputs: Vec<bool>,
    pub targets: Vec<bool>,
}

impl Pattern {
    /// Returns the command targets as unit activations.
    pub fn target_activations(&self) -> Vec<f64> {
        self.targets.iter().map(|&t| if t { 1.0 } else { 0.0 }).collect()
    }
}

/// Maps raw vectors onto patterns of a fixed shape.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PatternCodec {
    input_bits: usize,
    output_bits: usize,
}

impl PatternCodec {
    pub fn new(input_bits: usize, output_bits: usize) -> Self {
        assert!(input_bits + output_bits <= VECTOR_BITS);
        PatternCodec {
            input_bits,
            output_bits,
        }
    }

    /// A codec for a network of the given size: one feature bit per
    /// non-bias input unit, one command bit per output unit.
    pub fn for_dimensions(dims: &Dimensions) -> Self {
        PatternCodec::new(dims.feature_bits(), dims.output_len)
    }

    pub fn input_bits(&self) -> usize {
        self.input_bits
    }

    pub fn output_bits(&self) -> usize {
        self.output_bits
    }

    pub fn decode(&self, raw: &RawVector) -> Pattern {
        let word = word_from_raw(raw);
        let bit = |pos: usize| word & (1 << pos) != 0;
        Pattern {
            inputs: (0..self.input_bits).map(bit).collect(),
            targets: (self.input_bits..self.input_bits + self.output_bits)
                .map(bit)
                .collect(),
        }
    }

    /// Places `outputs[i]` at bit `input_bits + i`; every other bit is zero.
    pub fn encode(&self, outputs: &[bool]) -> RawVector {
        assert_eq!(outputs.len(), self.output_bits);
        let word = outputs
            .iter()
            .enumerate()
            .filter(|&(_, &on)| on)
            .fold(0u32, |word, (i, _)| word | 1 << (self.input_bits + i));
        raw_from_word(word)
    }
}

/// A human-readable account of which named bits a raw vector carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub inputs: Vec<&'static str>,
    pub outputs: Vec<&'static str>,
}

/// Lists the named features and commands set in `raw`, using the
/// reference 24/7 layout.
pub fn describe(raw: &RawVector) -> Report {
    let word = word_from_raw(raw);
    let named = |names: &[(u32, &'static str)]| -> Vec<&'static str> {
        names
            .iter()
            .filter(|&&(mask, _)| word & mask != 0)
            .map(|&(_, name)| name)
            .collect()
    };
    Report {
        inputs: named(&INPUT_NAMES),
        outputs: named(&OUTPUT_NAMES),
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "inputs [{}] outputs [{}]",
            self.inputs.join(", "),
            self.outputs.join(", ")
        )
    }
}
