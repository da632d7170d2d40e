//! # TIMINGR calculation for the STM32 I2C v2 peripheral
//!
//! The I2C v2 peripheral derives all bus timings from a single 32-bit
//! [TIMINGR](crate::regs::Timingr) register: a clock prescaler, the SDA/SCL
//! delay counters and the SCL high/low period counters. This crate computes
//! a register value for a given peripheral source clock and bus speed mode
//! by exhaustively searching the integer parameter space against the setup,
//! hold and clock period constraints of the I2C bus specification.
//!
//! All timing arithmetic is done in integer nanoseconds. The crate does not
//! touch any hardware and is `no_std`, so it can be used from host-side
//! configuration tools as well as firmware.
#![no_std]

pub mod regs;
pub mod timing;

pub use regs::Timingr;
pub use timing::{TimingError, compute_timing, compute_timing_for_target};

/// Hertz
pub type Hertz = fugit::HertzU32;

/// Electrical characteristics of one I2C bus speed mode.
///
/// The values are taken from the timing tables of the I2C bus specification.
/// All times are given in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Characteristics {
    /// Nominal bus frequency in Hz.
    pub freq: u32,
    /// Minimum acceptable bus frequency in Hz.
    pub freq_min: u32,
    /// Maximum acceptable bus frequency in Hz.
    pub freq_max: u32,
    /// Minimum data hold time in ns.
    pub hddat_min: u32,
    /// Maximum data valid time in ns.
    pub vddat_max: u32,
    /// Minimum data setup time in ns.
    pub sudat_min: u32,
    /// Minimum low period of the SCL clock in ns.
    pub lscl_min: u32,
    /// Minimum high period of the SCL clock in ns.
    pub hscl_min: u32,
    /// Rise time in ns.
    pub trise: u32,
    /// Fall time in ns.
    pub tfall: u32,
    /// Digital noise filter coefficient.
    pub dnf: u32,
}

const STANDARD: Characteristics = Characteristics {
    freq: 100_000,
    freq_min: 80_000,
    freq_max: 120_000,
    hddat_min: 0,
    vddat_max: 3450,
    sudat_min: 250,
    lscl_min: 4700,
    hscl_min: 4000,
    trise: 640,
    tfall: 20,
    dnf: timing::DIGITAL_FILTER_COEF,
};

const FAST: Characteristics = Characteristics {
    freq: 400_000,
    freq_min: 320_000,
    freq_max: 480_000,
    hddat_min: 0,
    vddat_max: 900,
    sudat_min: 100,
    lscl_min: 1300,
    hscl_min: 600,
    trise: 250,
    tfall: 100,
    dnf: timing::DIGITAL_FILTER_COEF,
};

const FAST_PLUS: Characteristics = Characteristics {
    freq: 1_000_000,
    freq_min: 800_000,
    freq_max: 1_200_000,
    hddat_min: 0,
    vddat_max: 450,
    sudat_min: 50,
    lscl_min: 500,
    hscl_min: 260,
    trise: 60,
    tfall: 100,
    dnf: timing::DIGITAL_FILTER_COEF,
};

/// The three standard I2C bus speed tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedMode {
    /// Standard mode, 100 kHz.
    Standard,
    /// Fast mode, 400 kHz.
    Fast,
    /// Fast mode plus, 1 MHz.
    FastPlus,
}

impl SpeedMode {
    pub const ALL: [SpeedMode; 3] = [SpeedMode::Standard, SpeedMode::Fast, SpeedMode::FastPlus];

    /// Electrical characteristics of this speed mode.
    pub const fn characteristics(&self) -> &'static Characteristics {
        match self {
            SpeedMode::Standard => &STANDARD,
            SpeedMode::Fast => &FAST,
            SpeedMode::FastPlus => &FAST_PLUS,
        }
    }

    /// Nominal bus frequency of this speed mode.
    pub const fn frequency(&self) -> Hertz {
        Hertz::from_raw(self.characteristics().freq)
    }

    /// Resolve a target bus frequency to the speed mode whose acceptable
    /// frequency window contains it.
    ///
    /// The windows of the three modes do not overlap, so at most one mode
    /// matches. Frequencies falling into the gaps between the windows do not
    /// resolve to any mode.
    pub fn for_frequency(target: Hertz) -> Option<SpeedMode> {
        Self::ALL.into_iter().find(|mode| {
            let c = mode.characteristics();
            (c.freq_min..=c.freq_max).contains(&target.raw())
        })
    }
}
