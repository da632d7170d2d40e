//! Exhaustive search for the TIMINGR register fields.
//!
//! The computation runs in two passes, following the reference manual
//! procedure for the I2C v2 peripheral:
//!
//! 1. [find_presc_scldel_sdadel] collects all prescaler values for which a
//!    SCLDEL/SDADEL combination satisfies the data setup and hold time
//!    constraints, one candidate per prescaler.
//! 2. [find_scll_sclh] searches the SCLL/SCLH space of every candidate for
//!    the total bus period closest to the nominal one.
//!
//! All quantities are integer nanoseconds, periods are rounded to the
//! nearest nanosecond. The candidate list is built fresh for every
//! computation, nothing is carried over between calls.
use arbitrary_int::u4;
use heapless::Vec;

use crate::{Hertz, SpeedMode, regs::Timingr};

/// Maximum number of entries in the valid timing list.
pub const VALID_TIMING_NBR: usize = 128;
/// Exclusive upper bound of the 4-bit PRESC field.
pub const PRESC_MAX: u32 = 16;
/// Exclusive upper bound of the 4-bit SCLDEL field.
pub const SCLDEL_MAX: u32 = 16;
/// Exclusive upper bound of the 4-bit SDADEL field.
pub const SDADEL_MAX: u32 = 16;
/// Exclusive upper bound of the 8-bit SCLH field.
pub const SCLH_MAX: u32 = 256;
/// Exclusive upper bound of the 8-bit SCLL field.
pub const SCLL_MAX: u32 = 256;

/// Minimum propagation delay of the analog noise filter in ns.
pub const ANALOG_FILTER_DELAY_MIN_NS: u32 = 50;
/// Maximum propagation delay of the analog noise filter in ns.
pub const ANALOG_FILTER_DELAY_MAX_NS: u32 = 260;
/// Digital noise filter coefficient used for all speed modes.
pub const DIGITAL_FILTER_COEF: u32 = 0;

const NSEC_PER_SEC: u32 = 1_000_000_000;

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
#[error("clock frequency is zero")]
pub struct ClockFrequencyZero;

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum TimingError {
    #[error("clock frequency is zero")]
    ClockFrequencyZero(#[from] ClockFrequencyZero),
    #[error("target frequency {0} Hz does not fall into any speed mode window")]
    NoMatchingSpeedMode(u32),
    #[error("no SCL high/low period combination satisfies the timing constraints")]
    NoValidTiming,
}

/// Period of a clock in nanoseconds, rounded to the nearest integer.
#[inline]
pub const fn clock_period_ns(freq: Hertz) -> Result<u32, ClockFrequencyZero> {
    if freq.raw() == 0 {
        return Err(ClockFrequencyZero);
    }
    Ok((NSEC_PER_SEC + freq.raw() / 2) / freq.raw())
}

/// Minimum and maximum propagation delay of the analog noise filter in ns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalogFilterDelay {
    pub min: u32,
    pub max: u32,
}

/// Delay bounds contributed by the analog noise filter, zero when the filter
/// is disabled.
pub const fn analog_filter_delay(enabled: bool) -> AnalogFilterDelay {
    if enabled {
        AnalogFilterDelay {
            min: ANALOG_FILTER_DELAY_MIN_NS,
            max: ANALOG_FILTER_DELAY_MAX_NS,
        }
    } else {
        AnalogFilterDelay { min: 0, max: 0 }
    }
}

/// Delay contributed by the digital noise filter: tDNF = DNF x tI2CCLK.
pub const fn digital_filter_delay(period_ns: u32, coefficient: u32) -> u32 {
    coefficient * period_ns
}

/// One entry of the valid timing list.
///
/// The prescaler and delay fields are filled by [find_presc_scldel_sdadel],
/// the SCL high/low periods by [find_scll_sclh]. All fields are within the
/// bit width of their TIMINGR counterpart by construction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimingCandidate {
    presc: u8,
    scldel: u8,
    sdadel: u8,
    sclh: u8,
    scll: u8,
}

impl TimingCandidate {
    /// Timing prescaler, less than [PRESC_MAX].
    pub const fn presc(&self) -> u8 {
        self.presc
    }

    /// SCL delay (data setup time), less than [SCLDEL_MAX].
    pub const fn scldel(&self) -> u8 {
        self.scldel
    }

    /// SDA delay (data hold time), less than [SDADEL_MAX].
    pub const fn sdadel(&self) -> u8 {
        self.sdadel
    }

    /// SCL high period.
    pub const fn sclh(&self) -> u8 {
        self.sclh
    }

    /// SCL low period.
    pub const fn scll(&self) -> u8 {
        self.scll
    }

    /// Pack the five fields into the TIMINGR register word.
    pub fn timingr(&self) -> Timingr {
        Timingr::builder()
            .with_presc(u4::new(self.presc))
            .with_scldel(u4::new(self.scldel))
            .with_sdadel(u4::new(self.sdadel))
            .with_sclh(self.sclh)
            .with_scll(self.scll)
            .build()
    }
}

/// Compute all valid PRESC/SCLDEL/SDADEL combinations for the given source
/// clock and speed mode.
///
/// The delay bounds follow the setup and hold time formulas of the bus
/// specification:
///
/// ```text
/// SDADEL >= {tf + tHD;DAT(min) - tAF(min) - tDNF - [3 x tI2CCLK]} / {tPRESC}
/// SDADEL <= {tVD;DAT(max) - tr - tAF(max) - tDNF - [4 x tI2CCLK]} / {tPRESC}
/// SCLDEL >= {[tr + tSU;DAT(min)] / [tPRESC]} - 1
/// ```
///
/// Prescaler, SCL delay and SDA delay are scanned in ascending order and the
/// first accepted combination per prescaler value is recorded, so prescaler
/// values in the returned list are strictly increasing. The search stops
/// once the list capacity of [VALID_TIMING_NBR] entries is reached.
pub fn find_presc_scldel_sdadel(
    clock_src_freq: Hertz,
    mode: SpeedMode,
    analog_filter: bool,
) -> Result<Vec<TimingCandidate, VALID_TIMING_NBR>, ClockFrequencyZero> {
    let c = mode.characteristics();
    // Period products and bound sums run in 64-bit arithmetic: a period of
    // up to 10^9 ns (1 Hz source clock) times the counter ranges does not
    // fit into 32 bits.
    let ti2cclk = clock_period_ns(clock_src_freq)? as u64;
    let taf = analog_filter_delay(analog_filter);

    let tsdadel_min = (c.tfall as i64 + c.hddat_min as i64
        - taf.min as i64
        - (c.dnf as i64 + 3) * ti2cclk as i64)
        .max(0) as u64;
    let tsdadel_max = (c.vddat_max as i64
        - c.trise as i64
        - taf.max as i64
        - (c.dnf as i64 + 4) * ti2cclk as i64)
        .max(0) as u64;
    let tscldel_min = (c.trise + c.sudat_min) as u64;

    let mut timings = Vec::new();
    'presc: for presc in 0..PRESC_MAX as u64 {
        for scldel in 0..SCLDEL_MAX as u64 {
            // tSCLDEL = (SCLDEL+1) x (PRESC+1) x tI2CCLK
            let tscldel = (scldel + 1) * (presc + 1) * ti2cclk;
            if tscldel < tscldel_min {
                continue;
            }
            for sdadel in 0..SDADEL_MAX as u64 {
                // tSDADEL = SDADEL x (PRESC+1) x tI2CCLK
                let tsdadel = sdadel * (presc + 1) * ti2cclk;
                if tsdadel < tsdadel_min || tsdadel > tsdadel_max {
                    continue;
                }
                // Only the first accepted combination per prescaler counts.
                if timings.last().map(|t: &TimingCandidate| t.presc as u64) == Some(presc) {
                    continue;
                }
                let candidate = TimingCandidate {
                    presc: presc as u8,
                    scldel: scldel as u8,
                    sdadel: sdadel as u8,
                    sclh: 0,
                    scll: 0,
                };
                if timings.push(candidate).is_err() {
                    break 'presc;
                }
                if timings.is_full() {
                    // Capacity reached is normal early termination.
                    break 'presc;
                }
            }
        }
    }
    Ok(timings)
}

/// Find the SCLL/SCLH combination with the total bus period closest to the
/// nominal one.
///
/// Fills the SCL high/low periods of the winning candidate in place and
/// returns its index, or [None] when no combination satisfies the SCL
/// period constraints:
///
/// ```text
/// tLOW(min)  <= tAF(min) + tDNF + 2 x tI2CCLK + [(SCLL+1) x tPRESC]
/// tHIGH(min) <= tAF(min) + tDNF + 2 x tI2CCLK + [(SCLH+1) x tPRESC]
/// tI2CCLK < (tLOW - tfilters) / 4 and tI2CCLK < tHIGH
/// ```
///
/// The total period tSCL = tLOW + tHIGH + tr + tf must additionally stay
/// within the acceptable bus frequency window of the speed mode. Ties are
/// broken by strict improvement only, so the earliest combination found
/// wins.
pub fn find_scll_sclh(
    clock_src_freq: Hertz,
    mode: SpeedMode,
    analog_filter: bool,
    timings: &mut [TimingCandidate],
) -> Result<Option<usize>, ClockFrequencyZero> {
    let c = mode.characteristics();
    let src_period = clock_period_ns(clock_src_freq)?;
    // The SCL period sums run in 64-bit arithmetic, see
    // [find_presc_scldel_sdadel].
    let ti2cclk = src_period as u64;
    let ti2cspeed = clock_period_ns(mode.frequency())? as u64;
    let taf_min = analog_filter_delay(analog_filter).min as u64;
    let dnf_delay = digital_filter_delay(src_period, c.dnf) as u64;

    // Acceptable total bus period window.
    let tscl_min = (NSEC_PER_SEC / c.freq_max) as u64;
    let tscl_max = (NSEC_PER_SEC / c.freq_min) as u64;

    let mut prev_error = ti2cspeed;
    let mut best = None;

    for (idx, timing) in timings.iter_mut().enumerate() {
        // tPRESC = (PRESC+1) x tI2CCLK
        let tpresc = (timing.presc as u64 + 1) * ti2cclk;
        for scll in 0..SCLL_MAX as u64 {
            let tscl_l = taf_min + dnf_delay + 2 * ti2cclk + (scll + 1) * tpresc;
            // The peripheral clock must be at least four times faster than
            // the SCL low phase with the filter delays removed.
            if tscl_l <= c.lscl_min as u64 || ti2cclk >= (tscl_l - taf_min - dnf_delay) / 4 {
                continue;
            }
            for sclh in 0..SCLH_MAX as u64 {
                let tscl_h = taf_min + dnf_delay + 2 * ti2cclk + (sclh + 1) * tpresc;
                // tSCL = tf + tLOW + tr + tHIGH
                let tscl = tscl_l + tscl_h + c.trise as u64 + c.tfall as u64;
                if tscl < tscl_min
                    || tscl > tscl_max
                    || tscl_h < c.hscl_min as u64
                    || ti2cclk >= tscl_h
                {
                    continue;
                }
                let error = tscl.abs_diff(ti2cspeed);
                if error < prev_error {
                    prev_error = error;
                    timing.scll = scll as u8;
                    timing.sclh = sclh as u8;
                    best = Some(idx);
                }
            }
        }
    }
    Ok(best)
}

/// Compute the TIMINGR register value for the given source clock and speed
/// mode.
pub fn compute_timing(
    clock_src_freq: Hertz,
    mode: SpeedMode,
    analog_filter: bool,
) -> Result<Timingr, TimingError> {
    let mut timings = find_presc_scldel_sdadel(clock_src_freq, mode, analog_filter)?;
    log::debug!(
        "{} valid prescaler/delay combinations for {:?}",
        timings.len(),
        mode
    );
    let best = find_scll_sclh(clock_src_freq, mode, analog_filter, &mut timings)?
        .ok_or(TimingError::NoValidTiming)?;
    Ok(timings[best].timingr())
}

/// Compute the TIMINGR register value for a target bus frequency, resolving
/// the speed mode from its acceptable frequency window first.
pub fn compute_timing_for_target(
    clock_src_freq: Hertz,
    target_freq: Hertz,
    analog_filter: bool,
) -> Result<Timingr, TimingError> {
    let mode = SpeedMode::for_frequency(target_freq)
        .ok_or(TimingError::NoMatchingSpeedMode(target_freq.raw()))?;
    compute_timing(clock_src_freq, mode, analog_filter)
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use fugit::RateExtU32;
    use std::vec::Vec as StdVec;

    #[test]
    fn period_rounds_to_nearest() {
        assert_eq!(clock_period_ns(8.MHz()).unwrap(), 125);
        assert_eq!(clock_period_ns(16.MHz()).unwrap(), 63);
        assert_eq!(clock_period_ns(48.MHz()).unwrap(), 21);
        assert_eq!(clock_period_ns(3.MHz()).unwrap(), 333);
        assert_eq!(clock_period_ns(0.Hz()), Err(ClockFrequencyZero));
    }

    #[test]
    fn filter_delays() {
        assert_eq!(
            analog_filter_delay(true),
            AnalogFilterDelay { min: 50, max: 260 }
        );
        assert_eq!(analog_filter_delay(false), AnalogFilterDelay { min: 0, max: 0 });
        assert_eq!(digital_filter_delay(125, 0), 0);
        assert_eq!(digital_filter_delay(125, 3), 375);
    }

    #[test]
    fn example_standard_8mhz() {
        let timingr = compute_timing(8.MHz(), SpeedMode::Standard, false).unwrap();
        assert_eq!(timingr.raw_value(), 0x00702223);
        assert_eq!(timingr.presc().value(), 0);
        assert_eq!(timingr.scldel().value(), 7);
        assert_eq!(timingr.sdadel().value(), 0);
        assert_eq!(timingr.sclh(), 34);
        assert_eq!(timingr.scll(), 35);
    }

    #[test]
    fn example_standard_8mhz_analog_filter() {
        let timingr = compute_timing(8.MHz(), SpeedMode::Standard, true).unwrap();
        assert_eq!(timingr.raw_value(), 0x00702123);
    }

    #[test]
    fn example_fast_16mhz() {
        let timingr = compute_timing(16.MHz(), SpeedMode::Fast, false).unwrap();
        assert_eq!(timingr.raw_value(), 0x00500A12);
    }

    #[test]
    fn example_fast_plus_48mhz() {
        let timingr = compute_timing(48.MHz(), SpeedMode::FastPlus, false).unwrap();
        assert_eq!(timingr.raw_value(), 0x00520D15);
    }

    #[test]
    fn example_standard_50mhz() {
        let timingr = compute_timing(50.MHz(), SpeedMode::Standard, false).unwrap();
        assert_eq!(timingr.raw_value(), 0x20E04B4D);
    }

    #[test]
    fn candidates_over_operating_range() {
        for mhz in [1, 2, 4, 8, 12, 16, 24, 32, 48, 50] {
            for mode in SpeedMode::ALL {
                let timings = find_presc_scldel_sdadel(mhz.MHz(), mode, false).unwrap();
                assert!(
                    !timings.is_empty(),
                    "no candidates for {} MHz / {:?}",
                    mhz,
                    mode
                );
                assert!(timings.len() <= VALID_TIMING_NBR);
                for pair in timings.windows(2) {
                    assert!(pair[0].presc() < pair[1].presc());
                }
            }
        }
    }

    #[test]
    fn deterministic() {
        let runs: StdVec<u32> = (0..3)
            .map(|_| {
                compute_timing(8.MHz(), SpeedMode::Standard, false)
                    .unwrap()
                    .raw_value()
            })
            .collect();
        assert_eq!(runs[0], runs[1]);
        assert_eq!(runs[1], runs[2]);
    }

    #[test]
    fn best_candidate_has_minimal_error() {
        let mode = SpeedMode::Standard;
        let c = mode.characteristics();
        let timingr = compute_timing(8.MHz(), mode, false).unwrap();
        let ti2cclk = clock_period_ns(8.MHz()).unwrap();
        let ti2cspeed = clock_period_ns(mode.frequency()).unwrap();
        let tpresc = (timingr.presc().value() as u32 + 1) * ti2cclk;

        let total = |scll: u32, sclh: u32| {
            let tscl_l = 2 * ti2cclk + (scll + 1) * tpresc;
            let tscl_h = 2 * ti2cclk + (sclh + 1) * tpresc;
            (tscl_l, tscl_h, tscl_l + tscl_h + c.trise + c.tfall)
        };
        let (_, _, best_total) = total(timingr.scll() as u32, timingr.sclh() as u32);
        let best_error = best_total.abs_diff(ti2cspeed);

        for scll in 0..SCLL_MAX {
            for sclh in 0..SCLH_MAX {
                let (tscl_l, tscl_h, tscl) = total(scll, sclh);
                let valid = tscl_l > c.lscl_min
                    && ti2cclk < tscl_l / 4
                    && tscl_h >= c.hscl_min
                    && ti2cclk < tscl_h
                    && tscl >= NSEC_PER_SEC / c.freq_max
                    && tscl <= NSEC_PER_SEC / c.freq_min;
                if valid {
                    assert!(tscl.abs_diff(ti2cspeed) >= best_error);
                }
            }
        }
    }

    #[test]
    fn no_matching_speed_mode() {
        // 500 kHz falls into the gap between fast and fast plus.
        assert_eq!(
            compute_timing_for_target(8.MHz(), 500.kHz(), false).unwrap_err(),
            TimingError::NoMatchingSpeedMode(500_000)
        );
    }

    #[test]
    fn no_valid_timing_for_slow_source_clock() {
        // A 100 kHz source clock yields prescaler/delay candidates, but every
        // SCLL/SCLH combination overshoots the acceptable bus period window.
        let timings = find_presc_scldel_sdadel(100.kHz(), SpeedMode::Standard, false).unwrap();
        assert!(!timings.is_empty());
        assert_eq!(
            compute_timing(100.kHz(), SpeedMode::Standard, false).unwrap_err(),
            TimingError::NoValidTiming
        );
    }

    #[test]
    fn no_overflow_for_sub_khz_source_clock() {
        // Source clock periods in the millisecond range push the period
        // products beyond 32 bits; the search must terminate with a clean
        // error instead of wrapping or panicking.
        for freq in [1u32, 500, 999] {
            let timings =
                find_presc_scldel_sdadel(freq.Hz(), SpeedMode::Standard, false).unwrap();
            assert_eq!(timings.len(), 16);
            assert_eq!(
                compute_timing(freq.Hz(), SpeedMode::Standard, false).unwrap_err(),
                TimingError::NoValidTiming
            );
        }
    }

    #[test]
    fn zero_clock_rejected() {
        assert_eq!(
            compute_timing(0.Hz(), SpeedMode::Standard, false).unwrap_err(),
            TimingError::ClockFrequencyZero(ClockFrequencyZero)
        );
    }

    #[test]
    fn candidate_packing() {
        let timings = find_presc_scldel_sdadel(8.MHz(), SpeedMode::Standard, false).unwrap();
        for timing in &timings {
            let reg = timing.timingr();
            assert_eq!(reg.presc().value(), timing.presc());
            assert_eq!(reg.scldel().value(), timing.scldel());
            assert_eq!(reg.sdadel().value(), timing.sdadel());
        }
    }
}
