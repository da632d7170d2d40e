//! I2C timing register module.
use arbitrary_int::u4;

/// TIMINGR register of the STM32 I2C v2 peripheral.
///
/// Holds all quantities the timing generator derives the bus waveform from.
/// PRESC, SCLDEL and SDADEL are 4-bit fields and SCLH/SCLL are 8-bit fields,
/// so out-of-range values are unrepresentable. Bits 24 to 27 are reserved
/// and always zero.
#[bitbybit::bitfield(u32, default = 0x0)]
#[derive(Debug, PartialEq, Eq)]
pub struct Timingr {
    /// Timing prescaler. The peripheral clock is divided by this value + 1
    /// before it feeds the delay and period counters.
    #[bits(28..=31, rw)]
    presc: u4,
    /// SCL delay, controls the data setup time.
    #[bits(20..=23, rw)]
    scldel: u4,
    /// SDA delay, controls the data hold time.
    #[bits(16..=19, rw)]
    sdadel: u4,
    /// SCL high period.
    #[bits(8..=15, rw)]
    sclh: u8,
    /// SCL low period.
    #[bits(0..=7, rw)]
    scll: u8,
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;

    #[test]
    fn field_round_trip() {
        let reg = Timingr::builder()
            .with_presc(u4::new(0xA))
            .with_scldel(u4::new(0x3))
            .with_sdadel(u4::new(0x7))
            .with_sclh(0x55)
            .with_scll(0xAA)
            .build();
        assert_eq!(reg.raw_value(), 0xA037_55AA);
        assert_eq!(reg.presc().value(), 0xA);
        assert_eq!(reg.scldel().value(), 0x3);
        assert_eq!(reg.sdadel().value(), 0x7);
        assert_eq!(reg.sclh(), 0x55);
        assert_eq!(reg.scll(), 0xAA);
    }

    #[test]
    fn field_extraction() {
        let reg = Timingr::new_with_raw_value(0x00702223);
        assert_eq!(reg.presc().value(), 0);
        assert_eq!(reg.scldel().value(), 7);
        assert_eq!(reg.sdadel().value(), 0);
        assert_eq!(reg.sclh(), 0x22);
        assert_eq!(reg.scll(), 0x23);
    }
}
