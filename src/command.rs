//! Input shift register command words.
//!
//! Every write to an AD57x4 is a 24-bit word clocked in MSB first:
//!
//! | Bits  | Field                                            |
//! |-------|--------------------------------------------------|
//! | 23    | R/W (always 0, readback is not supported)        |
//! | 22    | zero                                             |
//! | 21-19 | register (DAC, range select, power, control)     |
//! | 18-16 | channel or control function address              |
//! | 15-0  | payload                                          |

use crate::InvalidArgument;

const REG_DAC: u32 = 0b000 << 19;
const REG_RANGE_SELECT: u32 = 0b001 << 19;
const REG_POWER_CONTROL: u32 = 0b010 << 19;
const REG_CONTROL: u32 = 0b011 << 19;

const FN_CONFIG: u32 = 0b001 << 16;
const FN_CLEAR: u32 = 0b100 << 16;
const FN_LOAD: u32 = 0b101 << 16;

/// Flips a two's complement code into the offset binary the DAC latches.
const OFFSET_BINARY_MASK: u32 = 0x00_8000;

/// A DAC channel, or all four at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[repr(u8)]
pub enum Channel {
    A = 0b000,
    B = 0b001,
    C = 0b010,
    D = 0b011,
    /// Broadcast to every channel of the device
    All = 0b100,
}

impl Channel {
    /// The four individually addressable channels, in address order.
    pub const EACH: [Channel; 4] = [Channel::A, Channel::B, Channel::C, Channel::D];

    fn address(self) -> u32 {
        (self as u32) << 16
    }
}

/// Channels are numbered 1 (A) to 4 (D); 5 addresses all of them.
impl TryFrom<u8> for Channel {
    type Error = InvalidArgument;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::A),
            2 => Ok(Self::B),
            3 => Ok(Self::C),
            4 => Ok(Self::D),
            5 => Ok(Self::All),
            n => Err(InvalidArgument::Channel(n)),
        }
    }
}

/// Output voltage span of a channel, assuming a 2.5V reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[repr(u8)]
pub enum OutputRange {
    /// 0V to +5V
    Unipolar5V = 0b000,
    /// 0V to +10V
    Unipolar10V = 0b001,
    /// 0V to +10.8V
    Unipolar10_8V = 0b010,
    /// -5V to +5V
    Bipolar5V = 0b011,
    /// -10V to +10V
    Bipolar10V = 0b100,
    /// -10.8V to +10.8V
    Bipolar10_8V = 0b101,
}

/// Ranges are selected as 1 (0-5V) to 6 (±10.8V).
impl TryFrom<u8> for OutputRange {
    type Error = InvalidArgument;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Unipolar5V),
            2 => Ok(Self::Unipolar10V),
            3 => Ok(Self::Unipolar10_8V),
            4 => Ok(Self::Bipolar5V),
            5 => Ok(Self::Bipolar10V),
            6 => Ok(Self::Bipolar10_8V),
            n => Err(InvalidArgument::Range(n)),
        }
    }
}

impl OutputRange {
    /// Lowest and highest voltage the range will encode. Requests outside
    /// are saturated to these.
    ///
    /// The 0-10.8V range shares the 0-10V ceiling.
    pub fn bounds(self) -> (f32, f32) {
        match self {
            Self::Unipolar5V => (0.0, 4.999_923_706_054_688),
            Self::Unipolar10V => (0.0, 9.999_847_412_109_375),
            Self::Unipolar10_8V => (0.0, 9.999_847_412_109_375),
            Self::Bipolar5V => (-4.999_847_412_109_375, 4.999_847_412_109_375),
            Self::Bipolar10V => (-9.999_694_824_218_75, 9.999_694_824_218_75),
            Self::Bipolar10_8V => (-10.799_670_410_156_25, 10.799_670_410_156_25),
        }
    }

    /// Nominal full-scale voltage.
    pub fn full_scale(self) -> f32 {
        match self {
            Self::Unipolar5V | Self::Bipolar5V => 5.0,
            Self::Unipolar10V | Self::Bipolar10V => 10.0,
            Self::Unipolar10_8V | Self::Bipolar10_8V => 10.8,
        }
    }

    pub fn is_bipolar(self) -> bool {
        matches!(self, Self::Bipolar5V | Self::Bipolar10V | Self::Bipolar10_8V)
    }

    fn span(self) -> f32 {
        if self.is_bipolar() {
            32_768.0
        } else {
            65_536.0
        }
    }

    /// `voltage` saturated to [`bounds`](Self::bounds).
    pub fn clamp(self, voltage: f32) -> f32 {
        let (min, max) = self.bounds();
        voltage.clamp(min, max)
    }

    /// The 16-bit code for `voltage`: straight binary for unipolar ranges,
    /// two's complement for bipolar ones. Fractions are truncated toward zero.
    pub fn code(self, voltage: f32) -> u16 {
        let scaled = (self.clamp(voltage) / self.full_scale()) * self.span();
        scaled as i32 as u16
    }
}

/// A 24-bit input shift register word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct CommandWord(u32);

impl CommandWord {
    /// Control register options sent at start-up: CLR select, current clamp
    /// and thermal shutdown enabled, SDO left enabled.
    pub const STARTUP_CONTROL: u8 = 0b1110;

    /// Write `code` to a channel's DAC register. Bit 15 is inverted on the way
    /// out.
    pub fn dac(channel: Channel, code: u16) -> Self {
        Self((REG_DAC | channel.address() | code as u32) ^ OFFSET_BINARY_MASK)
    }

    /// `voltage` encoded for `range` and addressed to `channel`.
    pub fn voltage(channel: Channel, range: OutputRange, voltage: f32) -> Self {
        Self::dac(channel, range.code(voltage))
    }

    pub fn range_select(channel: Channel, range: OutputRange) -> Self {
        Self(REG_RANGE_SELECT | channel.address() | range as u32)
    }

    /// Power up the channels whose bit is set in the low nibble of `mask`.
    pub fn power_control(mask: u8) -> Self {
        Self(REG_POWER_CONTROL | (mask & 0x0F) as u32)
    }

    /// Power up the first `channel_count` channels.
    pub fn power_up(channel_count: u8) -> Self {
        let mask = (1u16 << channel_count.min(4)) - 1;
        Self::power_control(mask as u8)
    }

    /// Control register options: bit 0 SDO disable, bit 1 CLR select, bit 2
    /// clamp enable, bit 3 thermal shutdown enable.
    pub fn control(options: u8) -> Self {
        Self(REG_CONTROL | FN_CONFIG | (options & 0x0F) as u32)
    }

    pub fn clear() -> Self {
        Self(REG_CONTROL | FN_CLEAR)
    }

    pub fn load() -> Self {
        Self(REG_CONTROL | FN_LOAD)
    }

    /// Register and address field (bits 23-16).
    pub fn address(self) -> u32 {
        self.0 & 0xFF_0000
    }

    /// Payload field (bits 15-0).
    pub fn payload(self) -> u16 {
        self.0 as u16
    }

    /// The three bytes as clocked onto the bus.
    pub fn to_bytes(self) -> [u8; 3] {
        let [_, hi, mid, lo] = self.0.to_be_bytes();
        [hi, mid, lo]
    }
}

impl From<CommandWord> for u32 {
    fn from(value: CommandWord) -> Self {
        value.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const RANGES: [OutputRange; 6] = [
        OutputRange::Unipolar5V,
        OutputRange::Unipolar10V,
        OutputRange::Unipolar10_8V,
        OutputRange::Bipolar5V,
        OutputRange::Bipolar10V,
        OutputRange::Bipolar10_8V,
    ];

    #[test]
    fn selector_to_range_conversion() {
        for (i, range) in RANGES.iter().enumerate() {
            assert_eq!(OutputRange::try_from(i as u8 + 1), Ok(*range));
        }
        assert_eq!(OutputRange::try_from(0), Err(InvalidArgument::Range(0)));
        assert_eq!(OutputRange::try_from(7), Err(InvalidArgument::Range(7)));
    }

    #[test]
    fn number_to_channel_conversion() {
        assert_eq!(Channel::try_from(1), Ok(Channel::A));
        assert_eq!(Channel::try_from(4), Ok(Channel::D));
        assert_eq!(Channel::try_from(5), Ok(Channel::All));
        assert_eq!(Channel::try_from(0), Err(InvalidArgument::Channel(0)));
        assert_eq!(Channel::try_from(6), Err(InvalidArgument::Channel(6)));
    }

    #[test]
    fn boundary_codes() {
        assert_eq!(OutputRange::Unipolar5V.code(0.0), 0x0000);
        assert_eq!(OutputRange::Unipolar5V.code(4.999_923_706_054_688), 0xFFFF);
        assert_eq!(OutputRange::Unipolar10V.code(9.999_847_412_109_375), 0xFFFF);
        assert_eq!(OutputRange::Bipolar5V.code(4.999_847_412_109_375), 0x7FFF);
        assert_eq!(OutputRange::Bipolar5V.code(-4.999_847_412_109_375), 0x8001);
        assert_eq!(OutputRange::Bipolar10V.code(9.999_694_824_218_75), 0x7FFF);
        assert_eq!(OutputRange::Bipolar10V.code(-9.999_694_824_218_75), 0x8001);
        // f32 rounding keeps the ±10.8V bounds one code short of full scale
        assert_eq!(OutputRange::Bipolar10_8V.code(10.799_670_410_156_25), 0x7FFE);
        assert_eq!(OutputRange::Bipolar10_8V.code(-10.799_670_410_156_25), 0x8002);
        assert_eq!(OutputRange::Bipolar10_8V.code(10.8), 0x7FFE);
    }

    #[test]
    fn out_of_range_voltages_saturate() {
        for range in RANGES {
            let (min, max) = range.bounds();
            assert_eq!(range.code(100.0), range.code(max));
            assert_eq!(range.code(-100.0), range.code(min));
            assert_eq!(range.code(f32::INFINITY), range.code(max));
        }
        assert_eq!(
            OutputRange::Unipolar5V.code(100.0),
            OutputRange::Unipolar5V.code(4.999_923_706_054_688)
        );
    }

    #[test]
    fn codes_are_monotonic() {
        for range in RANGES {
            let (min, max) = range.bounds();
            let mut last: Option<i32> = None;
            for step in 0..=200 {
                let voltage = min + (max - min) * step as f32 / 200.0;
                let code = range.code(voltage);
                // compare as signed for bipolar ranges
                let value = if range.is_bipolar() {
                    code as i16 as i32
                } else {
                    code as i32
                };
                if let Some(last) = last {
                    assert!(value >= last, "{range:?} at {voltage}V");
                }
                last = Some(value);
            }
        }
    }

    #[test]
    fn bipolar_words_are_offset_binary() {
        let range = OutputRange::Bipolar10V;
        let (min, max) = range.bounds();
        assert_eq!(CommandWord::voltage(Channel::A, range, min).payload(), 0x0001);
        assert_eq!(CommandWord::voltage(Channel::A, range, 0.0).payload(), 0x8000);
        assert_eq!(CommandWord::voltage(Channel::A, range, max).payload(), 0xFFFF);
        assert_eq!(CommandWord::voltage(Channel::A, range, 5.0).payload(), 0xC000);
        assert_eq!(CommandWord::voltage(Channel::A, range, -5.0).payload(), 0x4000);
    }

    #[test]
    fn unipolar_words_invert_bit_15_too() {
        let range = OutputRange::Unipolar5V;
        assert_eq!(CommandWord::voltage(Channel::A, range, 0.0).payload(), 0x8000);
        assert_eq!(CommandWord::voltage(Channel::A, range, 2.5).payload(), 0x0000);
        assert_eq!(CommandWord::voltage(Channel::A, range, 5.0).payload(), 0x7FFF);
    }

    #[test]
    fn unipolar_10_8v_uses_10v_ceiling() {
        let range = OutputRange::Unipolar10_8V;
        assert_eq!(range.code(10.8), range.code(9.999_847_412_109_375));
        assert_eq!(range.code(10.8), 0xED08);
    }

    #[test]
    fn channel_only_changes_address_field() {
        let range = OutputRange::Bipolar5V;
        let a = CommandWord::voltage(Channel::A, range, 1.25);
        let b = CommandWord::voltage(Channel::B, range, 1.25);
        assert_eq!(a.address(), 0x00_0000);
        assert_eq!(b.address(), 0x01_0000);
        assert_eq!(a.payload(), b.payload());
        assert_eq!(CommandWord::voltage(Channel::C, range, 1.25).address(), 0x02_0000);
        assert_eq!(CommandWord::voltage(Channel::D, range, 1.25).address(), 0x03_0000);
        assert_eq!(CommandWord::voltage(Channel::All, range, 1.25).address(), 0x04_0000);
    }

    #[test]
    fn encoding_is_deterministic() {
        for range in RANGES {
            let first = CommandWord::voltage(Channel::B, range, 3.3);
            for _ in 0..10 {
                assert_eq!(CommandWord::voltage(Channel::B, range, 3.3), first);
            }
        }
    }

    #[test]
    fn fixed_command_words() {
        assert_eq!(u32::from(CommandWord::control(CommandWord::STARTUP_CONTROL)), 0x19_000E);
        assert_eq!(u32::from(CommandWord::clear()), 0x1C_0000);
        assert_eq!(u32::from(CommandWord::load()), 0x1D_0000);
        assert_eq!(
            u32::from(CommandWord::range_select(Channel::A, OutputRange::Bipolar10V)),
            0x08_0004
        );
        assert_eq!(
            u32::from(CommandWord::range_select(Channel::D, OutputRange::Unipolar5V)),
            0x0B_0000
        );
        assert_eq!(
            u32::from(CommandWord::range_select(Channel::C, OutputRange::Bipolar10_8V)),
            0x0A_0005
        );
    }

    #[test]
    fn power_up_masks() {
        assert_eq!(u32::from(CommandWord::power_up(1)), 0x10_0001);
        assert_eq!(u32::from(CommandWord::power_up(2)), 0x10_0003);
        assert_eq!(u32::from(CommandWord::power_up(3)), 0x10_0007);
        assert_eq!(u32::from(CommandWord::power_up(4)), 0x10_000F);
    }

    #[test]
    fn bytes_are_msb_first() {
        let word = CommandWord::voltage(Channel::All, OutputRange::Bipolar10V, 0.0);
        assert_eq!(u32::from(word), 0x04_8000);
        assert_eq!(word.to_bytes(), [0x04, 0x80, 0x00]);
    }
}
