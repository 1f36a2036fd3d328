/// Driver Result type.
pub type Result<T, S, P> = core::result::Result<T, Error<S, P>>;

/// Driver errors.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error<S, P> {
    /// SPI bus error.
    Spi(S),
    /// SYNC, CLR or LDAC pin error.
    Pin(P),
    /// A selector or chain parameter is out of range
    InvalidArgument(InvalidArgument),
}

/// Arguments rejected before anything is sent to the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum InvalidArgument {
    /// Channel count must be 1 to 4
    ChannelCount(u8),
    /// A chain holds at least one device
    ChainLength,
    /// Output range selector must be 1 to 6
    Range(u8),
    /// Channel number must be 1 to 5
    Channel(u8),
}

impl<S, P> From<InvalidArgument> for Error<S, P> {
    fn from(value: InvalidArgument) -> Self {
        Self::InvalidArgument(value)
    }
}

#[cfg(feature = "core-error")]
impl<S: core::fmt::Debug, P: core::fmt::Debug> core::error::Error for Error<S, P> {}

#[cfg(feature = "core-error")]
impl<S: core::fmt::Debug, P: core::fmt::Debug> core::fmt::Display for Error<S, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(feature = "core-error")]
impl core::error::Error for InvalidArgument {}

#[cfg(feature = "core-error")]
impl core::fmt::Display for InvalidArgument {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}
