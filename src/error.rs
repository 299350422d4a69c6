use derive_more::{Display, Error};

/// Crate-wide result type
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Everything that can go wrong while configuring or driving the chains.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// More chains configured than there are chain slots
    #[display("{count} chains configured, more than this build supports")]
    TooManyChains { count: usize },
    /// More segments configured than there are runner slots
    #[display("{count} segments configured, more than this build supports")]
    TooManySegments { count: usize },
    /// The segments of a chain add up to more pixels than a chain buffer holds
    #[display("chain {chain} needs {pixels} pixels, more than a chain buffer holds")]
    ChainTooLong { chain: usize, pixels: usize },
    /// One writer is needed for every configured chain
    #[display("{writers} chain writers supplied for {chains} chains")]
    WriterCountMismatch { chains: usize, writers: usize },
    /// A fade was configured without any colours
    #[display("segment {segment} mode '{mode}' has an empty palette")]
    EmptyPalette { segment: usize, mode: char },
    /// Interpolation needs at least one step
    #[display("segment {segment} mode '{mode}' has zero steps")]
    ZeroSteps { segment: usize, mode: char },
    /// The chase gradient would not fit its precomputed table
    #[display("segment {segment} mode '{mode}' asks for {steps} chase steps")]
    TooManyChaseSteps { segment: usize, mode: char, steps: u16 },
    /// A segment index outside the segment map
    #[display("no segment {segment}")]
    UnknownSegment { segment: usize },
    /// Pushing a buffer to the hardware failed
    #[display("writing chain {chain} failed")]
    ChainWrite { chain: usize },
    /// The reset button could not be read
    #[display("reading the reset button failed")]
    Button,
}
