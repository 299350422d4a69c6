//! The static, load-time description of the installation: which chains exist, how each is cut
//! into segments, and which animation each segment runs for each mode character.

use crate::{
    Error, MAX_CHASE_STEPS, Result,
    animations::{
        Animation, ChaseAnimation, ChaseProfile, FadeCycleAnimation, StaticAnimation,
    },
};
use embassy_time::Duration;
use smart_leds::RGB8;

/// The whole installation
#[derive(Clone, Copy)]
pub struct Config {
    /// One entry per physical chain, in the same order as the chain writers
    pub chains: &'static [ChainConfig],
    /// The mode in force before any input arrives
    pub initial_mode: char,
}

/// One physical chain, cut into segments in declaration order
#[derive(Clone, Copy)]
pub struct ChainConfig {
    pub segments: &'static [SegmentConfig],
}

/// One segment and its mode registry
#[derive(Clone, Copy)]
pub struct SegmentConfig {
    /// Number of pixels, may be zero
    pub len: usize,
    /// Mode character to animation. Characters not listed leave the segment alone
    pub modes: &'static [(char, AnimationSpec)],
}

impl SegmentConfig {
    /// The animation registered for `mode`, if any
    pub fn animation_for(&self, mode: char) -> Option<&AnimationSpec> {
        self.modes
            .iter()
            .find(|(registered, _)| *registered == mode)
            .map(|(_, spec)| spec)
    }
}

/// Parameters of an animation, ready to be turned into a running [`Animation`] for a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationSpec {
    /// Paint `colour`, hold it for `hold`, then finish. With `kill_after`, finishing sets the
    /// global mode to `kill_mode` and re-evaluates the scheduler at once
    Static {
        colour: RGB8,
        hold: Duration,
        kill_after: bool,
        kill_mode: char,
    },
    /// Crossfade round `colours` forever
    FadeCycle {
        colours: &'static [RGB8],
        steps: u16,
        step_delay: Duration,
        cycle_delay: Duration,
    },
    /// Run a comet of `width` pixels round the segment forever
    Chase {
        base: RGB8,
        chase: RGB8,
        steps: u16,
        step_delay: Duration,
        width: u16,
        speed: f32,
        profile: ChaseProfile,
    },
}

impl AnimationSpec {
    /// Check the preconditions the animation relies on
    pub fn validate(&self, segment: usize, mode: char) -> Result<()> {
        match *self {
            AnimationSpec::Static { .. } => Ok(()),
            AnimationSpec::FadeCycle { colours, steps, .. } => {
                if colours.is_empty() {
                    Err(Error::EmptyPalette { segment, mode })
                } else if steps == 0 {
                    Err(Error::ZeroSteps { segment, mode })
                } else {
                    Ok(())
                }
            }
            AnimationSpec::Chase { steps, .. } => {
                if steps == 0 {
                    Err(Error::ZeroSteps { segment, mode })
                } else if steps > MAX_CHASE_STEPS {
                    Err(Error::TooManyChaseSteps {
                        segment,
                        mode,
                        steps,
                    })
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Create a fresh animation bound to a segment of `len` pixels
    pub fn build(&self, len: usize) -> Animation {
        match *self {
            AnimationSpec::Static {
                colour,
                hold,
                kill_after,
                kill_mode,
            } => Animation::Static(StaticAnimation::new(
                colour,
                hold,
                kill_after.then_some(kill_mode),
            )),
            AnimationSpec::FadeCycle {
                colours,
                steps,
                step_delay,
                cycle_delay,
            } => Animation::FadeCycle(FadeCycleAnimation::new(
                colours,
                steps,
                step_delay,
                cycle_delay,
            )),
            AnimationSpec::Chase {
                base,
                chase,
                steps,
                step_delay,
                width,
                speed,
                profile,
            } => Animation::Chase(ChaseAnimation::new(
                len, base, chase, steps, step_delay, width, speed, profile,
            )),
        }
    }
}
