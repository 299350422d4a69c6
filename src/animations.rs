//! Animations module provides the patterns a segment can run.
//!
//! Every animation is a small state machine. The segment runner asks it to render the next frame
//! into the segment's slice of the chain buffer and gets back a [`Step`] telling it how long to
//! hold that frame, or that the animation has finished:
//! - Static animations paint one colour, hold it, and optionally switch the global mode
//! - Fade cycles crossfade through a palette forever
//! - Chases run a bright comet around a dim background forever

use crate::{MAX_CHASE_STEPS, maths};
use embassy_time::Duration;
use heapless::Vec;
use smart_leds::RGB8;

/// Room for every intermediate colour of the longest chase gradient
const GRADIENT_LEN: usize = MAX_CHASE_STEPS as usize + 1;

/// What the runner should do after asking an animation for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A frame was rendered. Flush the chain and sleep for `hold` before the next frame
    Show { hold: Duration },
    /// Nothing was rendered and the animation is over. If `switch_to` is set, the global mode
    /// becomes that character and the scheduler re-evaluates straight away
    Done { switch_to: Option<char> },
}

/// Represents the different animations a segment can run
#[derive(Clone)]
pub enum Animation {
    /// One colour, held, then finished
    Static(StaticAnimation),
    /// Linear crossfade around a palette
    FadeCycle(FadeCycleAnimation),
    /// A comet chasing around the segment
    Chase(ChaseAnimation),
}

impl Animation {
    /// Render the next frame into `pixels`, which is exactly the segment's range of its chain
    pub fn render(&mut self, pixels: &mut [RGB8]) -> Step {
        match self {
            Animation::Static(s) => s.render(pixels),
            Animation::FadeCycle(s) => s.render(pixels),
            Animation::Chase(s) => s.render(pixels),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Animation {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Animation::Static(_) => defmt::write!(fmt, "Static"),
            Animation::FadeCycle(_) => defmt::write!(fmt, "FadeCycle"),
            Animation::Chase(_) => defmt::write!(fmt, "Chase"),
        }
    }
}

/// Linear interpolation between two colours at increment `step` of `steps`.
///
/// Each channel is `round((1 - step/steps) * c1 + (step/steps) * c2)`.
pub fn interpolate(c1: RGB8, c2: RGB8, step: u16, steps: u16) -> RGB8 {
    let t = if steps == 0 {
        0.0
    } else {
        step as f32 / steps as f32
    };
    let mix = |a: u8, b: u8| maths::round((1.0 - t) * a as f32 + t * b as f32) as u8;
    RGB8::new(mix(c1.r, c2.r), mix(c1.g, c2.g), mix(c1.b, c2.b))
}

/// Paints a single colour and holds it. With `kill` set, finishing switches the global mode
#[derive(Clone)]
pub struct StaticAnimation {
    colour: RGB8,
    hold: Duration,
    kill: Option<char>,
    shown: bool,
}

impl StaticAnimation {
    pub fn new(colour: RGB8, hold: Duration, kill: Option<char>) -> Self {
        Self {
            colour,
            hold,
            kill,
            shown: false,
        }
    }

    fn render(&mut self, pixels: &mut [RGB8]) -> Step {
        if self.shown {
            return Step::Done {
                switch_to: self.kill,
            };
        }
        self.shown = true;
        pixels.fill(self.colour);
        Step::Show { hold: self.hold }
    }
}

/// Crossfades through `colours`, `steps + 1` increments per pair, wrapping the last colour back
/// to the first. Sleeps an extra `cycle_delay` after every full trip round the palette.
#[derive(Clone)]
pub struct FadeCycleAnimation {
    colours: &'static [RGB8],
    steps: u16,
    step_delay: Duration,
    cycle_delay: Duration,
    pair: usize,
    increment: u16,
}

impl FadeCycleAnimation {
    pub fn new(
        colours: &'static [RGB8],
        steps: u16,
        step_delay: Duration,
        cycle_delay: Duration,
    ) -> Self {
        Self {
            colours,
            steps: steps.max(1),
            step_delay,
            cycle_delay,
            pair: 0,
            increment: 0,
        }
    }

    /// The colour shown at the current position in the cycle
    pub fn current(&self) -> RGB8 {
        let Some(&from) = self.colours.get(self.pair) else {
            return crate::BLACK;
        };
        let to = self.colours[(self.pair + 1) % self.colours.len()];
        interpolate(from, to, self.increment, self.steps)
    }

    fn render(&mut self, pixels: &mut [RGB8]) -> Step {
        pixels.fill(self.current());

        let mut hold = self.step_delay;
        if self.increment < self.steps {
            self.increment += 1;
        } else {
            self.increment = 0;
            self.pair += 1;
            if self.pair >= self.colours.len() {
                self.pair = 0;
                hold += self.cycle_delay;
            }
        }
        Step::Show { hold }
    }
}

/// How a chase maps a pixel's distance from the comet to a gradient index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChaseProfile {
    /// Linear falloff over `width` pixels. The comet moves `1/steps` of a pixel per frame and the
    /// frame delay is divided by `steps * speed`
    Triangular,
    /// `steps / (|sin(speed * d/width)| + 1)`. The comet moves a whole pixel per frame at the
    /// configured frame delay
    Sinusoidal,
}

/// Distance between `position` and `led` on a segment whose ends join up
pub fn circular_distance(position: f32, led: usize, len: usize) -> f32 {
    let direct = maths::abs(position - led as f32);
    direct.min(len as f32 - direct)
}

/// Gradient index for the triangular profile. Index 0 is the base colour
pub fn triangular_index(distance: f32, width: u16, steps: u16) -> usize {
    if distance == 0.0 || width == 0 {
        return 0;
    }
    let steps_f = steps as f32;
    let ratio = (width as f32 / distance).max(1.0);
    maths::round_index(steps_f - steps_f / ratio, steps as usize)
}

/// Gradient index for the sinusoidal profile
pub fn sinusoidal_index(distance: f32, len: usize, width: u16, speed: f32, steps: u16) -> usize {
    if width == 0 {
        return 0;
    }
    let width = width as f32;
    let nearest = (distance / width).min((len as f32 - distance) / width);
    let scale = maths::abs(maths::sin(speed * nearest)) + 1.0;
    maths::round_index(steps as f32 / scale, steps as usize)
}

/// A comet of `width` pixels fading from `chase` into `base`, moving round the segment forever
#[derive(Clone)]
pub struct ChaseAnimation {
    gradient: Vec<RGB8, GRADIENT_LEN>,
    steps: u16,
    step_delay: Duration,
    width: u16,
    speed: f32,
    profile: ChaseProfile,
    len: usize,
    /// Position in sub-pixel increments; the only state carried between frames
    tick: u32,
}

impl ChaseAnimation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        len: usize,
        base: RGB8,
        chase: RGB8,
        steps: u16,
        step_delay: Duration,
        width: u16,
        speed: f32,
        profile: ChaseProfile,
    ) -> Self {
        let steps = steps.clamp(1, MAX_CHASE_STEPS);
        let gradient = (0..=steps)
            .map(|step| interpolate(base, chase, step, steps))
            .collect();
        Self {
            gradient,
            steps,
            step_delay,
            width,
            speed,
            profile,
            len,
            tick: 0,
        }
    }

    fn ticks_per_pixel(&self) -> u32 {
        match self.profile {
            ChaseProfile::Triangular => self.steps as u32,
            ChaseProfile::Sinusoidal => 1,
        }
    }

    /// Comet position in pixels, always in `[0, len)`
    pub fn position(&self) -> f32 {
        self.tick as f32 / self.ticks_per_pixel() as f32
    }

    /// Colour of `led` with the comet at `position`
    pub fn colour_at(&self, position: f32, led: usize) -> RGB8 {
        let distance = circular_distance(position, led, self.len);
        let index = match self.profile {
            ChaseProfile::Triangular => triangular_index(distance, self.width, self.steps),
            ChaseProfile::Sinusoidal => {
                sinusoidal_index(distance, self.len, self.width, self.speed, self.steps)
            }
        };
        self.gradient.get(index).copied().unwrap_or(crate::BLACK)
    }

    fn frame_delay(&self) -> Duration {
        match self.profile {
            ChaseProfile::Triangular => {
                let divisor = self.steps as f32 * self.speed;
                if divisor <= 0.0 {
                    return self.step_delay;
                }
                let micros = self.step_delay.as_micros() as f32 / divisor;
                Duration::from_micros(micros as u64)
            }
            ChaseProfile::Sinusoidal => self.step_delay,
        }
    }

    fn render(&mut self, pixels: &mut [RGB8]) -> Step {
        let position = self.position();
        for (led, pixel) in pixels.iter_mut().enumerate() {
            *pixel = self.colour_at(position, led);
        }

        let wrap = self.len as u32 * self.ticks_per_pixel();
        self.tick += 1;
        if self.tick >= wrap {
            self.tick = 0;
        }
        Step::Show {
            hold: self.frame_delay(),
        }
    }
}
