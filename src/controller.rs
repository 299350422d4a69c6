//! Ties the segment map, chains, scheduler and per-segment runners together.
//!
//! The controller lives for the whole program. One runner per segment waits on that segment's
//! command signal and plays whatever animation the scheduler last launched there, and the tick
//! loop re-evaluates the scheduler against the current mode. Every fault, from a runner or
//! anywhere else, ends up in [`Controller::supervise`], which blacks out every chain before
//! handing control back.

use crate::{
    Config, CurrentMode, Error, MAX_CHAINS, MAX_SEGMENTS, Result, TICK_INTERVAL,
    animations::{Animation, Step},
    drivers::{Chain, ChainWriter},
    scheduler::{Launcher, Scheduler, SchedulerEntry, TaskHandle},
    segments::SegmentMap,
};
use core::{cell::RefCell, future::Future};
use embassy_futures::{
    select::{Either, select},
    yield_now,
};
use embassy_sync::{
    blocking_mutex::{Mutex as BlockingMutex, raw::CriticalSectionRawMutex},
    mutex::Mutex,
    signal::Signal,
};
use embassy_time::{Duration, Ticker, Timer};
use heapless::Vec;
use portable_atomic::{AtomicBool, Ordering};

/// What the scheduler asks a segment runner to do. Only the latest command is kept
pub enum SegmentCommand {
    Start(TaskHandle, Animation),
    Cancel(TaskHandle),
}

pub type CommandSignal = Signal<CriticalSectionRawMutex, SegmentCommand>;

/// Raised by the reset button; polled once per tick
pub type ResetSignal = Signal<CriticalSectionRawMutex, ()>;

/// Why the controller stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Shutdown {
    /// Someone asked for a restart
    Reset,
    /// Something failed and nothing can recover it
    Fault(Error),
}

/// Delivers scheduler decisions to the runners through their command signals
struct Commands<'a>(&'a [CommandSignal]);

impl Launcher for Commands<'_> {
    fn cancel(&mut self, task: TaskHandle) {
        if let Some(signal) = self.0.get(task.segment) {
            signal.signal(SegmentCommand::Cancel(task));
        }
    }

    fn launch(&mut self, task: TaskHandle, animation: Animation) {
        if let Some(signal) = self.0.get(task.segment) {
            signal.signal(SegmentCommand::Start(task, animation));
        }
    }
}

pub struct Controller<W> {
    map: SegmentMap,
    chains: Vec<Mutex<CriticalSectionRawMutex, Chain<W>>, MAX_CHAINS>,
    mode: CurrentMode,
    scheduler: BlockingMutex<CriticalSectionRawMutex, RefCell<Scheduler>>,
    commands: [CommandSignal; MAX_SEGMENTS],
    faults: Signal<CriticalSectionRawMutex, Error>,
    halted: AtomicBool,
}

impl<W: ChainWriter> Controller<W> {
    /// Lay out `config` and bind one writer to each of its chains, in order
    pub fn new(config: &Config, writers: impl IntoIterator<Item = W>) -> Result<Self> {
        let map = SegmentMap::configure(config)?;
        let chain_count = map.chain_lens().len();

        let mut writers = writers.into_iter();
        let mut chains = Vec::new();
        for (id, len) in map.chain_lens().iter().enumerate() {
            let writer = writers.next().ok_or(Error::WriterCountMismatch {
                chains: chain_count,
                writers: id,
            })?;
            chains
                .push(Mutex::new(Chain::new(id, *len, writer)))
                .map_err(|_| Error::TooManyChains { count: chain_count })?;
        }
        let extra = writers.count();
        if extra > 0 {
            return Err(Error::WriterCountMismatch {
                chains: chain_count,
                writers: chain_count + extra,
            });
        }

        let scheduler = Scheduler::new(&map)?;
        info!(
            "CONTROLLER: {} chains, {} segments, starting in mode '{}'",
            chain_count,
            map.len(),
            config.initial_mode
        );
        Ok(Self {
            map,
            chains,
            mode: CurrentMode::new(config.initial_mode),
            scheduler: BlockingMutex::new(RefCell::new(scheduler)),
            commands: [const { Signal::new() }; MAX_SEGMENTS],
            faults: Signal::new(),
            halted: AtomicBool::new(false),
        })
    }

    pub fn mode(&self) -> &CurrentMode {
        &self.mode
    }

    pub fn segments(&self) -> &SegmentMap {
        &self.map
    }

    pub fn chains(&self) -> &[Mutex<CriticalSectionRawMutex, Chain<W>>] {
        &self.chains
    }

    /// Scheduler state of `segment`
    pub fn entry(&self, segment: usize) -> Option<SchedulerEntry> {
        self.scheduler
            .lock(|scheduler| scheduler.borrow().entry(segment))
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Report an unrecoverable error to the supervisor
    pub fn fault(&self, error: Error) {
        error!("CONTROLLER: fault reported: {}", error);
        self.faults.signal(error);
    }

    /// One scheduler pass against the current mode. Returns how many tasks were replaced
    pub fn evaluate(&self) -> usize {
        if self.is_halted() {
            return 0;
        }
        let mode = self.mode.get();
        let replaced = self.scheduler.lock(|scheduler| {
            scheduler
                .borrow_mut()
                .evaluate(mode, &self.map, &mut Commands(&self.commands))
        });
        if replaced > 0 {
            info!(
                "SCHEDULER: mode '{}' replaced {} animations",
                mode, replaced
            );
        }
        replaced
    }

    /// Render one frame of `animation` into `segment` and flush its chain if anything was drawn.
    ///
    /// Pixel writes and the flush happen under the chain lock, so frames never tear. Returns
    /// `None` once the controller is halted, without touching the chain.
    pub async fn render(&self, segment: usize, animation: &mut Animation) -> Result<Option<Step>> {
        let placement = self.map.segment(segment)?;
        let chain = self
            .chains
            .get(placement.chain)
            .ok_or(Error::UnknownSegment { segment })?;
        let mut chain = chain.lock().await;
        if self.is_halted() {
            return Ok(None);
        }
        let step = animation.render(chain.segment_mut(placement.range()));
        if let Step::Show { .. } = step {
            chain.flush().await?;
        }
        Ok(Some(step))
    }

    /// Runner for one segment. Plays whatever the scheduler launches on it, forever
    pub async fn run_segment(&self, segment: usize) -> ! {
        let Some(commands) = self.commands.get(segment).filter(|_| segment < self.map.len())
        else {
            warn!("SEGMENT {}: not configured, runner parked", segment);
            park().await
        };

        let mut command = commands.wait().await;
        loop {
            command = match command {
                SegmentCommand::Cancel(task) => {
                    debug!("SEGMENT {}: task {} cancelled", segment, task.generation);
                    commands.wait().await
                }
                SegmentCommand::Start(task, animation) => {
                    debug!(
                        "SEGMENT {}: task {} starts {}",
                        segment, task.generation, animation
                    );
                    match self.play(task, animation, commands).await {
                        Ok(Some(next)) => next,
                        Ok(None) => commands.wait().await,
                        Err(error) => {
                            self.fault(error);
                            park().await
                        }
                    }
                }
            };
        }
    }

    /// Drive `animation` until it finishes, the controller halts, or a new command arrives while
    /// it sleeps. A new command is returned to the runner; the animation is dropped with it.
    /// A command that is already waiting wins over a hold that has run out
    async fn play(
        &self,
        task: TaskHandle,
        mut animation: Animation,
        commands: &CommandSignal,
    ) -> Result<Option<SegmentCommand>> {
        loop {
            let Some(step) = self.render(task.segment, &mut animation).await? else {
                return Ok(None);
            };
            match step {
                Step::Show { hold } => {
                    if let Either::First(command) = select(commands.wait(), sleep(hold)).await {
                        match command {
                            SegmentCommand::Cancel(stale) if stale != task => {
                                trace!(
                                    "SEGMENT {}: ignoring cancel of old task {}",
                                    task.segment, stale.generation
                                );
                            }
                            command => return Ok(Some(command)),
                        }
                    }
                }
                Step::Done { switch_to } => {
                    self.finished(task, switch_to);
                    return Ok(None);
                }
            }
        }
    }

    /// An animation ended on its own. If it asked for a mode switch, apply it and re-evaluate
    /// straight away instead of waiting for the next tick
    fn finished(&self, task: TaskHandle, switch_to: Option<char>) {
        debug!("SEGMENT {}: task {} finished", task.segment, task.generation);
        if let Some(mode) = switch_to {
            info!("SEGMENT {}: switching mode to '{}'", task.segment, mode);
            self.mode.set(mode);
            self.evaluate();
        }
    }

    /// Re-evaluate every tick until a reset is requested
    pub async fn tick_loop(&self, reset: &ResetSignal) -> Shutdown {
        let mut ticker = Ticker::every(TICK_INTERVAL);
        loop {
            if reset.signaled() {
                info!("CONTROLLER: reset requested");
                return Shutdown::Reset;
            }
            self.evaluate();
            ticker.next().await;
        }
    }

    /// Run `work` until it returns or a fault is reported, then black out every chain
    pub async fn supervise(&self, work: impl Future<Output = Shutdown>) -> Shutdown {
        let reason = match select(work, self.faults.wait()).await {
            Either::First(reason) => reason,
            Either::Second(error) => Shutdown::Fault(error),
        };
        if let Err(error) = self.shutdown().await {
            error!("CONTROLLER: blackout incomplete: {}", error);
        }
        reason
    }

    /// The tick loop, supervised
    pub async fn run(&self, reset: &ResetSignal) -> Shutdown {
        self.supervise(self.tick_loop(reset)).await
    }

    /// Stop every runner from drawing again, then black out and flush each chain once.
    /// A chain that fails to flush does not stop the others; the first failure is returned
    pub async fn shutdown(&self) -> Result<()> {
        self.halted.store(true, Ordering::Release);
        let mut first_error = None;
        for chain in &self.chains {
            let mut chain = chain.lock().await;
            if let Err(error) = chain.blackout().await {
                error!("CONTROLLER: chain {} blackout failed: {}", chain.id(), error);
                first_error.get_or_insert(error);
            }
        }
        info!("CONTROLLER: all chains blacked out");
        first_error.map_or(Ok(()), Err)
    }
}

/// Sleep for `hold`. A zero hold still yields so the other tasks get to run
async fn sleep(hold: Duration) {
    if hold.as_ticks() == 0 {
        yield_now().await;
    } else {
        Timer::after(hold).await;
    }
}

async fn park() -> ! {
    loop {
        core::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnimationSpec, BLACK, ChainConfig, SegmentConfig, animations::ChaseProfile};
    use embassy_futures::block_on;
    use smart_leds::RGB8;

    /// Records every frame it is asked to write
    #[derive(Default)]
    struct Recorder {
        frames: std::vec::Vec<std::vec::Vec<RGB8>>,
        broken: bool,
    }

    impl ChainWriter for Recorder {
        async fn write(&mut self, pixels: &[RGB8]) -> Result<()> {
            if self.broken {
                return Err(Error::ChainWrite { chain: 0 });
            }
            self.frames.push(pixels.to_vec());
            Ok(())
        }
    }

    const WHITE: RGB8 = RGB8::new(255, 255, 255);
    const GREEN: RGB8 = RGB8::new(0, 255, 0);

    static PALETTE: [RGB8; 2] = [RGB8::new(200, 0, 0), RGB8::new(0, 0, 200)];

    static MODES: [(char, AnimationSpec); 4] = [
        (
            'D',
            AnimationSpec::Chase {
                base: RGB8::new(0, 0, 200),
                chase: RGB8::new(200, 0, 200),
                steps: 10,
                step_delay: Duration::from_ticks(0),
                width: 2,
                speed: 1.0,
                profile: ChaseProfile::Sinusoidal,
            },
        ),
        (
            'E',
            AnimationSpec::FadeCycle {
                colours: &PALETTE,
                steps: 4,
                step_delay: Duration::from_ticks(0),
                cycle_delay: Duration::from_ticks(0),
            },
        ),
        (
            'F',
            AnimationSpec::Static {
                colour: WHITE,
                hold: Duration::from_ticks(0),
                kill_after: true,
                kill_mode: 'G',
            },
        ),
        (
            'G',
            AnimationSpec::Static {
                colour: GREEN,
                hold: Duration::from_ticks(0),
                kill_after: false,
                kill_mode: 'G',
            },
        ),
    ];

    static SEGMENTS: [SegmentConfig; 1] = [SegmentConfig {
        len: 3,
        modes: &MODES,
    }];

    static ONE_CHAIN: [ChainConfig; 1] = [ChainConfig {
        segments: &SEGMENTS,
    }];

    static TWO_CHAINS: [ChainConfig; 2] = [
        ChainConfig {
            segments: &SEGMENTS,
        },
        ChainConfig {
            segments: &SEGMENTS,
        },
    ];

    fn controller(chains: &'static [ChainConfig], initial_mode: char) -> Controller<Recorder> {
        let config = Config {
            chains,
            initial_mode,
        };
        let writers = (0..chains.len()).map(|_| Recorder::default());
        Controller::new(&config, writers).unwrap()
    }

    fn frames(controller: &Controller<Recorder>, chain: usize) -> std::vec::Vec<std::vec::Vec<RGB8>> {
        controller.chains()[chain]
            .try_lock()
            .map(|chain| chain.writer().frames.clone())
            .unwrap_or_default()
    }

    fn running_mode(controller: &Controller<Recorder>, segment: usize) -> Option<char> {
        match controller.entry(segment)? {
            SchedulerEntry::Running { mode, .. } => Some(mode),
            SchedulerEntry::Idle => None,
        }
    }

    #[test]
    fn writer_count_must_match_chains() {
        let config = Config {
            chains: &TWO_CHAINS,
            initial_mode: 'G',
        };
        let err = Controller::new(&config, [Recorder::default()]).err();
        assert_eq!(
            err,
            Some(Error::WriterCountMismatch {
                chains: 2,
                writers: 1
            })
        );

        let writers = (0..3).map(|_| Recorder::default());
        let err = Controller::new(&config, writers).err();
        assert_eq!(
            err,
            Some(Error::WriterCountMismatch {
                chains: 2,
                writers: 3
            })
        );
    }

    #[test]
    fn evaluate_is_idempotent() {
        let controller = controller(&TWO_CHAINS, 'E');
        assert_eq!(controller.evaluate(), 2);
        let before = [controller.entry(0), controller.entry(1)];
        assert_eq!(controller.evaluate(), 0);
        assert_eq!([controller.entry(0), controller.entry(1)], before);
    }

    #[test]
    fn kill_switches_mode_without_waiting_for_a_tick() {
        let controller = controller(&ONE_CHAIN, 'F');
        assert_eq!(controller.evaluate(), 1);

        block_on(select(controller.run_segment(0), async {
            while running_mode(&controller, 0) != Some('G') || frames(&controller, 0).len() < 2 {
                yield_now().await;
            }
        }));

        assert_eq!(controller.mode().get(), 'G');
        assert_eq!(frames(&controller, 0), [[WHITE; 3], [GREEN; 3]]);
    }

    #[test]
    fn mode_change_stops_the_old_animation_before_the_new_one_draws() {
        let controller = controller(&ONE_CHAIN, 'D');
        controller.evaluate();

        block_on(select(controller.run_segment(0), async {
            while frames(&controller, 0).is_empty() {
                yield_now().await;
            }
            controller.mode().set('G');
            assert_eq!(controller.evaluate(), 1);
            while frames(&controller, 0).last() != Some(&std::vec![GREEN; 3]) {
                yield_now().await;
            }
        }));

        let frames = frames(&controller, 0);
        assert_eq!(frames.len(), 2);
        assert_ne!(frames[0], [GREEN; 3]);
        assert_eq!(running_mode(&controller, 0), Some('G'));
    }

    #[test]
    fn render_draws_only_its_own_segment() {
        let controller = controller(&TWO_CHAINS, 'G');
        let mut animation = MODES[3].1.build(3);
        let step = block_on(controller.render(1, &mut animation)).unwrap();

        assert!(matches!(step, Some(Step::Show { .. })));
        assert!(frames(&controller, 0).is_empty());
        assert_eq!(frames(&controller, 1), [[GREEN; 3]]);
        assert_eq!(
            block_on(controller.render(5, &mut animation)),
            Err(Error::UnknownSegment { segment: 5 })
        );
    }

    #[test]
    fn fault_blacks_out_every_chain_once() {
        let controller = controller(&TWO_CHAINS, 'E');
        controller.evaluate();

        let reason = block_on(select(
            controller.run_segment(0),
            controller.supervise(async {
                while frames(&controller, 0).len() < 3 {
                    yield_now().await;
                }
                controller.fault(Error::ChainWrite { chain: 1 });
                core::future::pending().await
            }),
        ));

        assert!(matches!(
            reason,
            Either::Second(Shutdown::Fault(Error::ChainWrite { chain: 1 }))
        ));
        assert!(controller.is_halted());
        for chain in 0..2 {
            let frames = frames(&controller, chain);
            let blackouts = frames.iter().filter(|f| **f == [BLACK; 3]).count();
            assert_eq!(blackouts, 1);
            assert_eq!(frames.last(), Some(&std::vec![BLACK; 3]));
        }
    }

    #[test]
    fn reset_request_blacks_out_every_chain_once() {
        let controller = controller(&TWO_CHAINS, 'G');
        let reset = ResetSignal::new();
        reset.signal(());

        assert_eq!(block_on(controller.run(&reset)), Shutdown::Reset);
        assert!(controller.is_halted());
        for chain in 0..2 {
            assert_eq!(frames(&controller, chain), [[BLACK; 3]]);
        }
    }

    #[test]
    fn halted_controller_draws_nothing() {
        let controller = controller(&ONE_CHAIN, 'G');
        block_on(controller.shutdown()).unwrap();
        assert_eq!(controller.evaluate(), 0);

        let mut animation = MODES[3].1.build(3);
        assert_eq!(block_on(controller.render(0, &mut animation)), Ok(None));
        assert_eq!(frames(&controller, 0), [[BLACK; 3]]);
    }

    #[test]
    fn blackout_carries_on_past_a_broken_chain() {
        let config = Config {
            chains: &TWO_CHAINS,
            initial_mode: 'G',
        };
        let writers = [
            Recorder {
                broken: true,
                ..Default::default()
            },
            Recorder::default(),
        ];
        let controller = Controller::new(&config, writers).unwrap();

        assert_eq!(
            block_on(controller.shutdown()),
            Err(Error::ChainWrite { chain: 0 })
        );
        assert_eq!(frames(&controller, 1), [[BLACK; 3]]);
    }
}
