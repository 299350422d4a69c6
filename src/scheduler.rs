//! Decides, once per tick, which segments must switch animation.
//!
//! Each segment is either idle or running the animation registered for the mode it last
//! applied. When the current mode differs from that and the segment has an animation for the
//! new mode, the old task is cancelled and the new one launched, in that order. Segments with no
//! animation for the new mode keep whatever they were running.

use crate::{Error, MAX_SEGMENTS, Result, animations::Animation, segments::SegmentMap};
use heapless::Vec;

/// Identifies one launched animation task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskHandle {
    pub segment: usize,
    pub generation: u32,
}

/// Scheduler state of one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerEntry {
    /// Nothing launched yet
    Idle,
    /// `task` was launched for `mode`. The task may since have finished on its own
    Running { mode: char, task: TaskHandle },
}

/// Starts and stops animation tasks on behalf of the scheduler
pub trait Launcher {
    /// Stop `task` at its next suspension point. Cancelling a task that already finished must do
    /// nothing
    fn cancel(&mut self, task: TaskHandle);

    /// Start `animation` as `task` on segment `task.segment`
    fn launch(&mut self, task: TaskHandle, animation: Animation);
}

pub struct Scheduler {
    entries: Vec<SchedulerEntry, MAX_SEGMENTS>,
    next_generation: u32,
}

impl Scheduler {
    /// A scheduler with every segment of `segments` idle
    pub fn new(segments: &SegmentMap) -> Result<Self> {
        let mut entries = Vec::new();
        entries
            .resize(segments.len(), SchedulerEntry::Idle)
            .map_err(|_| Error::TooManySegments {
                count: segments.len(),
            })?;
        Ok(Self {
            entries,
            next_generation: 0,
        })
    }

    pub fn entry(&self, segment: usize) -> Option<SchedulerEntry> {
        self.entries.get(segment).copied()
    }

    pub fn entries(&self) -> &[SchedulerEntry] {
        &self.entries
    }

    /// Bring every segment in line with `mode`. Returns how many tasks were replaced.
    ///
    /// Running this again without a change of mode does nothing.
    pub fn evaluate(
        &mut self,
        mode: char,
        segments: &SegmentMap,
        launcher: &mut impl Launcher,
    ) -> usize {
        let mut replaced = 0;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            let previous = match *entry {
                SchedulerEntry::Running { mode: applied, .. } if applied == mode => continue,
                SchedulerEntry::Running { task, .. } => Some(task),
                SchedulerEntry::Idle => None,
            };
            let Some(spec) = segments.animation_for(index, mode) else {
                continue;
            };
            let Ok(segment) = segments.segment(index) else {
                continue;
            };

            if let Some(task) = previous {
                launcher.cancel(task);
            }
            let task = TaskHandle {
                segment: index,
                generation: self.next_generation,
            };
            self.next_generation = self.next_generation.wrapping_add(1);
            launcher.launch(task, spec.build(segment.len));
            debug!(
                "SCHEDULER: segment {} now runs mode '{}' as task {}",
                index, mode, task.generation
            );
            *entry = SchedulerEntry::Running { mode, task };
            replaced += 1;
        }
        replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AnimationSpec, ChainConfig, Config, SegmentConfig, animations::ChaseProfile,
    };
    use embassy_time::Duration;
    use smart_leds::RGB8;

    #[derive(Debug, PartialEq)]
    enum Call {
        Cancel(TaskHandle),
        Launch(TaskHandle),
    }

    #[derive(Default)]
    struct Recorder(std::vec::Vec<Call>);

    impl Launcher for Recorder {
        fn cancel(&mut self, task: TaskHandle) {
            self.0.push(Call::Cancel(task));
        }

        fn launch(&mut self, task: TaskHandle, _animation: Animation) {
            self.0.push(Call::Launch(task));
        }
    }

    const GREEN: AnimationSpec = AnimationSpec::Static {
        colour: RGB8::new(0, 255, 0),
        hold: Duration::from_millis(0),
        kill_after: false,
        kill_mode: ' ',
    };
    const CHASE: AnimationSpec = AnimationSpec::Chase {
        base: RGB8::new(0, 0, 200),
        chase: RGB8::new(200, 0, 200),
        steps: 10,
        step_delay: Duration::from_millis(10),
        width: 20,
        speed: 50.0,
        profile: ChaseProfile::Triangular,
    };

    static BOTH: [(char, AnimationSpec); 2] = [('D', CHASE), ('G', GREEN)];
    static CHASE_ONLY: [(char, AnimationSpec); 1] = [('D', CHASE)];
    static SEGMENTS: [SegmentConfig; 2] = [
        SegmentConfig {
            len: 6,
            modes: &BOTH,
        },
        SegmentConfig {
            len: 4,
            modes: &CHASE_ONLY,
        },
    ];
    static CHAINS: [ChainConfig; 1] = [ChainConfig {
        segments: &SEGMENTS,
    }];

    fn map() -> SegmentMap {
        SegmentMap::configure(&Config {
            chains: &CHAINS,
            initial_mode: 'D',
        })
        .unwrap()
    }

    #[test]
    fn first_evaluation_launches_without_cancelling() {
        let map = map();
        let mut scheduler = Scheduler::new(&map).unwrap();
        let mut recorder = Recorder::default();

        assert_eq!(scheduler.evaluate('D', &map, &mut recorder), 2);
        assert_eq!(
            recorder.0,
            [
                Call::Launch(TaskHandle {
                    segment: 0,
                    generation: 0
                }),
                Call::Launch(TaskHandle {
                    segment: 1,
                    generation: 1
                }),
            ]
        );
    }

    #[test]
    fn evaluation_is_idempotent() {
        let map = map();
        let mut scheduler = Scheduler::new(&map).unwrap();
        let mut recorder = Recorder::default();

        scheduler.evaluate('D', &map, &mut recorder);
        let before = scheduler.entries().to_vec();
        recorder.0.clear();

        assert_eq!(scheduler.evaluate('D', &map, &mut recorder), 0);
        assert!(recorder.0.is_empty());
        assert_eq!(scheduler.entries(), before.as_slice());
    }

    #[test]
    fn mode_change_cancels_then_launches_once() {
        let map = map();
        let mut scheduler = Scheduler::new(&map).unwrap();
        let mut recorder = Recorder::default();
        scheduler.evaluate('D', &map, &mut recorder);
        recorder.0.clear();

        assert_eq!(scheduler.evaluate('G', &map, &mut recorder), 1);
        let old = TaskHandle {
            segment: 0,
            generation: 0,
        };
        let new = TaskHandle {
            segment: 0,
            generation: 2,
        };
        assert_eq!(recorder.0, [Call::Cancel(old), Call::Launch(new)]);
        assert_eq!(
            scheduler.entry(0),
            Some(SchedulerEntry::Running {
                mode: 'G',
                task: new
            })
        );
    }

    #[test]
    fn segments_without_the_mode_keep_running() {
        let map = map();
        let mut scheduler = Scheduler::new(&map).unwrap();
        let mut recorder = Recorder::default();
        scheduler.evaluate('D', &map, &mut recorder);
        scheduler.evaluate('G', &map, &mut recorder);
        recorder.0.clear();

        // Segment 1 has nothing for 'G' and still holds its 'D' task
        assert_eq!(
            scheduler.entry(1),
            Some(SchedulerEntry::Running {
                mode: 'D',
                task: TaskHandle {
                    segment: 1,
                    generation: 1
                }
            })
        );
        // Unknown modes touch nothing at all
        assert_eq!(scheduler.evaluate('Z', &map, &mut recorder), 0);
        assert!(recorder.0.is_empty());

        // Back to 'D': segment 0 switches back, segment 1 was never off 'D'
        assert_eq!(scheduler.evaluate('D', &map, &mut recorder), 1);
    }

    #[test]
    fn idle_segments_stay_idle_for_unregistered_modes() {
        let map = map();
        let mut scheduler = Scheduler::new(&map).unwrap();
        let mut recorder = Recorder::default();
        assert_eq!(scheduler.evaluate('G', &map, &mut recorder), 1);
        assert_eq!(scheduler.entry(1), Some(SchedulerEntry::Idle));
    }

    #[test]
    fn every_segment_starts_idle() {
        let map = map();
        let scheduler = Scheduler::new(&map).unwrap();
        assert_eq!(scheduler.entries().len(), map.len());
        assert!(scheduler.entries().iter().all(|e| *e == SchedulerEntry::Idle));
    }
}
