//! Uniform cumulative frame reconstruction
//!
//! The deletion log is sparse: events only exist on the ticks where a scan
//! found something. Animation needs one frame per sample period, each
//! holding every position seen so far. The staged functions below
//! (`group_by_tick`, `accumulate`, `SeriesReconstructor::fill_uniform`)
//! spell the steps out; `SeriesReconstructor::reconstruct` fuses them into
//! one pass over a shared append-only buffer.

use std::collections::HashSet;

use glam::DVec2;

use crate::sim::{DeletionEvent, EventLog, ParticleId, SimParams};

/// Events that share one tick, in detection order
#[derive(Debug, Clone, PartialEq)]
pub struct TickGroup {
    pub tick: u64,
    pub events: Vec<DeletionEvent>,
}

/// A cumulative frame with owned positions
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub tick: u64,
    pub positions: Vec<DVec2>,
}

/// Identity used to deduplicate accumulated positions.
///
/// Events carrying a particle id are unique per particle. Legacy events
/// without one fall back to exact equality of the planar coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DedupKey {
    Particle(ParticleId),
    Position(u64, u64),
}

impl DedupKey {
    fn of(event: &DeletionEvent) -> Self {
        match event.particle {
            Some(id) => DedupKey::Particle(id),
            // + 0.0 folds -0.0 into 0.0
            None => DedupKey::Position(
                (event.position.x + 0.0).to_bits(),
                (event.position.y + 0.0).to_bits(),
            ),
        }
    }
}

/// Running cumulative position set
#[derive(Debug, Default)]
struct Accumulator {
    positions: Vec<DVec2>,
    seen: HashSet<DedupKey>,
}

impl Accumulator {
    fn add(&mut self, event: &DeletionEvent) {
        if self.seen.insert(DedupKey::of(event)) {
            self.positions.push(event.planar());
        }
    }
}

/// Partition the log into groups keyed by tick, in first-occurrence order
pub fn group_by_tick(log: &EventLog) -> Vec<TickGroup> {
    let mut groups: Vec<TickGroup> = Vec::new();
    for event in log {
        match groups.last_mut() {
            Some(group) if group.tick == event.tick => group.events.push(*event),
            _ => groups.push(TickGroup {
                tick: event.tick,
                events: vec![*event],
            }),
        }
    }
    groups
}

/// One frame per group holding the union of that group with every earlier one
pub fn accumulate(groups: &[TickGroup]) -> Vec<Frame> {
    let mut acc = Accumulator::default();
    groups
        .iter()
        .map(|group| {
            group.events.iter().for_each(|e| acc.add(e));
            Frame {
                tick: group.tick,
                positions: acc.positions.clone(),
            }
        })
        .collect()
}

/// Builds uniformly spaced frame sequences for one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesReconstructor {
    sample_period: u64,
    final_tick: u64,
    placeholder: DVec2,
}

impl SeriesReconstructor {
    /// `params` must already be validated (positive sample period)
    pub fn new(params: &SimParams) -> Self {
        Self {
            sample_period: params.sample_period.max(1),
            final_tick: params.final_tick,
            placeholder: placeholder_for(params.x_min, params.x_max),
        }
    }

    /// Frames from tick 0 through the final tick inclusive
    pub fn frame_count(&self) -> usize {
        (self.final_tick / self.sample_period) as usize + 1
    }

    pub fn placeholder(&self) -> DVec2 {
        self.placeholder
    }

    /// Grid ticks paired with the latest recorded tick each one absorbs.
    /// The last frame absorbs everything up to the final tick, which need
    /// not sit on the grid.
    fn grid_ticks(&self) -> impl Iterator<Item = (u64, u64)> + use<> {
        let period = self.sample_period;
        let last = self.frame_count() as u64 - 1;
        let final_tick = self.final_tick;
        (0..=last).map(move |k| {
            let tick = k * period;
            (tick, if k == last { final_tick } else { tick })
        })
    }

    /// Resample recorded frames onto the uniform grid. A grid tick shows the
    /// latest recorded frame at or before it, or the placeholder if none.
    pub fn fill_uniform(&self, frames: &[Frame]) -> Vec<Frame> {
        let mut out = Vec::with_capacity(self.frame_count());
        let mut next = 0;
        let mut current: Option<&Frame> = None;
        for (tick, upto) in self.grid_ticks() {
            while next < frames.len() && frames[next].tick <= upto {
                current = Some(&frames[next]);
                next += 1;
            }
            let positions = match current {
                Some(frame) => frame.positions.clone(),
                None => vec![self.placeholder],
            };
            out.push(Frame { tick, positions });
        }
        out
    }

    /// Group, accumulate and fill in one linear pass
    pub fn reconstruct(&self, log: &EventLog) -> FrameSeries {
        let events = log.events();
        let mut acc = Accumulator::default();
        let mut marks = Vec::with_capacity(self.frame_count());
        let mut next = 0;

        for (tick, upto) in self.grid_ticks() {
            while next < events.len() && events[next].tick <= upto {
                acc.add(&events[next]);
                next += 1;
            }
            let len = (next > 0).then_some(acc.positions.len());
            marks.push(FrameMark { tick, len });
        }

        if next < events.len() {
            log::warn!(
                "{} events after final tick {} were not reconstructed",
                events.len() - next,
                self.final_tick
            );
        }
        log::info!(
            "Reconstructed {} frames from {} events ({} distinct positions)",
            marks.len(),
            events.len(),
            acc.positions.len()
        );

        FrameSeries {
            cumulative: acc.positions,
            marks,
            placeholder: self.placeholder,
        }
    }
}

/// A value strictly left of `[x_min, x_max]`
pub fn placeholder_for(x_min: f64, x_max: f64) -> DVec2 {
    DVec2::new(x_min - (x_max - x_min).abs() - x_min.abs(), 0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameMark {
    tick: u64,
    /// Prefix length of the cumulative buffer; `None` before the first event
    len: Option<usize>,
}

/// Dense frame sequence; every frame is a prefix of one cumulative buffer
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSeries {
    cumulative: Vec<DVec2>,
    marks: Vec<FrameMark>,
    placeholder: DVec2,
}

/// Borrowed view of one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRef<'a> {
    pub tick: u64,
    pub positions: &'a [DVec2],
    /// True while no particle has exited yet
    pub is_placeholder: bool,
}

impl FrameRef<'_> {
    pub fn xs(&self) -> impl Iterator<Item = f64> + '_ {
        self.positions.iter().map(|p| p.x)
    }
}

impl FrameSeries {
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<FrameRef<'_>> {
        let mark = self.marks.get(index)?;
        Some(match mark.len {
            Some(len) => FrameRef {
                tick: mark.tick,
                positions: &self.cumulative[..len],
                is_placeholder: false,
            },
            None => FrameRef {
                tick: mark.tick,
                positions: std::slice::from_ref(&self.placeholder),
                is_placeholder: true,
            },
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = FrameRef<'_>> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Every distinct position, in first-seen order
    pub fn cumulative(&self) -> &[DVec2] {
        &self.cumulative
    }

    /// Owned copy of every frame
    pub fn to_frames(&self) -> Vec<Frame> {
        self.iter()
            .map(|f| Frame {
                tick: f.tick,
                positions: f.positions.to_vec(),
            })
            .collect()
    }
}
