//! The coalescent-with-recombination event loop.
//!
//! [`Simulator`] owns every live data structure (segment arena, population
//! index, Fenwick tree, node-mapping coverage) for one run and drives the
//! discrete-event loop described in `SPEC_FULL.md` §4.4: draw a coalescence
//! and a recombination waiting time under the active demographic model,
//! dispatch whichever fires first, repeat until a single ancestor remains.

use std::time::Instant;

use crate::error::{Result, SimError};
use crate::fenwick::Fenwick;
use crate::newtypes::{Locus, NodeId, Time};
use crate::node_mapping::AncestralCoverage;
use crate::pool::Handle;
use crate::popmodel::{self, NextEvent, PopulationModel};
use crate::population::Population;
use crate::record::CoalescenceRecord;
use crate::rng::RandomSource;
use crate::segment::{Segment, SegmentArena, SplitOutcome};

/// Parameters fixing one simulation run.
#[derive(Debug, Clone)]
pub struct SimParams {
    pub sample_size: u32,
    pub num_loci: u32,
    pub recombination_rate: f64,
    pub population_models: Vec<PopulationModel>,
    pub max_memory: usize,
    pub segment_block_size: usize,
    pub population_block_size: usize,
}

impl SimParams {
    fn validate(&self) -> Result<()> {
        if self.sample_size < 2 {
            return Err(SimError::BadParameter(format!(
                "sample_size must be >= 2, got {}",
                self.sample_size
            )));
        }
        if self.num_loci < 1 {
            return Err(SimError::BadParameter("num_loci must be >= 1".into()));
        }
        if self.recombination_rate < 0.0 {
            return Err(SimError::BadParameter("recombination_rate must be >= 0".into()));
        }
        popmodel::validate_models(&self.population_models)?;
        Ok(())
    }
}

/// An optional wall-clock deadline and event-count cap for [`Simulator::run`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLimits {
    pub deadline: Option<Instant>,
    pub max_events: Option<u64>,
}

/// Why [`Simulator::run`] returned before the simulation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    Deadline,
    StepCap,
}

/// The outcome of a (possibly resumed) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Complete,
    Paused(PauseReason),
}

pub struct Simulator<R> {
    n: u32,
    m: u32,
    rho: f64,
    models: Vec<PopulationModel>,
    segments: SegmentArena,
    population: Population,
    fenwick: Fenwick,
    coverage: AncestralCoverage,
    next_node: u32,
    t: f64,
    model_index: usize,
    records: Vec<CoalescenceRecord>,
    events: u64,
    rng: R,
}

impl<R: RandomSource> Simulator<R> {
    pub fn new(params: SimParams, rng: R) -> Result<Self> {
        params.validate()?;
        let n = params.sample_size;
        let m = params.num_loci;

        let mut segments = SegmentArena::new(params.segment_block_size, params.max_memory);
        let mut population = Population::new(params.population_block_size);
        let mut fenwick = Fenwick::new(m as usize);

        for i in 1..=n {
            let head = segments.alloc(Segment {
                left: Locus::new(1),
                right: Locus::new(m + 1),
                node: NodeId::from(i),
                next: None,
            })?;
            population.insert(1, head)?;
        }
        fenwick.set(1, n as i64 * (m as i64 - 1));

        log::info!(
            "simulator initialised: n={n} m={m} rho={} models={}",
            params.recombination_rate,
            params.population_models.len()
        );

        Ok(Self {
            n,
            m,
            rho: params.recombination_rate,
            models: params.population_models,
            segments,
            population,
            fenwick,
            coverage: AncestralCoverage::new(m as usize, n),
            next_node: n + 1,
            t: 0.0,
            model_index: 0,
            records: Vec::new(),
            events: 0,
            rng,
        })
    }

    pub fn num_events(&self) -> u64 {
        self.events
    }

    pub fn records(&self) -> &[CoalescenceRecord] {
        &self.records
    }

    /// Consume the simulator, returning `(n, m, records)` for handoff to a
    /// tree sequence.
    pub fn finish(self) -> (u32, u32, Vec<CoalescenceRecord>) {
        (self.n, self.m, self.records)
    }

    /// Run until every locus has coalesced, or `limits` cuts the run short.
    pub fn run(&mut self, limits: RunLimits) -> Result<RunStatus> {
        loop {
            if self.population.len() <= 1 {
                log::info!(
                    "simulation complete: events={} nodes={}",
                    self.events,
                    self.next_node - 1
                );
                return Ok(RunStatus::Complete);
            }
            if let Some(deadline) = limits.deadline {
                if Instant::now() >= deadline {
                    log::warn!("simulation paused: deadline reached after {} events", self.events);
                    return Ok(RunStatus::Paused(PauseReason::Deadline));
                }
            }
            if let Some(max_events) = limits.max_events {
                if self.events >= max_events {
                    log::warn!("simulation paused: step cap reached after {} events", self.events);
                    return Ok(RunStatus::Paused(PauseReason::StepCap));
                }
            }
            if let Err(e) = self.step() {
                log::error!("simulation aborted: {e}");
                return Err(e);
            }
        }
    }

    fn step(&mut self) -> Result<()> {
        let k = self.population.len() as f64;
        let coalescence_rate = k * (k - 1.0);
        loop {
            let recombination_rate = self.rho * self.fenwick.total() as f64;
            let e_c = self.rng.next_exponential();
            let e_r = self.rng.next_exponential();
            match popmodel::next_event(
                &self.models,
                self.model_index,
                self.t,
                coalescence_rate,
                recombination_rate,
                e_c,
                e_r,
            ) {
                NextEvent::EpochBoundary(t2) => {
                    self.t = t2;
                    self.model_index += 1;
                }
                NextEvent::Coalescence(t2) => {
                    self.t = t2;
                    log::trace!(
                        "coalescence at t={t2} ancestors={} links={}",
                        self.population.len(),
                        self.fenwick.total()
                    );
                    self.coalescence_event()?;
                    break;
                }
                NextEvent::Recombination(t2) => {
                    self.t = t2;
                    log::trace!(
                        "recombination at t={t2} ancestors={} links={}",
                        self.population.len(),
                        self.fenwick.total()
                    );
                    self.recombination_event()?;
                    break;
                }
            }
        }
        self.events += 1;
        Ok(())
    }

    fn recombination_event(&mut self) -> Result<()> {
        let l_total = self.fenwick.total();
        let h = self.rng.next_uniform_index(l_total as u64) as i64;
        let i = self.fenwick.find(h);
        let within_cell = h - self.fenwick.prefix_sum(i - 1);

        let bucket = self
            .population
            .bucket(i as u32)
            .expect("fenwick selected a locus with a live ancestor bucket");
        let mut remaining = within_cell;
        let mut chosen = bucket[0];
        for &handle in bucket {
            let links = self.segments.ancestor_link_count(handle) as i64;
            if remaining <= links {
                chosen = handle;
                break;
            }
            remaining -= links;
        }
        let b = remaining as u32;

        // The cell at `i` may hold the combined link weight of several
        // ancestors sharing this bucket; only `chosen`'s own contribution
        // changes here, so track it as a delta rather than overwriting the
        // whole cell.
        let pre_split_links = self.segments.ancestor_link_count(chosen) as i64;

        let new_head = match self.segments.locate_link(chosen, b) {
            SplitOutcome::Inside { handle, local_offset } => {
                let seg_left = self.segments.get(handle).left.get();
                let seg_right = self.segments.get(handle).right.get();
                let node = self.segments.get(handle).node;
                let next = self.segments.get(handle).next;

                let new_left = seg_left + local_offset;
                let new_head = self.segments.alloc(Segment {
                    left: Locus::new(new_left),
                    right: Locus::new(seg_right),
                    node,
                    next,
                })?;
                let s = self.segments.get_mut(handle);
                s.right = Locus::new(new_left);
                s.next = None;
                new_head
            }
            SplitOutcome::Between { handle } => self
                .segments
                .get_mut(handle)
                .next
                .take()
                .expect("Between outcome guarantees a next segment"),
        };
        let new_left = self.segments.get(new_head).left.get();

        let post_split_links = self.segments.ancestor_link_count(chosen) as i64;
        self.fenwick.increment(i, post_split_links - pre_split_links);

        let new_links = self.segments.ancestor_link_count(new_head) as i64;
        self.fenwick.increment(new_left as usize, new_links);
        self.population.insert(new_left, new_head)?;

        Ok(())
    }

    fn coalescence_event(&mut self) -> Result<()> {
        let ((kx, x), (ky, y)) = self.population.sample_two_distinct(&mut self.rng);
        // Cells `kx`/`ky` may hold the combined link weight of a bucket of
        // several ancestors sharing that key; only subtract what `x`/`y`
        // themselves contributed, not the whole cell.
        let x_links = self.segments.ancestor_link_count(x) as i64;
        let y_links = self.segments.ancestor_link_count(y) as i64;
        self.population.remove(kx, x);
        self.population.remove(ky, y);
        self.fenwick.increment(kx as usize, -x_links);
        self.fenwick.increment(ky as usize, -y_links);

        let xs = collect_segments(&self.segments, x);
        let ys = collect_segments(&self.segments, y);
        free_ancestor(&mut self.segments, x);
        free_ancestor(&mut self.segments, y);

        let t = self.t;
        let mut out = Vec::new();
        for (a, b, xcov, ycov) in merge_pieces(&xs, &ys) {
            match (xcov, ycov) {
                (Some(node), None) | (None, Some(node)) => out.push((a, b, node)),
                (Some(nx), Some(ny)) => {
                    let at_root = self.coverage.record_merge(a, b);
                    let u = NodeId::from(self.next_node);
                    self.next_node += 1;
                    self.records.push(CoalescenceRecord::new(
                        Locus::new(a),
                        Locus::new(b),
                        u,
                        [nx, ny],
                        Time::new(t),
                    ));
                    if !at_root {
                        out.push((a, b, u));
                    }
                }
                (None, None) => unreachable!("merge_pieces only yields covered sub-intervals"),
            }
        }

        if !out.is_empty() {
            let head_left = out[0].0;
            let mut next_handle = None;
            for &(a, b, node) in out.iter().rev() {
                let h = self.segments.alloc(Segment {
                    left: Locus::new(a),
                    right: Locus::new(b),
                    node,
                    next: next_handle,
                })?;
                next_handle = Some(h);
            }
            let head = next_handle.expect("out is non-empty");
            let links = self.segments.ancestor_link_count(head) as i64;
            self.fenwick.increment(head_left as usize, links);
            self.population.insert(head_left, head)?;
        }

        Ok(())
    }
}

fn collect_segments(segments: &SegmentArena, head: Handle) -> Vec<(u32, u32, NodeId)> {
    let mut v = Vec::new();
    let mut cur = Some(head);
    while let Some(h) = cur {
        let s = segments.get(h);
        v.push((s.left.get(), s.right.get(), s.node));
        cur = s.next;
    }
    v
}

fn free_ancestor(segments: &mut SegmentArena, head: Handle) {
    let mut cur = Some(head);
    while let Some(h) = cur {
        let next = segments.get(h).next;
        segments.free(h);
        cur = next;
    }
}

/// Merge two ancestors' sorted, disjoint segment lists into genomic pieces,
/// each tagged with which of `xs`/`ys` (if either) covers it.
fn merge_pieces(
    xs: &[(u32, u32, NodeId)],
    ys: &[(u32, u32, NodeId)],
) -> Vec<(u32, u32, Option<NodeId>, Option<NodeId>)> {
    let mut breaks: Vec<u32> = Vec::with_capacity(xs.len() * 2 + ys.len() * 2);
    for s in xs {
        breaks.push(s.0);
        breaks.push(s.1);
    }
    for s in ys {
        breaks.push(s.0);
        breaks.push(s.1);
    }
    breaks.sort_unstable();
    breaks.dedup();

    let mut pieces = Vec::new();
    for w in breaks.windows(2) {
        let (a, b) = (w[0], w[1]);
        let xcov = xs.iter().find(|s| s.0 <= a && b <= s.1).map(|s| s.2);
        let ycov = ys.iter().find(|s| s.0 <= a && b <= s.1).map(|s| s.2);
        if xcov.is_some() || ycov.is_some() {
            pieces.push((a, b, xcov, ycov));
        }
    }
    pieces
}
