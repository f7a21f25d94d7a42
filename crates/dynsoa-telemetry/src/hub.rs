// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The metrics hub: per-view sample windows, EWMA state, and aggregation.

use crate::sink::CsvSink;
use dynsoa_core::{FrameAgg, Sample, ViewId};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

/// Maximum samples retained per view.
pub const WINDOW_CAP: usize = 120;

/// Mixing factor of the per-view EWMA.
pub const EWMA_ALPHA: f64 = 0.2;

#[derive(Default)]
struct ViewStats {
    window: VecDeque<Sample>,
    ewma: FrameAgg,
}

#[derive(Default)]
struct HubState {
    csv: Option<CsvSink>,
    views: HashMap<ViewId, ViewStats>,
}

/// Ingestion point for kernel samples.
///
/// Kernels may be threaded by the caller, so the hub is the one place in
/// the runtime guarded by a mutex; every other subsystem assumes a single
/// logical owner.
#[derive(Default)]
pub struct MetricsHub {
    state: Mutex<HubState>,
}

impl MetricsHub {
    /// Creates an empty hub with no CSV sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)opens the CSV sink at `path`, writing the header immediately.
    ///
    /// A previously open sink is replaced. On failure the sink is disabled
    /// and subsequent emits skip CSV output.
    pub fn enable_csv(&self, path: &Path) {
        let mut state = self.state.lock().unwrap();
        state.csv = CsvSink::create(path);
    }

    /// Appends a sample to its view's window (dropping the oldest beyond
    /// [`WINDOW_CAP`]) and to the CSV sink when one is open.
    pub fn emit(&self, sample: &Sample) {
        let mut state = self.state.lock().unwrap();
        if let Some(csv) = state.csv.as_mut() {
            csv.write_row(sample);
        }
        let stats = state.views.entry(sample.view).or_default();
        stats.window.push_back(sample.clone());
        if stats.window.len() > WINDOW_CAP {
            stats.window.pop_front();
        }
    }

    /// Folds a frame-closing sample into the view's EWMA.
    ///
    /// `mean_us`, `warp_eff`, `p95_us` and `p99_us` seed directly from the
    /// first observation (any of them still at 0 takes the observed value);
    /// divergence, coalescing and miss rates always mix with α.
    pub fn note_frame_end(&self, view: ViewId, sample: &Sample) {
        let mut state = self.state.lock().unwrap();
        let e = &mut state.views.entry(view).or_default().ewma;
        let lerp = |cur: f64, obs: f64| (1.0 - EWMA_ALPHA) * cur + EWMA_ALPHA * obs;

        e.mean_us = if e.mean_us == 0.0 {
            sample.time_us as f64
        } else {
            lerp(e.mean_us, sample.time_us as f64)
        };
        e.warp_eff = if e.warp_eff == 0.0 {
            sample.warp_eff as f64
        } else {
            lerp(e.warp_eff, sample.warp_eff as f64)
        };
        e.branch_div = lerp(e.branch_div, sample.branch_div as f64);
        e.mem_coalesce = lerp(e.mem_coalesce, sample.mem_coalesce as f64);
        e.l2_miss = lerp(e.l2_miss, sample.l2_miss_rate as f64);
        e.p95_us = if e.p95_us == 0.0 {
            sample.p95_tile_us as f64
        } else {
            lerp(e.p95_us, sample.p95_tile_us as f64)
        };
        e.p99_us = if e.p99_us == 0.0 {
            sample.p99_tile_us as f64
        } else {
            lerp(e.p99_us, sample.p99_tile_us as f64)
        };
        e.refresh_tail_ratio();
    }

    /// Aggregates the last up-to-`window_frames` samples of a view.
    ///
    /// Latency and efficiency fields are arithmetic means over the scanned
    /// samples. `p95_us`/`p99_us` carry the values of the oldest sample the
    /// scan visits — the scheduler's baseline extraction depends on this.
    /// An unknown or empty view yields an all-zero aggregate.
    pub fn aggregate(&self, view: ViewId, window_frames: usize) -> FrameAgg {
        let state = self.state.lock().unwrap();
        let mut agg = FrameAgg::default();
        let Some(stats) = state.views.get(&view) else {
            return agg;
        };

        let mut n = 0usize;
        for s in stats.window.iter().rev().take(window_frames) {
            agg.mean_us += s.time_us as f64;
            agg.warp_eff += s.warp_eff as f64;
            agg.branch_div += s.branch_div as f64;
            agg.mem_coalesce += s.mem_coalesce as f64;
            agg.l2_miss += s.l2_miss_rate as f64;
            agg.p95_us = s.p95_tile_us as f64;
            agg.p99_us = s.p99_tile_us as f64;
            n += 1;
        }
        if n > 0 {
            let nf = n as f64;
            agg.mean_us /= nf;
            agg.warp_eff /= nf;
            agg.branch_div /= nf;
            agg.mem_coalesce /= nf;
            agg.l2_miss /= nf;
            agg.refresh_tail_ratio();
        }
        agg
    }

    /// The current EWMA aggregate of a view, if any samples were noted.
    pub fn ewma(&self, view: ViewId) -> Option<FrameAgg> {
        let state = self.state.lock().unwrap();
        state.views.get(&view).map(|s| s.ewma)
    }

    /// Number of samples currently windowed for a view.
    pub fn sample_count(&self, view: ViewId) -> usize {
        let state = self.state.lock().unwrap();
        state.views.get(&view).map_or(0, |s| s.window.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed_sample(view: ViewId, time_us: u32) -> Sample {
        Sample {
            time_us,
            ..Sample::new("k", view)
        }
    }

    #[test]
    fn aggregate_of_unknown_view_is_zeroed() {
        let hub = MetricsHub::new();
        let agg = hub.aggregate(9, 3);
        assert_eq!(agg, FrameAgg::default());
    }

    #[test]
    fn aggregate_mean_over_full_window_is_arithmetic_mean() {
        let hub = MetricsHub::new();
        for t in [100, 200, 300, 400] {
            hub.emit(&timed_sample(1, t));
        }
        let agg = hub.aggregate(1, 10);
        assert!((agg.mean_us - 250.0).abs() < 1e-9);
        assert!((agg.warp_eff - 1.0).abs() < 1e-9);
        assert!((agg.mem_coalesce - 1.0).abs() < 1e-9);
        assert_eq!(agg.branch_div, 0.0);
    }

    #[test]
    fn aggregate_scans_only_the_newest_samples() {
        let hub = MetricsHub::new();
        for t in [100, 200, 600] {
            hub.emit(&timed_sample(1, t));
        }
        let agg = hub.aggregate(1, 2);
        assert!((agg.mean_us - 400.0).abs() < 1e-9);
    }

    #[test]
    fn aggregate_p95_comes_from_oldest_scanned_sample() {
        let hub = MetricsHub::new();
        for (t, p95, p99) in [(100, 500, 600), (100, 700, 800), (100, 900, 1000)] {
            let mut s = timed_sample(1, t);
            s.p95_tile_us = p95;
            s.p99_tile_us = p99;
            hub.emit(&s);
        }
        // Scanning the newest 2 samples ends on the middle one.
        let agg = hub.aggregate(1, 2);
        assert_eq!(agg.p95_us, 700.0);
        assert_eq!(agg.p99_us, 800.0);
        assert!((agg.tail_ratio - 800.0 / 700.0).abs() < 1e-12);
    }

    #[test]
    fn window_is_bounded() {
        let hub = MetricsHub::new();
        for t in 0..(WINDOW_CAP as u32 + 30) {
            hub.emit(&timed_sample(1, t));
        }
        assert_eq!(hub.sample_count(1), WINDOW_CAP);
        // The oldest surviving sample is the 31st emitted.
        let agg = hub.aggregate(1, WINDOW_CAP);
        let expected: f64 = (30..WINDOW_CAP as u32 + 30).map(f64::from).sum::<f64>()
            / WINDOW_CAP as f64;
        assert!((agg.mean_us - expected).abs() < 1e-9);
    }

    #[test]
    fn ewma_seeds_then_mixes() {
        let hub = MetricsHub::new();
        hub.note_frame_end(1, &timed_sample(1, 100));
        let e = hub.ewma(1).unwrap();
        assert_eq!(e.mean_us, 100.0);

        hub.note_frame_end(1, &timed_sample(1, 200));
        let e = hub.ewma(1).unwrap();
        assert!((e.mean_us - 120.0).abs() < 1e-9, "0.8*100 + 0.2*200 = 120");
    }

    #[test]
    fn ewma_converges_geometrically() {
        let hub = MetricsHub::new();
        hub.note_frame_end(1, &timed_sample(1, 1000));
        let n = 10;
        for _ in 0..n {
            hub.note_frame_end(1, &timed_sample(1, 500));
        }
        let e = hub.ewma(1).unwrap();
        let bound = (1.0 - EWMA_ALPHA).powi(n) * 500.0 + 1e-9;
        assert!(
            (e.mean_us - 500.0).abs() <= bound,
            "EWMA {} should be within {bound} of 500",
            e.mean_us
        );
    }

    #[test]
    fn ewma_tail_ratio_tracks_p95_p99() {
        let hub = MetricsHub::new();
        let mut s = timed_sample(1, 100);
        s.p95_tile_us = 400;
        s.p99_tile_us = 500;
        hub.note_frame_end(1, &s);
        let e = hub.ewma(1).unwrap();
        assert!((e.tail_ratio - 1.25).abs() < 1e-9);

        // Without p95 the ratio stays zero.
        let hub2 = MetricsHub::new();
        hub2.note_frame_end(2, &timed_sample(2, 100));
        assert_eq!(hub2.ewma(2).unwrap().tail_ratio, 0.0);
    }

    #[test]
    fn csv_sink_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        let hub = MetricsHub::new();
        hub.enable_csv(&path);
        hub.emit(&timed_sample(3, 42));

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "kernel,view,time_us,p95_tile_us,p99_tile_us,warp_eff,branch_div,mem_coalesce,l2_miss_rate"
        );
        assert_eq!(lines.next().unwrap(), "k,3,42,0,0,1,0,1,0");
    }

    #[test]
    fn reenabling_csv_replaces_the_sink() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.csv");
        let second = dir.path().join("b.csv");
        let hub = MetricsHub::new();
        hub.enable_csv(&first);
        hub.enable_csv(&second);
        hub.emit(&timed_sample(1, 7));

        let a = std::fs::read_to_string(&first).unwrap();
        let b = std::fs::read_to_string(&second).unwrap();
        assert_eq!(a.lines().count(), 1, "old sink only has the header");
        assert_eq!(b.lines().count(), 2);
    }
}
