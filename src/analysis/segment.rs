use serde::Serialize;
use crate::analysis::record::SweepRecord;
use crate::config::AnalyzerConfig;
/// One sweep cycle cut out of a record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Loop {
    pub index: usize,
    /// Offset of the first sample in the parent record.
    pub start: usize,
    pub voltage: Vec<f64>,
    pub current: Vec<f64>,
    #[serde(skip)]
    pub time: Option<Vec<f64>>,
}
impl Loop {
    pub fn len(&self) -> usize {
        self.voltage.len()
    }
    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Segmentation {
    pub num_loops: usize,
    /// Zero-crossing groups minus one.
    pub estimated_loops: usize,
    /// Interior extrema of |V| divided by four.
    pub turning_point_loops: usize,
    /// Both estimates agreed and the crossing boundaries were used.
    pub valid: bool,
    /// Every split was too short and the whole record became one loop.
    pub whole_record: bool,
    #[serde(skip)]
    pub loops: Vec<Loop>,
}
impl Segmentation {
    pub fn split_v_data(&self) -> Vec<&[f64]> {
        self.loops.iter().map(|l| l.voltage.as_slice()).collect()
    }
    pub fn split_c_data(&self) -> Vec<&[f64]> {
        self.loops.iter().map(|l| l.current.as_slice()).collect()
    }
}
/// Splits a record into sweep cycles. The heuristic is approximate; every
/// per-loop statistic downstream inherits its mistakes.
#[derive(Clone, Copy, Debug)]
pub struct LoopSegmenter {
    group_gap: usize,
    min_loop_points: usize,
}
impl LoopSegmenter {
    pub fn new(group_gap: usize, min_loop_points: usize) -> Self {
        Self {
            group_gap,
            min_loop_points,
        }
    }
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(config.crossing_group_gap, config.min_loop_points)
    }
    pub fn segment(&self, record: &SweepRecord) -> Segmentation {
        let voltage = record.voltage();
        let n = voltage.len();
        if n < 4 {
            return Segmentation {
                num_loops: 1,
                estimated_loops: 1,
                turning_point_loops: 1,
                valid: true,
                whole_record: true,
                loops: vec![whole_loop(record)],
            };
        }
        let group_starts = self.crossing_group_starts(voltage);
        let estimated_loops = group_starts.len().saturating_sub(1);
        let turning_point_loops = (count_turning_points(voltage) as f64 / 4.0).round() as usize;
        let valid = estimated_loops >= 1 && estimated_loops == turning_point_loops;
        let boundaries: Vec<usize> = if valid {
            let mut b = vec![0];
            b.extend(group_starts[1..group_starts.len() - 1].iter().copied());
            b.push(n);
            b
        } else {
            let loops = turning_point_loops.max(1);
            let chunk = n / loops;
            let mut b: Vec<usize> = (0..loops).map(|k| k * chunk).collect();
            b.push(n);
            b
        };
        log::debug!(
            "segmentation: {estimated_loops} crossing loops, {turning_point_loops} turning-point loops, valid={valid}"
        );
        let mut loops: Vec<Loop> = boundaries
            .windows(2)
            .filter(|w| w[1] - w[0] >= self.min_loop_points)
            .enumerate()
            .map(|(index, w)| slice_loop(record, index, w[0], w[1]))
            .collect();
        let whole_record = loops.is_empty();
        if whole_record {
            loops.push(whole_loop(record));
        }
        Segmentation {
            num_loops: loops.len(),
            estimated_loops,
            turning_point_loops,
            valid,
            whole_record,
            loops,
        }
    }
    /// First index of every group of upward zero crossings.
    fn crossing_group_starts(&self, voltage: &[f64]) -> Vec<usize> {
        let crossings = voltage.windows(2).enumerate().filter_map(|(k, w)| {
            let upward = (w[0] <= 0.0 && w[1] > 0.0) || (w[0] < 0.0 && w[1] >= 0.0);
            upward.then_some(k)
        });
        let mut starts = Vec::new();
        let mut last: Option<usize> = None;
        for k in crossings {
            match last {
                Some(prev) if k - prev <= self.group_gap => {}
                _ => starts.push(k),
            }
            last = Some(k);
        }
        starts
    }
}
/// Interior local extrema of |V|.
fn count_turning_points(voltage: &[f64]) -> usize {
    let magnitude: Vec<f64> = voltage.iter().map(|v| v.abs()).collect();
    magnitude
        .windows(3)
        .filter(|w| (w[1] > w[0] && w[1] >= w[2]) || (w[1] < w[0] && w[1] <= w[2]))
        .count()
}
fn slice_loop(record: &SweepRecord, index: usize, start: usize, end: usize) -> Loop {
    Loop {
        index,
        start,
        voltage: record.voltage()[start..end].to_vec(),
        current: record.current()[start..end].to_vec(),
        time: record.time().map(|t| t[start..end].to_vec()),
    }
}
fn whole_loop(record: &SweepRecord) -> Loop {
    slice_loop(record, 0, 0, record.len())
}
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::analysis::record::AnalysisLevel;
    /// 0 → +amp → 0 → −amp → 0, `quarter` samples per quarter, repeated.
    pub(crate) fn triangle_sweep(amp: f64, quarter: usize, cycles: usize) -> Vec<f64> {
        let step = amp / quarter as f64;
        let mut v = vec![0.0];
        for _ in 0..cycles {
            for k in 1..=quarter {
                v.push(k as f64 * step);
            }
            for k in (0..quarter).rev() {
                v.push(k as f64 * step);
            }
            for k in 1..=quarter {
                v.push(-(k as f64) * step);
            }
            for k in (0..quarter).rev() {
                v.push(-(k as f64) * step);
            }
        }
        v
    }
    fn record(voltage: Vec<f64>) -> SweepRecord {
        let current = voltage.iter().map(|v| v * 1e-3).collect();
        SweepRecord::new(voltage, current, None, None, AnalysisLevel::Full).unwrap()
    }
    #[test]
    fn splits_repeated_cycles() {
        let seg = LoopSegmenter::new(10, 10).segment(&record(triangle_sweep(1.0, 25, 3)));
        assert!(seg.valid);
        assert_eq!(seg.estimated_loops, 3);
        assert_eq!(seg.num_loops, 3);
        let total: usize = seg.loops.iter().map(Loop::len).sum();
        assert_eq!(total, 301);
        assert_eq!(seg.split_v_data().len(), 3);
    }
    #[test]
    fn short_records_are_one_loop() {
        let seg = LoopSegmenter::new(10, 10).segment(&record(vec![0.0, 1.0, 0.0]));
        assert_eq!(seg.num_loops, 1);
        assert_eq!(seg.loops[0].len(), 3);
    }
    #[test]
    fn tiny_loops_fall_back_to_whole_record() {
        let seg = LoopSegmenter::new(10, 10).segment(&record(vec![
            0.0, 1.0, 2.0, 1.0, 0.0, -1.0, -2.0, -1.0, 0.0,
        ]));
        assert_eq!(seg.num_loops, 1);
        assert!(seg.whole_record);
        assert_eq!(seg.loops[0].len(), 9);
    }
    #[test]
    fn monotonic_ramp_is_single_loop() {
        let voltage: Vec<f64> = (0..50).map(|k| -1.0 + 2.0 * k as f64 / 49.0).collect();
        let seg = LoopSegmenter::new(10, 10).segment(&record(voltage));
        assert!(!seg.valid);
        assert_eq!(seg.num_loops, 1);
        assert_eq!(seg.loops[0].len(), 50);
    }
}
