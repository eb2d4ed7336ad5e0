use std::collections::{HashMap, VecDeque};
use thiserror::Error;
use crate::analysis::DeviceSnapshot;
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("device id must not be empty")]
    EmptyDeviceId,
    #[error("cycle {cycle} is not newer than the last stored cycle {last} for {device}")]
    OutOfOrder { device: String, cycle: u32, last: u32 },
}
/// Repository of per-device snapshots. The analysis never persists anything
/// itself; callers inject whatever storage they need.
pub trait DeviceHistory {
    /// Snapshots for `device_id`, oldest first.
    fn get(&self, device_id: &str) -> Result<Vec<DeviceSnapshot>, HistoryError>;
    fn put(&mut self, device_id: &str, snapshot: DeviceSnapshot) -> Result<(), HistoryError>;
}
/// In-memory history that keeps at most `capacity` snapshots per device.
pub struct InMemoryHistory {
    devices: HashMap<String, VecDeque<DeviceSnapshot>>,
    capacity: usize,
}
impl InMemoryHistory {
    pub fn new() -> Self {
        Self::with_capacity(usize::MAX)
    }
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            devices: HashMap::new(),
            capacity: capacity.max(1),
        }
    }
    pub fn latest(&self, device_id: &str) -> Option<&DeviceSnapshot> {
        self.devices.get(device_id).and_then(|q| q.back())
    }
    pub fn device_ids(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }
}
impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}
impl DeviceHistory for InMemoryHistory {
    fn get(&self, device_id: &str) -> Result<Vec<DeviceSnapshot>, HistoryError> {
        if device_id.is_empty() {
            return Err(HistoryError::EmptyDeviceId);
        }
        Ok(self
            .devices
            .get(device_id)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default())
    }
    fn put(&mut self, device_id: &str, snapshot: DeviceSnapshot) -> Result<(), HistoryError> {
        if device_id.is_empty() {
            return Err(HistoryError::EmptyDeviceId);
        }
        let queue = self.devices.entry(device_id.to_string()).or_default();
        if let Some(last) = queue.back() {
            if snapshot.cycle_number <= last.cycle_number {
                return Err(HistoryError::OutOfOrder {
                    device: device_id.to_string(),
                    cycle: snapshot.cycle_number,
                    last: last.cycle_number,
                });
            }
        }
        queue.push_back(snapshot);
        while queue.len() > self.capacity {
            queue.pop_front();
        }
        log::debug!("history for {device_id} holds {} snapshots", queue.len());
        Ok(())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SweepAnalyzer;
    fn snapshot(cycle: u32) -> DeviceSnapshot {
        let v: Vec<f64> = (0..=40).map(|k| (k as f64 - 20.0) / 20.0).collect();
        let i: Vec<f64> = v.iter().map(|x| x * 1e-3).collect();
        SweepAnalyzer::new(v, i, None, None, "full")
            .unwrap()
            .device_snapshot(cycle, format!("t{cycle}"))
    }
    #[test]
    fn keeps_snapshots_in_cycle_order() {
        let mut history = InMemoryHistory::new();
        history.put("dev-a", snapshot(1)).unwrap();
        history.put("dev-a", snapshot(2)).unwrap();
        let cycles: Vec<u32> = history.get("dev-a").unwrap().iter().map(|s| s.cycle_number).collect();
        assert_eq!(cycles, vec![1, 2]);
        assert!(history.get("dev-b").unwrap().is_empty());
        assert_eq!(history.latest("dev-a").map(|s| s.cycle_number), Some(2));
    }
    #[test]
    fn rejects_stale_cycles_and_empty_ids() {
        let mut history = InMemoryHistory::new();
        history.put("dev", snapshot(3)).unwrap();
        assert!(matches!(
            history.put("dev", snapshot(3)),
            Err(HistoryError::OutOfOrder { cycle: 3, last: 3, .. })
        ));
        assert!(matches!(history.get(""), Err(HistoryError::EmptyDeviceId)));
    }
    #[test]
    fn capacity_drops_oldest() {
        let mut history = InMemoryHistory::with_capacity(2);
        for cycle in 1..=3 {
            history.put("dev", snapshot(cycle)).unwrap();
        }
        let kept: Vec<u32> = history.get("dev").unwrap().iter().map(|s| s.cycle_number).collect();
        assert_eq!(kept, vec![2, 3]);
    }
}
