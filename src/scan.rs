use crate::types::{Measurement, Scan};

/// Scans shorter than this are treated as fragments and dropped.
pub const MIN_SCAN_LEN: usize = 5;

/// Groups a stream of decoded nodes into full revolutions.
///
/// A revolution ends when the device flags the next node as the start of a
/// new scan. The first partial revolution after start-up is usually short and
/// gets discarded by the length check. Nodes without a return (distance 0)
/// are not collected.
#[derive(Debug, Default)]
pub struct ScanAssembler {
    pending: Scan,
}

impl ScanAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one node. Returns the finished scan when `new_scan` closes one.
    pub fn push(&mut self, new_scan: bool, m: Measurement) -> Option<Scan> {
        let mut done = None;
        if new_scan {
            let scan = std::mem::take(&mut self.pending);
            if scan.len() > MIN_SCAN_LEN {
                done = Some(scan);
            } else if !scan.is_empty() {
                log::trace!("Dropping {}-point scan fragment", scan.len());
            }
        }
        if m.distance > 0.0 {
            self.pending.push(m);
        }
        done
    }

    /// Forget the revolution in progress, e.g. after the scan was restarted.
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
