use crossbeam_channel::{bounded, Receiver, Sender};

/// Caps how many recognizer calls run at once across all page workers.
///
/// The channel holds one token per allowed call; taking a token blocks until one
/// is free and dropping the permit puts it back.
#[derive(Debug)]
pub struct RecognitionGate {
    limit: usize,
    release: Sender<()>,
    acquire: Receiver<()>,
}

pub struct GatePermit<'a> {
    gate: &'a RecognitionGate,
}

impl RecognitionGate {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        let (release, acquire) = bounded(limit);
        for _ in 0..limit {
            let _ = release.try_send(());
        }
        Self {
            limit,
            release,
            acquire,
        }
    }

    pub fn acquire(&self) -> GatePermit<'_> {
        // The gate owns a sender, so the channel cannot disconnect while borrowed.
        let _ = self.acquire.recv();
        GatePermit { gate: self }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn in_flight(&self) -> usize {
        self.limit - self.acquire.len()
    }
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        let _ = self.gate.release.try_send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn permits_return_on_drop() {
        let gate = RecognitionGate::new(2);
        let a = gate.acquire();
        let b = gate.acquire();
        assert_eq!(gate.in_flight(), 2);
        drop(a);
        assert_eq!(gate.in_flight(), 1);
        drop(b);
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn zero_limit_still_admits_one() {
        let gate = RecognitionGate::new(0);
        assert_eq!(gate.limit(), 1);
        let _permit = gate.acquire();
        assert_eq!(gate.in_flight(), 1);
    }

    #[test]
    fn never_exceeds_limit_across_threads() {
        let gate = RecognitionGate::new(2);
        let current = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let _permit = gate.acquire();
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    current.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(gate.in_flight(), 0);
    }
}
