//! Fires one ICMP echo per configured reflector each tick and reduces the
//! responses to a single RTT sample (or `AllFailed`).
//!
//! Reflector selection is fixed: the same reflectors probe every tick, in
//! the order configured. There is no demotion or rotation in this layer —
//! that's an operator concern outside this crate's scope.

use std::time::Duration;

use wanctl_transport::RouterTransport;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeResult {
    Success { rtt_ms: f64 },
    AllFailed,
}

/// Issue one echo per entry in `reflectors`, each bounded by `deadline`
/// (normally the cycle interval), in parallel. If `median_of_three` is set
/// and at least three echoes returned, reduce via median; otherwise take
/// the minimum of whatever came back. Every echo timing out is `AllFailed`.
pub fn probe(
    transport: &dyn RouterTransport,
    reflectors: &[String],
    median_of_three: bool,
    deadline: Duration,
) -> ProbeResult {
    let mut samples: Vec<f64> = Vec::with_capacity(reflectors.len());

    std::thread::scope(|scope| {
        let handles: Vec<_> = reflectors
            .iter()
            .map(|host| scope.spawn(move || transport.ping(host, 1, deadline).ok()))
            .collect();

        for handle in handles {
            if let Ok(Some(result)) = handle.join() {
                if let Some(&sample) = result.samples_ms.first() {
                    samples.push(sample);
                }
            }
        }
    });

    if samples.is_empty() {
        return ProbeResult::AllFailed;
    }

    let rtt_ms = if median_of_three && samples.len() >= 3 {
        median(&mut samples)
    } else {
        samples.iter().copied().fold(f64::INFINITY, f64::min)
    };

    ProbeResult::Success { rtt_ms }
}

fn median(samples: &mut [f64]) -> f64 {
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap());
    samples[samples.len() / 2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wanctl_transport::{CakeStats, Direction, PingResult, TransportError};

    struct FakeTransport {
        responses: Vec<Option<f64>>,
        call_count: AtomicUsize,
    }

    impl RouterTransport for FakeTransport {
        fn read_stats(&self, _queue_name: &str) -> Result<CakeStats, TransportError> {
            unimplemented!()
        }
        fn set_rate(
            &self,
            _queue_name: &str,
            _direction: Direction,
            _mbps: f64,
        ) -> Result<(), TransportError> {
            unimplemented!()
        }
        fn enable_rule(&self, _rule_id: &str) -> Result<(), TransportError> {
            unimplemented!()
        }
        fn disable_rule(&self, _rule_id: &str) -> Result<(), TransportError> {
            unimplemented!()
        }
        fn ping(
            &self,
            _host: &str,
            _count: u32,
            _deadline: Duration,
        ) -> Result<PingResult, TransportError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            match self.responses.get(idx % self.responses.len()) {
                Some(Some(ms)) => Ok(PingResult {
                    samples_ms: vec![*ms],
                }),
                _ => Ok(PingResult::default()),
            }
        }
    }

    fn reflectors(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("10.0.0.{i}")).collect()
    }

    #[test]
    fn all_failed_when_every_echo_times_out() {
        let transport = FakeTransport {
            responses: vec![None, None, None],
            call_count: AtomicUsize::new(0),
        };
        let result = probe(&transport, &reflectors(3), true, Duration::from_millis(50));
        assert_eq!(result, ProbeResult::AllFailed);
    }

    #[test]
    fn single_response_returns_that_value() {
        let transport = FakeTransport {
            responses: vec![None, Some(24.0), None],
            call_count: AtomicUsize::new(0),
        };
        let result = probe(&transport, &reflectors(3), true, Duration::from_millis(50));
        assert_eq!(result, ProbeResult::Success { rtt_ms: 24.0 });
    }

    #[test]
    fn median_of_three_used_when_all_respond() {
        let transport = FakeTransport {
            responses: vec![Some(30.0), Some(10.0), Some(20.0)],
            call_count: AtomicUsize::new(0),
        };
        let result = probe(&transport, &reflectors(3), true, Duration::from_millis(50));
        assert_eq!(result, ProbeResult::Success { rtt_ms: 20.0 });
    }

    #[test]
    fn minimum_used_when_median_disabled() {
        let transport = FakeTransport {
            responses: vec![Some(30.0), Some(10.0), Some(20.0)],
            call_count: AtomicUsize::new(0),
        };
        let result = probe(&transport, &reflectors(3), false, Duration::from_millis(50));
        assert_eq!(result, ProbeResult::Success { rtt_ms: 10.0 });
    }

    #[test]
    fn minimum_used_when_fewer_than_three_respond() {
        let transport = FakeTransport {
            responses: vec![Some(30.0), None, Some(20.0)],
            call_count: AtomicUsize::new(0),
        };
        let result = probe(&transport, &reflectors(3), true, Duration::from_millis(50));
        assert_eq!(result, ProbeResult::Success { rtt_ms: 20.0 });
    }
}
