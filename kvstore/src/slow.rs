//! Latency-injecting wrapper around an [Application].

use crate::{split_tx, Application, TxResult};
use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// A lifecycle phase whose latency can be reconfigured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Check,
    Deliver,
    Commit,
    Query,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Check, Phase::Deliver, Phase::Commit, Phase::Query];

    fn index(&self) -> usize {
        match self {
            Phase::Check => 0,
            Phase::Deliver => 1,
            Phase::Commit => 2,
            Phase::Query => 3,
        }
    }
}

/// The recognized control keywords and the phases each reconfigures.
/// Recognition takes precedence over normal key/value writes.
const CONTROL_KEYS: &[(&[u8], &[Phase])] = &[
    (b"checkTxWait", &[Phase::Check]),
    (b"deliverTxWait", &[Phase::Deliver]),
    (b"commitWait", &[Phase::Commit]),
    (b"queryWait", &[Phase::Query]),
    (b"allWait", &Phase::ALL),
];

/// A configured latency range in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Latency {
    pub min_ms: i64,
    pub max_ms: i64,
}

impl Latency {
    /// Parses a `min,max` pair, swapping the bounds if they are inverted.
    fn parse(value: &[u8]) -> Result<Self, &'static str> {
        let value =
            std::str::from_utf8(value).map_err(|_| "invalid min/max response time format")?;
        let mut parts = value.split(',');
        let (Some(min), Some(max), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err("invalid min/max response time format");
        };
        let min: i64 = min
            .parse()
            .map_err(|_| "invalid minimum response time")?;
        let max: i64 = max
            .parse()
            .map_err(|_| "invalid maximum response time")?;
        if min > max {
            return Ok(Self {
                min_ms: max,
                max_ms: min,
            });
        }
        Ok(Self {
            min_ms: min,
            max_ms: max,
        })
    }

    /// Draws a sleep duration, uniformly distributed over the range. Ranges
    /// that cannot produce a positive wait yield no sleep at all.
    fn sample(&self) -> Option<Duration> {
        let ms = if self.min_ms == self.max_ms {
            self.min_ms
        } else {
            rand::thread_rng().gen_range(self.min_ms..=self.max_ms)
        };
        if ms <= 0 {
            return None;
        }
        Some(Duration::from_millis(ms as u64))
    }
}

/// Wraps an application and injects a configurable sleep into each phase.
///
/// Latency is reconfigured through control transactions `keyword=min,max`
/// where the keyword names a phase (or `allWait` for every phase). Control
/// transactions are consumed by the wrapper and never reach the inner
/// application.
pub struct SlowKvStore<A: Application> {
    inner: A,
    latencies: Mutex<[Latency; 4]>,
}

impl<A: Application> SlowKvStore<A> {
    /// Wraps `inner` with every phase initially at zero latency.
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            latencies: Mutex::new([Latency::default(); 4]),
        }
    }

    /// The currently configured latency for `phase`.
    pub fn latency(&self, phase: Phase) -> Latency {
        self.lock_latencies()[phase.index()]
    }

    fn lock_latencies(&self) -> std::sync::MutexGuard<'_, [Latency; 4]> {
        self.latencies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Matches a control transaction, returning the keyword, the phases it
    /// targets, and the parsed latency pair.
    fn parse_control(
        tx: &[u8],
    ) -> Option<(&'static [u8], &'static [Phase], Result<Latency, &'static str>)> {
        let (key, value) = split_tx(tx);
        let (keyword, phases) = CONTROL_KEYS.iter().find(|(keyword, _)| *keyword == key)?;
        Some((keyword, phases, Latency::parse(value)))
    }

    async fn wait(&self, phase: Phase) {
        let delay = self.latency(phase).sample();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl<A: Application> Application for SlowKvStore<A> {
    async fn check_tx(&self, tx: &[u8]) -> TxResult {
        // Control transactions are validated without mutating anything; the
        // latency changes only on delivery.
        if let Some((_, _, latency)) = Self::parse_control(tx) {
            return match latency {
                Ok(_) => TxResult::ok(""),
                Err(reason) => TxResult::encoding_error(reason),
            };
        }
        self.wait(Phase::Check).await;
        self.inner.check_tx(tx).await
    }

    async fn deliver_tx(&self, tx: &[u8]) -> TxResult {
        if let Some((keyword, phases, latency)) = Self::parse_control(tx) {
            let latency = match latency {
                Ok(latency) => latency,
                Err(reason) => return TxResult::encoding_error(reason),
            };
            {
                // Each targeted phase gets its own copy, so a later override
                // of one phase never disturbs the others.
                let mut latencies = self.lock_latencies();
                for phase in phases {
                    latencies[phase.index()] = latency;
                }
            }
            let keyword = String::from_utf8_lossy(keyword);
            debug!(%keyword, min_ms = latency.min_ms, max_ms = latency.max_ms, "latency reconfigured");
            return TxResult::ok(format!(
                "set {keyword} minWait = {}, maxWait = {}",
                latency.min_ms, latency.max_ms
            ));
        }
        let result = self.inner.deliver_tx(tx).await;
        self.wait(Phase::Deliver).await;
        result
    }

    async fn commit(&self) -> Vec<u8> {
        self.wait(Phase::Commit).await;
        self.inner.commit().await
    }

    async fn query(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.wait(Phase::Query).await;
        self.inner.query(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KvStore, CODE_ENCODING_ERROR};
    use tokio::time::Instant;

    fn app() -> SlowKvStore<KvStore> {
        SlowKvStore::new(KvStore::new())
    }

    #[tokio::test]
    async fn test_all_wait_sets_every_phase() {
        let app = app();
        assert!(app.deliver_tx(b"allWait=100,200").await.is_ok());
        for phase in Phase::ALL {
            assert_eq!(
                app.latency(phase),
                Latency {
                    min_ms: 100,
                    max_ms: 200
                }
            );
        }
    }

    #[tokio::test]
    async fn test_single_phase_override_is_independent() {
        let app = app();
        app.deliver_tx(b"allWait=50,50").await;
        app.deliver_tx(b"checkTxWait=10,10").await;
        assert_eq!(
            app.latency(Phase::Check),
            Latency {
                min_ms: 10,
                max_ms: 10
            }
        );
        for phase in [Phase::Deliver, Phase::Commit, Phase::Query] {
            assert_eq!(
                app.latency(phase),
                Latency {
                    min_ms: 50,
                    max_ms: 50
                }
            );
        }
    }

    #[tokio::test]
    async fn test_malformed_control_rejected_in_both_paths() {
        let app = app();
        for tx in [
            b"checkTxWait=abc,def".as_slice(),
            b"checkTxWait=100",
            b"checkTxWait=1,2,3",
            b"allWait=1,x",
        ] {
            assert_eq!(app.check_tx(tx).await.code, CODE_ENCODING_ERROR);
            assert_eq!(app.deliver_tx(tx).await.code, CODE_ENCODING_ERROR);
        }
        // Nothing was reconfigured or stored.
        for phase in Phase::ALL {
            assert_eq!(app.latency(phase), Latency::default());
        }
        assert_eq!(app.query(b"checkTxWait").await, None);
    }

    #[tokio::test]
    async fn test_check_does_not_reconfigure() {
        let app = app();
        assert!(app.check_tx(b"commitWait=5,10").await.is_ok());
        assert_eq!(app.latency(Phase::Commit), Latency::default());
    }

    #[tokio::test]
    async fn test_inverted_bounds_swapped() {
        let app = app();
        let result = app.deliver_tx(b"queryWait=200,100").await;
        assert!(result.is_ok());
        assert_eq!(result.log, "set queryWait minWait = 100, maxWait = 200");
        assert_eq!(
            app.latency(Phase::Query),
            Latency {
                min_ms: 100,
                max_ms: 200
            }
        );
    }

    #[tokio::test]
    async fn test_control_keyword_shadows_store_write() {
        let app = app();
        app.deliver_tx(b"commitWait=5,5").await;
        assert_eq!(app.query(b"commitWait").await, None);
    }

    #[tokio::test]
    async fn test_normal_txs_delegate() {
        let app = app();
        assert!(app.check_tx(b"name=satoshi").await.is_ok());
        assert!(app.deliver_tx(b"name=satoshi").await.is_ok());
        assert_eq!(app.query(b"name").await, Some(b"satoshi".to_vec()));
        assert_eq!(app.commit().await, 1u64.to_be_bytes().to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let app = app();
        app.deliver_tx(b"deliverTxWait=100,100").await;
        let before = Instant::now();
        app.deliver_tx(b"name=satoshi").await;
        assert!(before.elapsed() >= Duration::from_millis(100));

        app.deliver_tx(b"queryWait=50,50").await;
        let before = Instant::now();
        app.query(b"name").await;
        assert!(before.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_zero_and_negative_latency_never_sleeps() {
        assert_eq!(Latency::default().sample(), None);
        assert_eq!(
            Latency {
                min_ms: -10,
                max_ms: -5
            }
            .sample(),
            None
        );
        assert!(Latency { min_ms: 1, max_ms: 1 }.sample().is_some());
    }
}
