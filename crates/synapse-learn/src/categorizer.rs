//! Maps free text to a category key from the two closest worker profiles

use crate::embed::{cosine_similarity, EmbedError, Embedder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, RwLock};
use std::thread;
use synapse_core::{CategorizerConfig, WorkerProfiles, UNKNOWN_CATEGORY};

const CATEGORY_SEPARATOR: &str = "+";

/// Exemplar vectors per worker, computed once per categorizer
struct ProfileIndex {
    workers: Vec<(String, Vec<Vec<f32>>)>,
}

impl ProfileIndex {
    fn build(embedder: &dyn Embedder, profiles: &WorkerProfiles) -> Result<Self, EmbedError> {
        let mut workers = Vec::with_capacity(profiles.len());
        for (worker, phrases) in profiles {
            let vectors = phrases
                .iter()
                .filter(|phrase| !phrase.trim().is_empty())
                .map(|phrase| embedder.embed(phrase))
                .collect::<Result<Vec<_>, _>>()?;
            if !vectors.is_empty() {
                workers.push((worker.clone(), vectors));
            }
        }
        Ok(Self { workers })
    }

    fn rank(&self, input: &[f32]) -> Vec<(&str, f32)> {
        let mut scores: Vec<(&str, f32)> = self
            .workers
            .iter()
            .map(|(worker, vectors)| {
                let best = vectors
                    .iter()
                    .map(|v| cosine_similarity(input, v))
                    .fold(f32::NEG_INFINITY, f32::max);
                (worker.as_str(), best)
            })
            .collect();
        scores.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        scores
    }
}

struct Inner {
    embedder: Arc<dyn Embedder>,
    profiles: WorkerProfiles,
    index: RwLock<Option<Arc<ProfileIndex>>>,
    in_flight: AtomicUsize,
}

impl Inner {
    fn profile_index(&self) -> Result<Arc<ProfileIndex>, EmbedError> {
        if let Ok(guard) = self.index.read() {
            if let Some(index) = guard.as_ref() {
                return Ok(Arc::clone(index));
            }
        }
        // A failed build is not cached so the next call retries the provider
        let built = Arc::new(ProfileIndex::build(self.embedder.as_ref(), &self.profiles)?);
        if let Ok(mut guard) = self.index.write() {
            *guard = Some(Arc::clone(&built));
        }
        Ok(built)
    }

    fn classify(&self, text: &str) -> Result<String, EmbedError> {
        let index = self.profile_index()?;
        let input = self.embedder.embed(text)?;

        let mut top: Vec<&str> = index.rank(&input).into_iter().take(2).map(|(w, _)| w).collect();
        if top.is_empty() {
            return Ok(UNKNOWN_CATEGORY.to_string());
        }
        top.sort_unstable();
        Ok(top.join(CATEGORY_SEPARATOR))
    }
}

/// One occupied embedding slot, released on drop even if the provider panics
struct InFlight(Arc<Inner>);

impl InFlight {
    fn acquire(inner: &Arc<Inner>, limit: usize) -> Option<Self> {
        inner
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < limit).then_some(n + 1)
            })
            .ok()?;
        Some(Self(Arc::clone(inner)))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Time-bounded categorizer.
///
/// Identical text always yields the same key for a fixed provider. Any
/// provider failure, or a call slower than the configured timeout, yields
/// `UNKNOWN`. A call that times out keeps its slot until the provider
/// returns; once `max_in_flight` slots are taken, calls answer `UNKNOWN`
/// without starting another thread.
#[derive(Clone)]
pub struct QueryCategorizer {
    inner: Arc<Inner>,
    config: CategorizerConfig,
}

impl QueryCategorizer {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        profiles: WorkerProfiles,
        config: CategorizerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                embedder,
                profiles,
                index: RwLock::new(None),
                in_flight: AtomicUsize::new(0),
            }),
            config,
        }
    }

    pub fn categorize(&self, text: &str) -> String {
        let text: String = text.trim().chars().take(self.config.max_input_chars).collect();
        if text.is_empty() || self.inner.profiles.is_empty() {
            return UNKNOWN_CATEGORY.to_string();
        }

        let Some(slot) = InFlight::acquire(&self.inner, self.config.max_in_flight) else {
            tracing::warn!(
                max_in_flight = self.config.max_in_flight,
                "embedding provider saturated, category unknown"
            );
            return UNKNOWN_CATEGORY.to_string();
        };

        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("synapse-categorize".to_string())
            .spawn(move || {
                let result = slot.0.classify(&text);
                drop(slot);
                // receiver may be gone after a timeout
                let _ = tx.send(result);
            });
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "could not start categorizer thread");
            return UNKNOWN_CATEGORY.to_string();
        }

        match rx.recv_timeout(self.config.timeout()) {
            Ok(Ok(category)) => category,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "embedding unavailable, category unknown");
                UNKNOWN_CATEGORY.to_string()
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    timeout_ms = self.config.timeout_ms,
                    "embedding timed out, category unknown"
                );
                UNKNOWN_CATEGORY.to_string()
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("embedding provider panicked, category unknown");
                UNKNOWN_CATEGORY.to_string()
            }
        }
    }

    pub fn profiles(&self) -> &WorkerProfiles {
        &self.inner.profiles
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Condvar, Mutex};
    use std::time::{Duration, Instant};

    /// One dimension per keyword; text scores on the keywords it contains
    pub(crate) struct KeywordEmbedder {
        pub keywords: Vec<&'static str>,
        pub calls: AtomicUsize,
    }

    impl KeywordEmbedder {
        pub(crate) fn new(keywords: &[&'static str]) -> Self {
            Self {
                keywords: keywords.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Embedder for KeywordEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let lower = text.to_lowercase();
            Ok(self
                .keywords
                .iter()
                .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
                .collect())
        }
    }

    struct SlowEmbedder;

    impl Embedder for SlowEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            thread::sleep(Duration::from_millis(500));
            Ok(vec![1.0])
        }
    }

    /// Blocks every call until `open` is called
    #[derive(Default)]
    struct GatedEmbedder {
        open: Mutex<bool>,
        opened: Condvar,
        calls: AtomicUsize,
    }

    impl GatedEmbedder {
        fn open(&self) {
            *self.open.lock().unwrap() = true;
            self.opened.notify_all();
        }
    }

    impl Embedder for GatedEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut open = self.open.lock().unwrap();
            while !*open {
                open = self.opened.wait(open).unwrap();
            }
            Ok(vec![1.0])
        }
    }

    pub(crate) fn profiles() -> WorkerProfiles {
        let mut profiles = WorkerProfiles::new();
        profiles.insert("CIPHER".to_string(), vec!["bitcoin price".to_string()]);
        profiles.insert("ORACLE".to_string(), vec!["weather forecast".to_string()]);
        profiles.insert(
            "IOLAAX".to_string(),
            vec!["write code".to_string(), "rust compiler".to_string()],
        );
        profiles
    }

    pub(crate) fn keyword_embedder() -> Arc<KeywordEmbedder> {
        Arc::new(KeywordEmbedder::new(&[
            "bitcoin", "price", "weather", "forecast", "code", "rust",
        ]))
    }

    fn categorizer(embedder: Arc<dyn Embedder>) -> QueryCategorizer {
        QueryCategorizer::new(embedder, profiles(), CategorizerConfig::default())
    }

    #[test]
    fn test_top_two_sorted_and_joined() {
        let categorizer = categorizer(keyword_embedder());
        // CIPHER scores highest, then ORACLE via "forecast"
        let category = categorizer.categorize("bitcoin price forecast");
        assert_eq!(category, "CIPHER+ORACLE");
    }

    #[test]
    fn test_deterministic() {
        let categorizer = categorizer(keyword_embedder());
        let a = categorizer.categorize("rust code for the weather");
        let b = categorizer.categorize("rust code for the weather");
        assert_eq!(a, b);
        assert_eq!(a, "IOLAAX+ORACLE");
    }

    #[test]
    fn test_profiles_embedded_once() {
        let embedder = keyword_embedder();
        let categorizer = categorizer(embedder.clone());
        categorizer.categorize("bitcoin");
        categorizer.categorize("weather");
        // four exemplar phrases plus two inputs
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_unavailable_provider_is_unknown() {
        let categorizer = categorizer(Arc::new(crate::UnavailableEmbedder));
        assert_eq!(categorizer.categorize("bitcoin price"), UNKNOWN_CATEGORY);
    }

    #[test]
    fn test_empty_text_is_unknown() {
        let embedder = keyword_embedder();
        let categorizer = categorizer(embedder.clone());
        assert_eq!(categorizer.categorize("   "), UNKNOWN_CATEGORY);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_single_worker_uses_its_id() {
        let mut single = WorkerProfiles::new();
        single.insert("CIPHER".to_string(), vec!["bitcoin".to_string()]);
        let categorizer =
            QueryCategorizer::new(keyword_embedder(), single, CategorizerConfig::default());
        assert_eq!(categorizer.categorize("bitcoin"), "CIPHER");
    }

    #[test]
    fn test_slow_provider_times_out() {
        let config = CategorizerConfig {
            timeout_ms: 50,
            ..CategorizerConfig::default()
        };
        let categorizer = QueryCategorizer::new(Arc::new(SlowEmbedder), profiles(), config);
        let started = std::time::Instant::now();
        assert_eq!(categorizer.categorize("bitcoin"), UNKNOWN_CATEGORY);
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn test_hung_provider_does_not_pile_up_threads() {
        let embedder = Arc::new(GatedEmbedder::default());
        let config = CategorizerConfig {
            timeout_ms: 5,
            max_in_flight: 2,
            ..CategorizerConfig::default()
        };
        let categorizer = QueryCategorizer::new(embedder.clone(), profiles(), config);

        for _ in 0..50 {
            assert_eq!(categorizer.categorize("bitcoin price"), UNKNOWN_CATEGORY);
        }
        // each started thread blocks on its first exemplar
        assert!(embedder.calls.load(Ordering::SeqCst) <= 2);
        assert!(categorizer.in_flight() <= 2);

        embedder.open();
        let deadline = Instant::now() + Duration::from_secs(5);
        while categorizer.in_flight() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(categorizer.in_flight(), 0);
    }

    #[test]
    fn test_slot_released_after_each_call() {
        let categorizer = categorizer(keyword_embedder());
        for _ in 0..3 {
            assert_eq!(categorizer.categorize("bitcoin price forecast"), "CIPHER+ORACLE");
        }
        assert_eq!(categorizer.in_flight(), 0);
    }

    #[test]
    fn test_input_truncated() {
        let config = CategorizerConfig {
            max_input_chars: 7,
            ..CategorizerConfig::default()
        };
        let categorizer = QueryCategorizer::new(keyword_embedder(), profiles(), config);
        // "weather" lies beyond the cut
        let category = categorizer.categorize("bitcoin weather weather");
        assert_eq!(category, categorizer.categorize("bitcoin"));
    }
}
