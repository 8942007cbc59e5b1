use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::catalog::normalize::classify_identifier;
use crate::catalog::store::{PositionCache, StoreError};
use crate::core::position::Resolution;
use crate::core::types::UnresolvedReason;
use crate::utils::validation::is_valid_rsid;

use super::client::{LookupError, LookupService};
use super::retry::{Attempt, RetryPolicy};

/// Settings for [`VariantLocator`]
#[derive(Debug, Clone)]
pub struct LocatorConfig {
    /// Lookups in flight at once
    pub max_concurrency: usize,
    /// Flush the cache after this many completed lookups
    pub checkpoint_every: usize,
    pub retry: RetryPolicy,
    /// Resolve from the cache only
    pub offline: bool,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            checkpoint_every: 20,
            retry: RetryPolicy::default(),
            offline: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorStats {
    /// Distinct identifiers requested
    pub requested: usize,
    pub cache_hits: usize,
    /// Identifiers sent to the lookup service
    pub network_lookups: usize,
    /// Lookup attempts, including retries
    pub attempts: usize,
    pub resolved: usize,
    pub unresolved: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LocateOutput {
    /// One resolution per distinct requested identifier
    pub resolutions: BTreeMap<String, Resolution>,
    pub stats: LocatorStats,
}

/// Resolves identifiers to coordinates, cache first.
///
/// Misses go to the [`LookupService`] on a bounded set of tokio tasks. The
/// task driving [`resolve`](Self::resolve) is the only writer to the cache:
/// workers hand back results and it records them, flushing every
/// `checkpoint_every` completions.
pub struct VariantLocator<S> {
    service: Arc<S>,
    config: LocatorConfig,
}

impl<S: LookupService> VariantLocator<S> {
    pub fn new(service: S, config: LocatorConfig) -> Self {
        Self {
            service: Arc::new(service),
            config,
        }
    }

    /// Resolve every identifier in `ids` exactly once.
    ///
    /// # Errors
    ///
    /// Returns an error only if the cache cannot be written. Lookup failures
    /// are reported as [`Resolution::Unresolved`].
    pub async fn resolve(
        &self,
        ids: &[String],
        cache: &mut PositionCache,
    ) -> Result<LocateOutput, StoreError> {
        let mut output = LocateOutput::default();
        let mut seen = HashSet::new();
        let mut misses = Vec::new();

        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            output.stats.requested += 1;

            if let Some(reason) = classify_identifier(id) {
                warn!(variant_id = %id, "Edge case passed to the locator: {reason}");
                output.insert(Resolution::unresolved(
                    id.clone(),
                    UnresolvedReason::EdgeCase { reason },
                ));
            } else if let Some(cached) = cache.get(id) {
                output.stats.cache_hits += 1;
                output.insert(cached.clone());
            } else if !is_valid_rsid(id) {
                debug!(variant_id = %id, "Not an rs identifier");
                let resolution = Resolution::unresolved(id.clone(), UnresolvedReason::InvalidIdentifier);
                cache.record(resolution.clone());
                output.insert(resolution);
            } else if self.config.offline {
                output.insert(Resolution::unresolved(
                    id.clone(),
                    UnresolvedReason::LookupFailed {
                        detail: "not cached and lookups are disabled".to_string(),
                    },
                ));
            } else {
                misses.push(id.clone());
            }
        }

        if misses.is_empty() {
            debug!(cache_hits = output.stats.cache_hits, "All identifiers served from cache");
        } else {
            info!(
                "Looking up {} identifiers ({} cached)",
                misses.len(),
                output.stats.cache_hits
            );
            self.lookup_misses(misses, cache, &mut output).await?;
        }

        cache.flush()?;
        info!(
            resolved = output.stats.resolved,
            unresolved = output.stats.unresolved,
            "Resolved {}/{} identifiers",
            output.stats.resolved,
            output.stats.requested
        );
        Ok(output)
    }

    async fn lookup_misses(
        &self,
        misses: Vec<String>,
        cache: &mut PositionCache,
        output: &mut LocateOutput,
    ) -> Result<(), StoreError> {
        let total = misses.len();
        let max_concurrency = self.config.max_concurrency.max(1);
        let checkpoint_every = self.config.checkpoint_every.max(1);

        let mut pending = misses.into_iter();
        let mut tasks = JoinSet::new();
        let mut in_flight = HashMap::new();
        let mut completed = 0;

        loop {
            while tasks.len() < max_concurrency {
                let Some(id) = pending.next() else {
                    break;
                };
                let service = Arc::clone(&self.service);
                let retry = self.config.retry.clone();
                let task_id = id.clone();
                let handle = tasks.spawn(async move { resolve_one(&*service, &task_id, &retry).await });
                in_flight.insert(handle.id(), id);
            }

            let Some(joined) = tasks.join_next_with_id().await else {
                break;
            };
            let (resolution, attempts) = match joined {
                Ok((task, result)) => {
                    in_flight.remove(&task);
                    result
                }
                Err(e) => {
                    let id = in_flight.remove(&e.id()).unwrap_or_default();
                    warn!(variant_id = %id, "Lookup task failed: {e}");
                    let detail = format!("lookup task failed: {e}");
                    (
                        Resolution::unresolved(id, UnresolvedReason::LookupFailed { detail }),
                        0,
                    )
                }
            };

            output.stats.network_lookups += 1;
            output.stats.attempts += attempts as usize;
            cache.record(resolution.clone());
            output.insert(resolution);

            completed += 1;
            if completed % checkpoint_every == 0 {
                cache.flush()?;
                info!("  ... {completed}/{total} looked up");
            }
        }

        Ok(())
    }
}

impl LocateOutput {
    fn insert(&mut self, resolution: Resolution) {
        if resolution.as_resolved().is_some() {
            self.stats.resolved += 1;
        } else {
            self.stats.unresolved += 1;
        }
        self.resolutions
            .insert(resolution.variant_id().to_string(), resolution);
    }
}

/// Look up one identifier under the retry policy. Returns the resolution
/// and the number of attempts made.
async fn resolve_one<S: LookupService>(
    service: &S,
    variant_id: &str,
    retry: &RetryPolicy,
) -> (Resolution, u32) {
    let outcome = retry
        .run(|| {
            let lookup = service.lookup(variant_id);
            async move {
                match lookup.await {
                    Ok(position) => Attempt::Ok(position),
                    Err(error) if error.is_transient() => Attempt::Retryable {
                        retry_after: error.retry_after(),
                        error,
                    },
                    Err(error) => Attempt::Permanent(error),
                }
            }
        })
        .await;

    let resolution = match outcome.result {
        Ok(position) => {
            debug!(
                variant_id,
                "{}:{} {}>{}",
                position.contig,
                position.position,
                position.reference_allele,
                position.alternate_alleles.join(",")
            );
            Resolution::Resolved(position)
        }
        Err(LookupError::NotFound) => {
            warn!(variant_id, "Not found in dbSNP");
            Resolution::unresolved(variant_id, UnresolvedReason::NotFound)
        }
        Err(LookupError::InvalidIdentifier(_)) => {
            Resolution::unresolved(variant_id, UnresolvedReason::InvalidIdentifier)
        }
        Err(error) => {
            warn!(variant_id, attempts = outcome.attempts, "Lookup failed: {error}");
            Resolution::unresolved(
                variant_id,
                UnresolvedReason::LookupFailed {
                    detail: error.to_string(),
                },
            )
        }
    };

    (resolution, outcome.attempts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::catalog::store::POSITION_CACHE_FILE;
    use crate::core::position::ResolvedPosition;
    use crate::core::types::Assembly;

    /// Lookup service that replays scripted responses per identifier.
    /// Identifiers without a script resolve to chr1 at their rs number.
    #[derive(Default)]
    struct ScriptedService {
        scripts: Mutex<HashMap<String, VecDeque<Result<ResolvedPosition, LookupError>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedService {
        fn script(self, id: &str, responses: Vec<Result<ResolvedPosition, LookupError>>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(id.to_string(), responses.into());
            self
        }
    }

    fn position(id: &str) -> ResolvedPosition {
        let number = crate::utils::validation::parse_rsid_number(id).unwrap();
        ResolvedPosition {
            variant_id: id.to_string(),
            contig: "chr1".to_string(),
            position: number,
            reference_allele: "A".to_string(),
            alternate_alleles: vec!["G".to_string()],
            assembly_build: Assembly::Grch38,
            accession: Some("NC_000001.11".to_string()),
        }
    }

    impl LookupService for ScriptedService {
        async fn lookup(&self, variant_id: &str) -> Result<ResolvedPosition, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let scripted = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(variant_id)
                .and_then(VecDeque::pop_front);
            scripted.unwrap_or_else(|| Ok(position(variant_id)))
        }
    }

    /// Lookup service that tracks how many lookups are in flight at once
    #[derive(Default)]
    struct GaugedService {
        in_flight: AtomicUsize,
        peak: Arc<AtomicUsize>,
    }

    impl LookupService for GaugedService {
        async fn lookup(&self, variant_id: &str) -> Result<ResolvedPosition, LookupError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(position(variant_id))
        }
    }

    fn config() -> LocatorConfig {
        LocatorConfig {
            max_concurrency: 3,
            checkpoint_every: 2,
            retry: RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(1),
                multiplier: 2.0,
                max_backoff: Duration::from_millis(2),
            },
            offline: false,
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn unavailable() -> LookupError {
        LookupError::Http {
            status: 503,
            retry_after: None,
        }
    }

    #[tokio::test]
    async fn test_every_identifier_resolved_once() {
        let service = ScriptedService::default();
        let calls = Arc::clone(&service.calls);
        let locator = VariantLocator::new(service, config());
        let mut cache = PositionCache::in_memory();

        let requested = ids(&["rs1", "rs2", "rs3", "rs2", "rs4", "rs5"]);
        let out = locator.resolve(&requested, &mut cache).await.unwrap();

        assert_eq!(out.resolutions.len(), 5);
        assert_eq!(out.stats.requested, 5);
        assert_eq!(out.stats.resolved, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(out.resolutions["rs3"].as_resolved().unwrap().position, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_lookups_bounded_by_max_concurrency() {
        let service = GaugedService::default();
        let peak = Arc::clone(&service.peak);
        let locator = VariantLocator::new(service, config());
        let mut cache = PositionCache::in_memory();

        let requested: Vec<String> = (1..=12).map(|n| format!("rs{n}")).collect();
        let out = locator.resolve(&requested, &mut cache).await.unwrap();

        assert_eq!(out.stats.resolved, 12);
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak >= 1);
        assert!(peak <= config().max_concurrency, "peak {peak} lookups in flight");
    }

    #[tokio::test]
    async fn test_warm_cache_makes_no_lookups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(POSITION_CACHE_FILE);
        let requested = ids(&["rs4680", "rs6265", "rs1801133"]);

        let first = VariantLocator::new(ScriptedService::default(), config());
        let mut cache = PositionCache::load(&path).unwrap();
        let cold = first.resolve(&requested, &mut cache).await.unwrap();
        assert_eq!(cold.stats.network_lookups, 3);

        let service = ScriptedService::default();
        let calls = Arc::clone(&service.calls);
        let second = VariantLocator::new(service, config());
        let mut cache = PositionCache::load(&path).unwrap();
        let warm = second.resolve(&requested, &mut cache).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(warm.stats.cache_hits, 3);
        assert_eq!(warm.resolutions, cold.resolutions);
    }

    #[tokio::test]
    async fn test_transient_failures_retried() {
        let service = ScriptedService::default()
            .script("rs7", vec![Err(unavailable()), Err(LookupError::Timeout)]);
        let locator = VariantLocator::new(service, config());
        let mut cache = PositionCache::in_memory();

        let out = locator.resolve(&ids(&["rs7"]), &mut cache).await.unwrap();
        assert!(out.resolutions["rs7"].as_resolved().is_some());
        assert_eq!(out.stats.attempts, 3);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_is_lookup_failed_and_not_cached() {
        let service = ScriptedService::default().script(
            "rs8",
            vec![Err(unavailable()), Err(unavailable()), Err(unavailable())],
        );
        let locator = VariantLocator::new(service, config());
        let mut cache = PositionCache::in_memory();

        let out = locator.resolve(&ids(&["rs8"]), &mut cache).await.unwrap();
        assert!(matches!(
            out.resolutions["rs8"].unresolved_reason(),
            Some(UnresolvedReason::LookupFailed { .. })
        ));
        assert!(cache.get("rs8").is_none());
    }

    #[tokio::test]
    async fn test_not_found_cached_as_negative() {
        let service = ScriptedService::default().script("rs9", vec![Err(LookupError::NotFound)]);
        let calls = Arc::clone(&service.calls);
        let locator = VariantLocator::new(service, config());
        let mut cache = PositionCache::in_memory();

        let out = locator.resolve(&ids(&["rs9"]), &mut cache).await.unwrap();
        assert_eq!(
            out.resolutions["rs9"].unresolved_reason(),
            Some(&UnresolvedReason::NotFound)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Second run is answered from the negative entry
        locator.resolve(&ids(&["rs9"]), &mut cache).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_and_edge_case_identifiers_skip_service() {
        let service = ScriptedService::default();
        let calls = Arc::clone(&service.calls);
        let locator = VariantLocator::new(service, config());
        let mut cache = PositionCache::in_memory();

        let out = locator
            .resolve(&ids(&["i3003137", "Null", "rs28363170"]), &mut cache)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            out.resolutions["i3003137"].unresolved_reason(),
            Some(&UnresolvedReason::InvalidIdentifier)
        );
        assert!(matches!(
            out.resolutions["Null"].unresolved_reason(),
            Some(UnresolvedReason::EdgeCase { .. })
        ));
        assert!(matches!(
            out.resolutions["rs28363170"].unresolved_reason(),
            Some(UnresolvedReason::EdgeCase { .. })
        ));
    }

    #[tokio::test]
    async fn test_offline_mode() {
        let service = ScriptedService::default();
        let calls = Arc::clone(&service.calls);
        let locator = VariantLocator::new(
            service,
            LocatorConfig {
                offline: true,
                ..config()
            },
        );
        let mut cache = PositionCache::in_memory();
        cache.record(Resolution::Resolved(position("rs1")));

        let out = locator.resolve(&ids(&["rs1", "rs2"]), &mut cache).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(out.resolutions["rs1"].as_resolved().is_some());
        assert!(matches!(
            out.resolutions["rs2"].unresolved_reason(),
            Some(UnresolvedReason::LookupFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_checkpoints_flush_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(POSITION_CACHE_FILE);
        let locator = VariantLocator::new(ScriptedService::default(), config());
        let mut cache = PositionCache::load(&path).unwrap();

        let requested: Vec<String> = (1..=7).map(|n| format!("rs{n}")).collect();
        locator.resolve(&requested, &mut cache).await.unwrap();

        assert_eq!(PositionCache::load(&path).unwrap().len(), 7);
    }
}
