//! `NodeManager`: owns the authoritative roster and health map, drives the
//! background refresh loop, and answers sampling queries for the HTTP
//! surface.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use catalog::{CatalogClient, Node};
use fleet_config::Settings;
use node_cache::NodeCacheStore;
use rand::seq::SliceRandom;
use session::SessionManager;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::probe::ProbeResult;

/// Reconciliation outcome for one hostname's control channel, as last
/// observed by the refresh loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthState {
    /// The session started (or was already present) and the health check
    /// passed.
    Healthy,
    /// The health check failed and the session was successfully restarted.
    Restarted,
    /// The health check failed and the restart attempt itself failed to
    /// bring the session back to present.
    Error,
}

impl HealthState {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Restarted => "restarted",
            Self::Error => "error",
        }
    }
}

/// Diagnostic snapshot of the most recent probe outcome for a node, keyed by
/// short hostname. Mirrors the original's `last_node_status` dict; not
/// required by any mandatory endpoint, kept for parity and future debug use.
#[derive(Debug, Clone)]
pub struct LastStatus {
    pub status: String,
    pub city: String,
    pub countrycode: String,
    pub asn: String,
    pub continent: String,
    pub company: String,
}

/// The five Node-backed filter fields plus the derived `node` (short
/// hostname) field, usable as `/probe` query filters and `/api/filter-options`
/// keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Node,
    Asn,
    City,
    CountryCode,
    Continent,
    Company,
}

impl FilterField {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Asn => "asn",
            Self::City => "city",
            Self::CountryCode => "countrycode",
            Self::Continent => "continent",
            Self::Company => "company",
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "node" => Some(Self::Node),
            "asn" => Some(Self::Asn),
            "city" => Some(Self::City),
            "countrycode" => Some(Self::CountryCode),
            "continent" => Some(Self::Continent),
            "company" => Some(Self::Company),
            _ => None,
        }
    }

    /// All filter fields, in a stable order (used to enumerate
    /// `/api/filter-options`).
    #[must_use]
    pub fn all() -> [Self; 6] {
        [
            Self::Node,
            Self::Asn,
            Self::City,
            Self::CountryCode,
            Self::Continent,
            Self::Company,
        ]
    }

    fn value_of(self, node: &Node) -> &str {
        match self {
            Self::Node => node.short_hostname(),
            Self::Asn => &node.asn,
            Self::City => &node.city,
            Self::CountryCode => &node.countrycode,
            Self::Continent => &node.continent,
            Self::Company => &node.company,
        }
    }
}

/// `healthy`/`restarted`/`error`/`total` counts over the health map.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthSummary {
    pub healthy: usize,
    pub restarted: usize,
    pub error: usize,
    pub total: usize,
}

/// A consistent snapshot of the health map, for the `/sessions` endpoint.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub summary: HealthSummary,
    pub by_host: HashMap<String, HealthState>,
}

/// Snapshot used by the `/health` endpoint.
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    pub node_cache_size: usize,
    pub sessions_total: usize,
    pub sessions_healthy: usize,
    pub healthy: bool,
}

/// Owns the authoritative roster and health state; drives the background
/// refresh loop.
pub struct NodeManager {
    roster: Mutex<Vec<Node>>,
    health: Mutex<HashMap<String, HealthState>>,
    last_status: Mutex<HashMap<String, LastStatus>>,
    sessions: Arc<SessionManager>,
    catalog: CatalogClient,
    cache: NodeCacheStore,
    config: Arc<Settings>,
    shutting_down: AtomicBool,
    shutdown_notify: Notify,
}

impl NodeManager {
    #[must_use]
    pub fn new(
        config: Arc<Settings>,
        sessions: Arc<SessionManager>,
        catalog: CatalogClient,
        cache: NodeCacheStore,
    ) -> Self {
        Self {
            roster: Mutex::new(Vec::new()),
            health: Mutex::new(HashMap::new()),
            last_status: Mutex::new(HashMap::new()),
            sessions,
            catalog,
            cache,
            config,
            shutting_down: AtomicBool::new(false),
            shutdown_notify: Notify::new(),
        }
    }

    /// Adopt surviving on-disk sockets, publish an authoritative roster
    /// (fresh catalog fetch, falling back to the persisted cache, falling
    /// back to empty), then bring up sessions for every roster hostname in
    /// parallel.
    pub async fn startup_restore(&self) {
        let (recovered, removed) = self.sessions.recover_stale_sockets().await;
        info!(recovered, removed, "stale socket recovery complete");

        let cached_nodes = self.cache.load().await;

        let participants = self.catalog.fetch_participants().await;
        let fresh_nodes = match self.catalog.fetch_nodes_with(&participants).await {
            Ok(nodes) => {
                self.cache.save(&nodes).await;
                info!(
                    count = nodes.len(),
                    participants = participants.len(),
                    "fetched nodes from API during startup"
                );
                Some(nodes)
            }
            Err(e) => {
                warn!(error = %e, "API unavailable during startup");
                None
            }
        };

        let Some(nodes) = fresh_nodes.or(cached_nodes) else {
            warn!("no node list available (API down, no cache) — skipping startup restore");
            return;
        };

        *self.roster.lock().unwrap() = nodes.clone();
        info!(count = nodes.len(), "populated node cache");

        let hostnames: Vec<String> = nodes.iter().map(|n| n.hostname.clone()).collect();
        let health = &self.health;
        self.sessions
            .start_parallel(&hostnames, self.config.startup_max_workers, |hostname, ok| {
                if ok {
                    health
                        .lock()
                        .unwrap()
                        .insert(hostname.to_string(), HealthState::Healthy);
                }
            })
            .await;

        let healthy_count = self
            .health
            .lock()
            .unwrap()
            .values()
            .filter(|s| **s == HealthState::Healthy)
            .count();
        info!(
            healthy = healthy_count,
            total = hostnames.len(),
            "startup restore complete"
        );
    }

    /// Run `startup_restore`, then loop refreshing the roster and
    /// reconciling sessions until `shutdown` is called.
    pub async fn refresh_loop(&self) {
        self.startup_restore().await;

        while !self.shutting_down.load(Ordering::SeqCst) {
            self.refresh_once().await;

            tokio::select! {
                () = tokio::time::sleep(self.config.cache_refresh_interval) => {}
                () = self.shutdown_notify.notified() => {}
            }
        }
    }

    async fn refresh_once(&self) {
        let participants = self.catalog.fetch_participants().await;

        let filtered = match self.catalog.fetch_nodes_with(&participants).await {
            Ok(nodes) => nodes,
            Err(e) => {
                error!(error = %e, "failed to update node cache");
                return;
            }
        };

        self.cache.save(&filtered).await;
        *self.roster.lock().unwrap() = filtered.clone();

        let hostnames: Vec<String> = filtered.iter().map(|n| n.hostname.clone()).collect();
        let checks = hostnames.iter().map(|h| self.check_and_manage(h));
        let chunk_size = self.config.threads.max(1);
        for chunk in to_chunks(checks.collect::<Vec<_>>(), chunk_size) {
            futures::future::join_all(chunk).await;
        }

        let hostname_set: HashSet<&str> = hostnames.iter().map(String::as_str).collect();
        let stale: Vec<String> = {
            let health = self.health.lock().unwrap();
            health
                .keys()
                .filter(|h| !hostname_set.contains(h.as_str()))
                .cloned()
                .collect()
        };
        if !stale.is_empty() {
            self.health.lock().unwrap().retain(|h, _| hostname_set.contains(h.as_str()));
            for host in &stale {
                self.sessions.stop(host).await;
            }
        }

        let healthy_count = self
            .health
            .lock()
            .unwrap()
            .values()
            .filter(|s| **s == HealthState::Healthy)
            .count();
        info!(
            nodes = filtered.len(),
            healthy_sessions = healthy_count,
            "updated node cache"
        );
    }

    /// Start (idempotently) and health-check `hostname`'s session, updating
    /// `HealthState` to reflect the outcome: `Healthy` on a clean check,
    /// `Restarted` if a restart recovered it, `Error` if the restart itself
    /// failed to bring the session back up.
    pub async fn check_and_manage(&self, hostname: &str) {
        self.sessions.start(hostname).await;

        if self.sessions.check(hostname).await {
            self.health
                .lock()
                .unwrap()
                .insert(hostname.to_string(), HealthState::Healthy);
            return;
        }

        warn!(hostname, "SSH health check failed — restarting session");
        self.sessions.stop(hostname).await;
        let restarted = self.sessions.start(hostname).await;

        let state = if restarted {
            HealthState::Restarted
        } else {
            HealthState::Error
        };
        self.health.lock().unwrap().insert(hostname.to_string(), state);
    }

    /// Snapshot of currently-healthy nodes, filtered and (optionally)
    /// limited. See `balanced_sample` for the limited-and-filtered case.
    #[must_use]
    pub fn fetch_healthy(
        &self,
        limit: Option<usize>,
        filters: &HashMap<FilterField, HashSet<String>>,
    ) -> Vec<Node> {
        let roster = self.roster.lock().unwrap().clone();
        let health = self.health.lock().unwrap();

        let mut healthy: Vec<Node> = roster
            .into_iter()
            .filter(|n| health.get(&n.hostname) == Some(&HealthState::Healthy))
            .collect();
        drop(health);

        if !filters.is_empty() {
            healthy.retain(|n| {
                filters.iter().all(|(field, allowed)| {
                    allowed.contains(&field.value_of(n).to_lowercase())
                })
            });
        }

        match limit {
            Some(limit) if limit < healthy.len() => {
                if filters.is_empty() {
                    uniform_sample(healthy, limit)
                } else {
                    balanced_sample(healthy, limit, filters)
                }
            }
            _ => healthy,
        }
    }

    /// Record the outcome of a probe for diagnostics (`/debug`-style
    /// consumers); not required by any mandatory endpoint.
    pub fn record_probe_result(&self, short_hostname: &str, node: &Node, result: &ProbeResult) {
        self.last_status.lock().unwrap().insert(
            short_hostname.to_string(),
            LastStatus {
                status: result.outcome.label().to_string(),
                city: node.city.clone(),
                countrycode: node.countrycode.clone(),
                asn: node.asn.clone(),
                continent: node.continent.clone(),
                company: node.company.clone(),
            },
        );
    }

    /// Signal shutdown and clean up every active session.
    pub async fn shutdown(&self) {
        info!("shutting down, cleaning up SSH sessions");
        self.shutting_down.store(true, Ordering::SeqCst);
        self.shutdown_notify.notify_waiters();
        self.sessions.cleanup().await;
        info!("SSH session cleanup complete");
    }

    #[must_use]
    pub fn snapshot_for_health(&self) -> HealthSnapshot {
        let node_cache_size = self.roster.lock().unwrap().len();
        let health = self.health.lock().unwrap();
        let sessions_total = health.len();
        let sessions_healthy = health.values().filter(|s| **s == HealthState::Healthy).count();
        HealthSnapshot {
            node_cache_size,
            sessions_total,
            sessions_healthy,
            healthy: node_cache_size > 0 && sessions_healthy > 0,
        }
    }

    #[must_use]
    pub fn snapshot_for_sessions(&self) -> SessionSnapshot {
        let health = self.health.lock().unwrap();
        let mut summary = HealthSummary {
            total: health.len(),
            ..HealthSummary::default()
        };
        for state in health.values() {
            match state {
                HealthState::Healthy => summary.healthy += 1,
                HealthState::Restarted => summary.restarted += 1,
                HealthState::Error => summary.error += 1,
            }
        }
        SessionSnapshot {
            summary,
            by_host: health.clone(),
        }
    }

    /// Snapshot of the roster and health map, for `/debug` and
    /// `/api/filter-options` rendering.
    #[must_use]
    pub fn snapshot_roster_and_health(&self) -> (Vec<Node>, HashMap<String, HealthState>) {
        let roster = self.roster.lock().unwrap().clone();
        let health = self.health.lock().unwrap().clone();
        (roster, health)
    }
}

fn to_chunks<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let mut chunks = Vec::new();
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(size).collect());
    }
    chunks
}

fn uniform_sample(mut nodes: Vec<Node>, limit: usize) -> Vec<Node> {
    let mut rng = rand::rng();
    nodes.shuffle(&mut rng);
    nodes.truncate(limit);
    nodes
}

/// Quota-based random sampling across buckets defined by the filter fields
/// that have more than one allowed value ("balance fields"). See §4.2 of the
/// design doc for the full algorithm description.
fn balanced_sample(
    nodes: Vec<Node>,
    limit: usize,
    filters: &HashMap<FilterField, HashSet<String>>,
) -> Vec<Node> {
    let balance_fields: Vec<FilterField> = filters
        .iter()
        .filter(|(_, values)| values.len() > 1)
        .map(|(field, _)| *field)
        .collect();

    if balance_fields.is_empty() {
        return uniform_sample(nodes, limit);
    }

    let mut groups: HashMap<Vec<String>, Vec<Node>> = HashMap::new();
    for node in nodes {
        let key: Vec<String> = balance_fields
            .iter()
            .map(|f| f.value_of(&node).to_lowercase())
            .collect();
        groups.entry(key).or_default().push(node);
    }

    let mut rng = rand::rng();
    let mut group_keys: Vec<Vec<String>> = groups.keys().cloned().collect();
    group_keys.shuffle(&mut rng);

    let num_groups = group_keys.len();
    let base_quota = limit / num_groups;
    let remainder = limit % num_groups;

    let mut result = Vec::new();
    let mut shortfall = 0usize;

    for (i, key) in group_keys.iter().enumerate() {
        let quota = base_quota + usize::from(i < remainder);
        let group = groups.get_mut(key).expect("key came from groups");
        group.shuffle(&mut rng);
        let take = quota.min(group.len());
        result.extend(group.drain(..take));
        shortfall += quota - take;
    }

    if shortfall > 0 {
        let mut remaining: Vec<Node> = groups.into_values().flatten().collect();
        remaining.shuffle(&mut rng);
        remaining.truncate(shortfall);
        result.extend(remaining);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(hostname: &str, continent: &str) -> Node {
        Node {
            hostname: hostname.to_string(),
            asn: "64512".to_string(),
            city: "City".to_string(),
            countrycode: "NL".to_string(),
            continent: continent.to_string(),
            company: "Unknown".to_string(),
        }
    }

    #[test]
    fn filter_field_roundtrips_through_parse() {
        for field in FilterField::all() {
            assert_eq!(FilterField::parse(field.as_str()), Some(field));
        }
        assert_eq!(FilterField::parse("bogus"), None);
    }

    #[test]
    fn uniform_sample_returns_requested_count() {
        let nodes = vec![
            node("a.example", "EU"),
            node("b.example", "EU"),
            node("c.example", "NA"),
        ];
        let sampled = uniform_sample(nodes, 2);
        assert_eq!(sampled.len(), 2);
    }

    #[test]
    fn balanced_sample_splits_across_non_singleton_fields() {
        let nodes = vec![
            node("eu1.example", "EU"),
            node("eu2.example", "EU"),
            node("na1.example", "NA"),
        ];
        let mut allowed = HashSet::new();
        allowed.insert("eu".to_string());
        allowed.insert("na".to_string());
        let mut filters = HashMap::new();
        filters.insert(FilterField::Continent, allowed);

        let sampled = balanced_sample(nodes, 2, &filters);
        assert_eq!(sampled.len(), 2);
        let continents: HashSet<&str> = sampled.iter().map(|n| n.continent.as_str()).collect();
        assert!(continents.contains("EU"));
        assert!(continents.contains("NA"));
    }

    #[test]
    fn balanced_sample_size_is_min_limit_and_filtered_count() {
        let nodes = vec![node("a.example", "EU"), node("b.example", "NA")];
        let mut allowed = HashSet::new();
        allowed.insert("eu".to_string());
        allowed.insert("na".to_string());
        let mut filters = HashMap::new();
        filters.insert(FilterField::Continent, allowed);

        let sampled = balanced_sample(nodes, 10, &filters);
        assert_eq!(sampled.len(), 2);
    }

    #[test]
    fn single_value_filter_has_no_balance_fields_and_samples_uniformly() {
        let nodes = vec![
            node("a.example", "EU"),
            node("b.example", "EU"),
            node("c.example", "EU"),
        ];
        let mut allowed = HashSet::new();
        allowed.insert("eu".to_string());
        let mut filters = HashMap::new();
        filters.insert(FilterField::Continent, allowed);

        let sampled = balanced_sample(nodes, 2, &filters);
        assert_eq!(sampled.len(), 2);
    }

    #[test]
    fn to_chunks_splits_evenly_with_remainder() {
        let chunks = to_chunks(vec![1, 2, 3, 4, 5], 2);
        assert_eq!(chunks, vec![vec![1, 2], vec![3, 4], vec![5]]);
    }
}
