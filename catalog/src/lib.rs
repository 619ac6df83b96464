//! Catalog client: fetches the active-node roster and participant directory
//! from the upstream NLNOG-style ring API and normalizes both into internal
//! records.
//!
//! Two collaborators live here because they're inseparable in practice: the
//! `Node` record produced by normalization, and the `CatalogClient` that
//! fetches and builds it. Both `node_cache` and `fleet_core` depend on `Node`.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// A single measurement node, normalized from the upstream catalog.
///
/// Immutable once built: a roster refresh replaces the whole collection
/// rather than mutating individual records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Fully-qualified hostname; the unique identifier for this node.
    pub hostname: String,
    /// Autonomous system number, string form.
    pub asn: String,
    pub city: String,
    /// Upper-cased ISO-3166 alpha-2 country code.
    pub countrycode: String,
    /// Continent name, derived via `geo::continent`.
    pub continent: String,
    /// Participant organisation name, or `"Unknown"` if unresolved.
    pub company: String,
}

impl Node {
    /// Substring of `hostname` before the first `.`, used as the `node`
    /// filter field and for display.
    #[must_use]
    pub fn short_hostname(&self) -> &str {
        self.hostname.split('.').next().unwrap_or(&self.hostname)
    }
}

#[derive(Debug, Deserialize)]
struct RawNodesEnvelope {
    results: RawNodesResults,
}

#[derive(Debug, Deserialize)]
struct RawNodesResults {
    nodes: Vec<RawNode>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    hostname: String,
    asn: i64,
    city: String,
    countrycode: String,
    alive_ipv4: bool,
    alive_ipv6: bool,
    participant: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawParticipantsEnvelope {
    results: RawParticipantsResults,
}

#[derive(Debug, Deserialize)]
struct RawParticipantsResults {
    participants: Vec<RawParticipant>,
}

#[derive(Debug, Deserialize)]
struct RawParticipant {
    id: i64,
    company: String,
}

/// Failures fetching or decoding catalog responses.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// HTTP client for the upstream catalog.
pub struct CatalogClient {
    http: reqwest::Client,
    nodes_url: String,
    participants_url: String,
    timeout: Duration,
}

impl CatalogClient {
    /// Build a client. Panics only if the underlying `reqwest::Client` fails
    /// to construct, which happens only for invalid static TLS config.
    #[must_use]
    pub fn new(nodes_url: String, participants_url: String, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            nodes_url,
            participants_url,
            timeout,
        }
    }

    /// Fetch the participant directory as `{participant_id: company}`.
    ///
    /// Tolerant by design: the original ring exporter treats a participants
    /// fetch failure as "no enrichment" rather than aborting the whole
    /// refresh, so this returns an empty map (with a warning logged) instead
    /// of propagating the error.
    pub async fn fetch_participants(&self) -> HashMap<i64, String> {
        match self.fetch_participants_inner().await {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, "failed to fetch participants");
                HashMap::new()
            }
        }
    }

    async fn fetch_participants_inner(&self) -> Result<HashMap<i64, String>, CatalogError> {
        let envelope: RawParticipantsEnvelope = self
            .http
            .get(&self.participants_url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| CatalogError::Request {
                url: self.participants_url.clone(),
                source,
            })?
            .json()
            .await
            .map_err(|source| CatalogError::Decode {
                url: self.participants_url.clone(),
                source,
            })?;

        Ok(envelope
            .results
            .participants
            .into_iter()
            .map(|p| (p.id, p.company))
            .collect())
    }

    /// Fetch the raw active-node list and normalize it against an
    /// already-fetched `participants` map. Propagates failure: callers
    /// decide whether to fall back to a cached roster. Kept separate from
    /// `fetch_participants` so a refresh loop can fetch each independently
    /// and apply its own tolerance policy per §4.2 of the design doc.
    pub async fn fetch_nodes_with(
        &self,
        participants: &HashMap<i64, String>,
    ) -> Result<Vec<Node>, CatalogError> {
        let envelope: RawNodesEnvelope = self
            .http
            .get(&self.nodes_url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| CatalogError::Request {
                url: self.nodes_url.clone(),
                source,
            })?
            .json()
            .await
            .map_err(|source| CatalogError::Decode {
                url: self.nodes_url.clone(),
                source,
            })?;

        Ok(normalize(envelope.results.nodes, participants))
    }

    /// Convenience wrapper: fetch the participant directory, then the node
    /// list, normalizing against it.
    pub async fn fetch_nodes(&self) -> Result<Vec<Node>, CatalogError> {
        let participants = self.fetch_participants().await;
        self.fetch_nodes_with(&participants).await
    }
}

/// Transform raw catalog records into `Node`s, dropping any that aren't
/// dual-stack alive.
fn normalize(raw_nodes: Vec<RawNode>, participants: &HashMap<i64, String>) -> Vec<Node> {
    raw_nodes
        .into_iter()
        .filter(|n| n.alive_ipv4 && n.alive_ipv6)
        .map(|n| {
            let countrycode = n.countrycode.to_uppercase();
            let continent = geo::continent(&countrycode).to_string();
            let company = n
                .participant
                .and_then(|id| participants.get(&id).cloned())
                .unwrap_or_else(|| "Unknown".to_string());
            Node {
                hostname: n.hostname,
                asn: n.asn.to_string(),
                city: n.city,
                countrycode,
                continent,
                company,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(hostname: &str, v4: bool, v6: bool, participant: Option<i64>) -> RawNode {
        RawNode {
            hostname: hostname.to_string(),
            asn: 64512,
            city: "Amsterdam".to_string(),
            countrycode: "nl".to_string(),
            alive_ipv4: v4,
            alive_ipv6: v6,
            participant,
        }
    }

    #[test]
    fn drops_nodes_missing_either_liveness_flag() {
        let raws = vec![
            raw("a.example", true, true, None),
            raw("b.example", true, false, None),
            raw("c.example", false, true, None),
        ];
        let nodes = normalize(raws, &HashMap::new());
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].hostname, "a.example");
    }

    #[test]
    fn uppercases_countrycode_and_derives_continent() {
        let nodes = normalize(vec![raw("a.example", true, true, None)], &HashMap::new());
        assert_eq!(nodes[0].countrycode, "NL");
        assert_eq!(nodes[0].continent, "Europe");
    }

    #[test]
    fn resolves_company_from_participant_id_else_unknown() {
        let mut participants = HashMap::new();
        participants.insert(7, "Example Corp".to_string());

        let nodes = normalize(
            vec![
                raw("a.example", true, true, Some(7)),
                raw("b.example", true, true, Some(99)),
                raw("c.example", true, true, None),
            ],
            &participants,
        );
        assert_eq!(nodes[0].company, "Example Corp");
        assert_eq!(nodes[1].company, "Unknown");
        assert_eq!(nodes[2].company, "Unknown");
    }

    #[test]
    fn short_hostname_is_substring_before_first_dot() {
        let node = Node {
            hostname: "ams01.ring.nlnog.net".to_string(),
            asn: "64512".to_string(),
            city: "Amsterdam".to_string(),
            countrycode: "NL".to_string(),
            continent: "Europe".to_string(),
            company: "Unknown".to_string(),
        };
        assert_eq!(node.short_hostname(), "ams01");
    }
}
