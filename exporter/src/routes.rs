//! Route handlers: translate HTTP requests into calls on `NodeManager` and
//! `ProbeExecutor`, rendering Prometheus text or JSON.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use fleet_core::{sanitize_target, FilterField, ProbeOutcome};
use serde_json::{json, Value};

use crate::metrics::{metrics, Route};
use crate::state::AppState;

pub async fn index() -> Html<String> {
    metrics().record_route(Route::Index);

    let fields = FilterField::all()
        .iter()
        .map(|f| format!("<li>{}</li>", f.as_str()))
        .collect::<String>();

    Html(format!(
        "<html><head><title>NLNOG Ring Exporter</title></head><body>\
         <h1>NLNOG Ring Prometheus Exporter</h1>\
         <p>Probe a target with <code>/probe?target=HOST_OR_IP</code>.</p>\
         <p>Filterable fields:</p><ul>{fields}</ul>\
         </body></html>"
    ))
}

pub async fn filter_options(State(state): State<AppState>) -> Json<Value> {
    metrics().record_route(Route::FilterOptions);

    let (roster, health) = state.node_manager.snapshot_roster_and_health();
    let healthy: Vec<_> = roster
        .into_iter()
        .filter(|n| health.get(&n.hostname) == Some(&fleet_core::HealthState::Healthy))
        .collect();

    let mut options: HashMap<&str, std::collections::BTreeSet<String>> = HashMap::new();
    for field in FilterField::all() {
        options.entry(field.as_str()).or_default();
    }
    for node in &healthy {
        for field in FilterField::all() {
            let value = match field {
                FilterField::Node => node.short_hostname(),
                FilterField::Asn => &node.asn,
                FilterField::City => &node.city,
                FilterField::CountryCode => &node.countrycode,
                FilterField::Continent => &node.continent,
                FilterField::Company => &node.company,
            };
            if !value.is_empty() {
                options.entry(field.as_str()).or_default().insert(value.to_string());
            }
        }
    }

    let mut result: HashMap<&str, Vec<String>> = HashMap::new();
    for (field, values) in &options {
        result.insert(field, values.iter().cloned().collect());
    }

    let country_names: HashMap<String, String> = options
        .get("countrycode")
        .into_iter()
        .flatten()
        .map(|cc| (cc.clone(), geo::country_name(cc)))
        .collect();

    let mut body = serde_json::to_value(&result).unwrap_or_else(|_| json!({}));
    body["countryNames"] = json!(country_names);
    Json(body)
}

pub async fn health(State(state): State<AppState>) -> Response {
    metrics().record_route(Route::Health);
    let snapshot = state.node_manager.snapshot_for_health();

    let body = json!({
        "node_cache_size": snapshot.node_cache_size,
        "sessions_total": snapshot.sessions_total,
        "sessions_healthy": snapshot.sessions_healthy,
        "status": if snapshot.healthy { "healthy" } else { "unhealthy" },
    });

    let status = if snapshot.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}

pub async fn sessions(State(state): State<AppState>) -> Json<Value> {
    metrics().record_route(Route::Sessions);
    let snapshot = state.node_manager.snapshot_for_sessions();

    let nodes: HashMap<String, &str> = snapshot
        .by_host
        .iter()
        .map(|(host, state)| (host.clone(), state.label()))
        .collect();

    Json(json!({
        "summary": {
            "healthy": snapshot.summary.healthy,
            "restarted": snapshot.summary.restarted,
            "error": snapshot.summary.error,
            "total": snapshot.summary.total,
        },
        "nodes": nodes,
    }))
}

pub async fn debug(State(state): State<AppState>) -> impl IntoResponse {
    metrics().record_route(Route::Debug);
    let (roster, health) = state.node_manager.snapshot_roster_and_health();

    let mut grouped: HashMap<&'static str, Vec<(String, catalog::Node)>> = HashMap::new();
    for node in roster {
        let status = health
            .get(&node.hostname)
            .map_or("unknown", |s| s.label());
        grouped
            .entry(status)
            .or_default()
            .push((node.short_hostname().to_string(), node));
    }

    let order = ["healthy", "restarted", "error", "unknown"];
    let mut lines = Vec::new();
    for status in order {
        let Some(entries) = grouped.get_mut(status) else {
            continue;
        };
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        lines.push(format!("=== {status} ({}) ===", entries.len()));
        for (short, node) in entries.iter() {
            lines.push(format!(
                "{short:<30} [{}, {}, {}, ASN {}, {}]",
                node.company,
                node.city,
                geo::country_name(&node.countrycode),
                node.asn,
                node.continent,
            ));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

pub async fn internal_metrics() -> impl IntoResponse {
    metrics().render()
}

pub async fn probe(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    metrics().record_route(Route::Probe);

    let Some(raw_target) = params.get("target") else {
        return (StatusCode::BAD_REQUEST, "Missing target parameter").into_response();
    };
    let target = sanitize_target(raw_target);

    if !fleet_core::is_valid_target(&target).await {
        return (StatusCode::BAD_REQUEST, "Invalid target IP or hostname").into_response();
    }

    let limit = match params.get("limit") {
        None => None,
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) => Some(n),
            Err(_) => return (StatusCode::BAD_REQUEST, "Invalid limit parameter").into_response(),
        },
    };

    let mut filters: HashMap<FilterField, HashSet<String>> = HashMap::new();
    for field in FilterField::all() {
        if let Some(raw) = params.get(field.as_str()) {
            let values: HashSet<String> = raw
                .split(',')
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect();
            if !values.is_empty() {
                filters.insert(field, values);
            }
        }
    }

    let json_format = params.get("format").map(String::as_str) == Some("json");
    let nodes = state.node_manager.fetch_healthy(limit, &filters);

    if nodes.is_empty() {
        let message = "No nodes with healthy SSH sessions available.";
        return if json_format {
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": message }))).into_response()
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, format!("{message}\n")).into_response()
        };
    }

    let semaphore = Arc::new(tokio::sync::Semaphore::new(state.config.threads.max(1)));
    let tasks = nodes.into_iter().map(|node| {
        let semaphore = semaphore.clone();
        let target = target.clone();
        let probe_executor = state.probe_executor.clone();
        let node_manager = state.node_manager.clone();
        async move {
            let _permit = semaphore.acquire().await.expect("semaphore not closed");
            let result = probe_executor.ping(&node.hostname, &target).await;
            metrics().record_probe_outcome(result.outcome);
            node_manager.record_probe_result(node.short_hostname(), &node, &result);
            (node, result)
        }
    });
    let results = futures::future::join_all(tasks).await;

    if json_format {
        let json_results: Vec<Value> = results
            .iter()
            .map(|(node, result)| {
                json!({
                    "node": node.short_hostname(),
                    "target": target,
                    "asn": node.asn,
                    "city": node.city,
                    "countrycode": node.countrycode,
                    "continent": node.continent,
                    "company": node.company,
                    "status": result.outcome.label(),
                    "rtt_min": result.stats.map(|s| s.min),
                    "rtt_avg": result.stats.map(|s| s.avg),
                    "rtt_max": result.stats.map(|s| s.max),
                    "rtt_mdev": result.stats.map(|s| s.mdev),
                })
            })
            .collect();
        return Json(json!({ "results": json_results })).into_response();
    }

    render_prometheus(&target, &results).into_response()
}

fn escape_label(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn render_prometheus(target: &str, results: &[(catalog::Node, fleet_core::ProbeResult)]) -> String {
    let mut out = String::new();

    let gauges: &[(&str, &str)] = &[
        ("nlnog_ping_rtt_min_ms", "Min RTT in ms"),
        ("nlnog_ping_rtt_avg_ms", "Avg RTT in ms"),
        ("nlnog_ping_rtt_max_ms", "Max RTT in ms"),
        ("nlnog_ping_rtt_mdev_ms", "Mdev RTT in ms"),
        ("nlnog_ping_success", "Ping success (1) or failure (0)"),
    ];
    for (name, help) in gauges {
        out.push_str(&format!("# HELP {name} {help}\n# TYPE {name} gauge\n"));
        for (node, result) in results {
            let labels = format!(
                "node=\"{}\",target=\"{}\",asn=\"{}\",city=\"{}\",countrycode=\"{}\",status=\"{}\",continent=\"{}\",company=\"{}\"",
                escape_label(node.short_hostname()),
                escape_label(target),
                escape_label(&node.asn),
                escape_label(&node.city),
                escape_label(&node.countrycode),
                escape_label(result.outcome.label()),
                escape_label(&node.continent),
                escape_label(&node.company),
            );

            let value = match (*name, result.outcome, result.stats) {
                ("nlnog_ping_success", outcome, _) => {
                    Some(if outcome == ProbeOutcome::Ok { 1.0 } else { 0.0 })
                }
                (_, ProbeOutcome::Ok, Some(stats)) => match *name {
                    "nlnog_ping_rtt_min_ms" => Some(stats.min),
                    "nlnog_ping_rtt_avg_ms" => Some(stats.avg),
                    "nlnog_ping_rtt_max_ms" => Some(stats.max),
                    "nlnog_ping_rtt_mdev_ms" => Some(stats.mdev),
                    _ => None,
                },
                _ => None,
            };

            if let Some(value) = value {
                out.push_str(&format!("{name}{{{labels}}} {value}\n"));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::Node;
    use fleet_core::{ProbeOutcome, ProbeResult, RttStats};

    fn node() -> Node {
        Node {
            hostname: "ams01.ring.nlnog.net".to_string(),
            asn: "64512".to_string(),
            city: "Amsterdam".to_string(),
            countrycode: "NL".to_string(),
            continent: "Europe".to_string(),
            company: "Example".to_string(),
        }
    }

    #[test]
    fn render_prometheus_includes_success_for_every_result() {
        let result = ProbeResult {
            hostname: "ams01.ring.nlnog.net".to_string(),
            outcome: ProbeOutcome::Ok,
            stats: Some(RttStats { min: 1.0, avg: 2.0, max: 3.0, mdev: 0.5 }),
        };
        let text = render_prometheus("1.1.1.1", &[(node(), result)]);
        assert!(text.contains("nlnog_ping_success{"));
        assert!(text.contains("nlnog_ping_rtt_avg_ms{"));
        assert!(text.contains("} 2"));
    }

    #[test]
    fn render_prometheus_omits_rtt_gauges_on_failure() {
        let result = ProbeResult {
            hostname: "ams01.ring.nlnog.net".to_string(),
            outcome: ProbeOutcome::PingError,
            stats: None,
        };
        let text = render_prometheus("1.1.1.1", &[(node(), result)]);
        assert!(!text.contains("nlnog_ping_rtt_min_ms{"));
        assert!(text.contains("nlnog_ping_success{"));
    }

    #[test]
    fn escape_label_handles_quotes_and_backslashes() {
        assert_eq!(escape_label(r#"a"b\c"#), r#"a\"b\\c"#);
    }
}
