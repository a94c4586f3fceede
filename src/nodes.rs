use serde::Serialize;
use serde_json::Value;

use crate::rpc::timestamp;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PNode {
    pub pubkey: String,
    pub gossip_address: String,
    pub version: String,
    pub latency: f64,
    pub online_status: String,
    pub last_seen: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMetrics {
    pub total_nodes: usize,
    pub online_nodes: usize,
    pub offline_nodes: usize,
    pub average_latency: u64,
    pub highest_latency: f64,
    pub lowest_latency: f64,
}

pub fn normalize_pnode(raw: &Value) -> PNode {
    // a record reporting no raw pubkey never counts as online
    let online = raw.get("online_status").and_then(Value::as_bool) != Some(false)
        && raw
            .get("pubkey")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty());

    PNode {
        pubkey: str_field(raw, &["pubkey", "identity", "id"]),
        gossip_address: str_field(raw, &["gossip", "gossip_address", "address"]),
        version: str_field(raw, &["version"]),
        latency: raw.get("latency").and_then(Value::as_f64).unwrap_or(0.0),
        online_status: if online { "online" } else { "offline" }.to_string(),
        last_seen: seen_field(raw),
    }
}

pub fn parse_gossip_nodes(data: &Value) -> Vec<PNode> {
    match data.get("result").and_then(Value::as_array) {
        Some(entries) => entries.iter().map(normalize_pnode).collect(),
        None => {
            tracing::warn!("gossip response carried no node array");
            Vec::new()
        }
    }
}

pub fn calculate_metrics(nodes: &[PNode]) -> NodeMetrics {
    let online: Vec<&PNode> = nodes
        .iter()
        .filter(|node| node.online_status == "online")
        .collect();
    let latencies: Vec<f64> = online
        .iter()
        .map(|node| node.latency)
        .filter(|latency| *latency > 0.0)
        .collect();

    let average = if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<f64>() / latencies.len() as f64
    };

    NodeMetrics {
        total_nodes: nodes.len(),
        online_nodes: online.len(),
        offline_nodes: nodes.len() - online.len(),
        average_latency: average.round() as u64,
        highest_latency: latencies.iter().copied().fold(0.0, f64::max),
        lowest_latency: latencies.iter().copied().reduce(f64::min).unwrap_or(0.0),
    }
}

fn str_field(raw: &Value, names: &[&str]) -> String {
    names
        .iter()
        .filter_map(|name| raw.get(*name).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_default()
}

fn seen_field(raw: &Value) -> Value {
    ["lastSeen", "timestamp", "last_seen"]
        .iter()
        .filter_map(|name| raw.get(*name))
        .find(|value| match value {
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => n.as_f64() != Some(0.0),
            _ => false,
        })
        .cloned()
        .unwrap_or_else(|| Value::String(timestamp()))
}
