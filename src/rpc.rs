use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};

pub const DEFAULT_METHOD: &str = "getGossipNodes";
pub const GATEWAY_ID: &str = "prpc-proxy";
pub const CACHE_HOST: &str = "cache";

#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub method: String,
    pub params: Value,
    pub id: Value,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
            id: json!(GATEWAY_ID),
        }
    }

    pub fn gossip_nodes() -> Self {
        Self::new(DEFAULT_METHOD, json!([]))
    }

    pub fn node_info(pubkey: &str) -> Self {
        Self::new("getNodeInfo", json!([pubkey]))
    }

    pub fn from_body(body: &Value) -> Result<Self, String> {
        let obj = match body.as_object() {
            Some(obj) => obj,
            None => return Err("Invalid JSON-RPC body".to_string()),
        };

        let method = match obj.get("method").and_then(Value::as_str) {
            Some(method) if !method.is_empty() => method.to_string(),
            _ => return Err("Invalid JSON-RPC body".to_string()),
        };

        let params = match obj.get("params") {
            None | Some(Value::Null) => json!([]),
            Some(params @ Value::Array(_)) => params.clone(),
            Some(_) => return Err("Invalid params".to_string()),
        };

        let id = obj.get("id").cloned().unwrap_or_else(|| json!(GATEWAY_ID));

        Ok(Self { method, params, id })
    }

    pub fn to_body(&self) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": self.id,
            "method": self.method,
            "params": self.params,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostAttempt {
    pub host: String,
    pub error: String,
}

pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn success_envelope(host: &str, data: &Value) -> Value {
    json!({
        "ok": true,
        "host": host,
        "data": data,
        "timestamp": timestamp(),
    })
}

pub fn error_envelope(error: &str) -> Value {
    json!({
        "ok": false,
        "error": error,
        "timestamp": timestamp(),
    })
}

pub fn proxy_failure_envelope(proxy_url: &str, detail: &str) -> Value {
    json!({
        "ok": false,
        "error": "Failed to contact PRPC proxy",
        "detail": detail,
        "lastHost": proxy_url,
        "timestamp": timestamp(),
    })
}

pub fn exhausted_envelope(attempts: &[HostAttempt]) -> Value {
    json!({
        "ok": false,
        "error": "All pRPC hosts failed",
        "lastHost": attempts.last().map(|attempt| attempt.host.as_str()),
        "attempts": attempts,
        "timestamp": timestamp(),
    })
}
