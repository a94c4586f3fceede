use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::{json, Value};

use crate::cache::{self, ResponseCache};
use crate::config::{ProxyConfig, UpstreamMode, HEALTH_PROBE_TIMEOUT};
use crate::failover::{attempt_all, FailoverOutcome};
use crate::nodes::{calculate_metrics, normalize_pnode, parse_gossip_nodes};
use crate::rpc::{self, HostAttempt, RpcRequest};
use crate::upstream::HttpCaller;

pub struct AppState {
    pub config: ProxyConfig,
    pub caller: HttpCaller,
    pub cache: ResponseCache,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Self {
        let caller = HttpCaller::new(config.outbound_key());
        let cache = ResponseCache::new(config.cache_ttl, config.cache_capacity);
        Self {
            config,
            caller,
            cache,
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(proxy_health)
        .service(nodes_list)
        .service(node_detail)
        .service(rpc_query)
        .service(rpc_body);
}

enum ServeResult {
    Hit(Value),
    Live { host: String, data: Value },
    Failed(Vec<HostAttempt>),
}

async fn serve(state: &AppState, request: &RpcRequest) -> ServeResult {
    let key = cache::cache_key(&request.method, &request.params);
    let cacheable = cache::cacheable(&request.method);

    if cacheable {
        if let Some(data) = state.cache.get(&key) {
            tracing::info!("cache hit for method {} with key {}", request.method, key);
            return ServeResult::Hit(data);
        }
        tracing::info!("cache missed for method {} with key {}", request.method, key);
    }

    match attempt_all(
        &state.caller,
        state.config.hosts(),
        request,
        state.config.call_timeout,
    )
    .await
    {
        FailoverOutcome::Success { host, data } => {
            let (host, data) = match state.config.mode {
                UpstreamMode::SingleProxy => unwrap_proxy_envelope(&host, data),
                UpstreamMode::MultiHost => (host, data),
            };
            if cacheable {
                state.cache.put(key, data.clone());
            }
            ServeResult::Live { host, data }
        }
        FailoverOutcome::Exhausted { attempts } => ServeResult::Failed(attempts),
    }
}

// the inner proxy answers { ok, host, data }; surface its serving host and payload
fn unwrap_proxy_envelope(proxy_url: &str, mut body: Value) -> (String, Value) {
    let inner_host = body
        .get("host")
        .and_then(Value::as_str)
        .unwrap_or(proxy_url)
        .to_string();

    match body.get_mut("data") {
        Some(data) => (inner_host, data.take()),
        None => (inner_host, body),
    }
}

fn authorized(state: &AppState, req: &HttpRequest) -> bool {
    let provided = req
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());
    state.config.inbound_key_ok(provided)
}

fn unauthorized() -> HttpResponse {
    tracing::warn!("unauthorized request rejected");
    HttpResponse::Unauthorized().json(rpc::error_envelope("Unauthorized"))
}

fn respond(state: &AppState, result: ServeResult) -> HttpResponse {
    match result {
        ServeResult::Hit(data) => {
            HttpResponse::Ok().json(rpc::success_envelope(rpc::CACHE_HOST, &data))
        }
        ServeResult::Live { host, data } => {
            HttpResponse::Ok().json(rpc::success_envelope(&host, &data))
        }
        ServeResult::Failed(attempts) => failure_response(state, &attempts),
    }
}

fn failure_response(state: &AppState, attempts: &[HostAttempt]) -> HttpResponse {
    match state.config.single_proxy_url() {
        Some(proxy_url) => {
            let detail = attempts
                .last()
                .map(|attempt| attempt.error.clone())
                .unwrap_or_default();
            HttpResponse::BadGateway().json(rpc::proxy_failure_envelope(proxy_url, &detail))
        }
        None => HttpResponse::ServiceUnavailable().json(rpc::exhausted_envelope(attempts)),
    }
}

#[derive(Debug, serde::Deserialize)]
struct RpcQuery {
    method: Option<String>,
    params: Option<String>,
}

#[actix_web::get("/")]
async fn rpc_query(
    req: HttpRequest,
    query: web::Query<RpcQuery>,
    data: web::Data<AppState>,
) -> HttpResponse {
    let method = query
        .method
        .clone()
        .unwrap_or_else(|| rpc::DEFAULT_METHOD.to_string());
    let params = match &query.params {
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(params @ Value::Array(_)) => params,
            Ok(_) | Err(_) => {
                return HttpResponse::BadRequest().json(rpc::error_envelope("Invalid params"));
            }
        },
        None => json!([]),
    };

    if !authorized(&data, &req) {
        return unauthorized();
    }

    let request = RpcRequest::new(method, params);
    respond(&data, serve(&data, &request).await)
}

#[actix_web::post("/")]
async fn rpc_body(req: HttpRequest, body: web::Bytes, data: web::Data<AppState>) -> HttpResponse {
    let parsed: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            return HttpResponse::BadRequest().json(rpc::error_envelope("Invalid request body"));
        }
    };

    let request = match RpcRequest::from_body(&parsed) {
        Ok(request) => request,
        Err(reason) => return HttpResponse::BadRequest().json(rpc::error_envelope(&reason)),
    };

    if !authorized(&data, &req) {
        return unauthorized();
    }

    respond(&data, serve(&data, &request).await)
}

#[actix_web::get("/health")]
async fn health(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "hosts": data.config.hosts().len(),
    }))
}

#[actix_web::get("/proxy/health")]
async fn proxy_health(data: web::Data<AppState>) -> HttpResponse {
    let proxy_url = match data.config.single_proxy_url() {
        Some(url) => url,
        None => {
            return HttpResponse::BadRequest()
                .json(rpc::error_envelope("Proxy URL not configured"));
        }
    };

    match data.caller.probe_health(proxy_url, HEALTH_PROBE_TIMEOUT).await {
        Ok(probe) => HttpResponse::Ok().json(json!({
            "ok": true,
            "proxyUrl": proxy_url,
            "upstream": probe,
            "timestamp": rpc::timestamp(),
        })),
        Err(err) => HttpResponse::BadGateway().json(json!({
            "ok": false,
            "error": "Failed to reach proxy health endpoint",
            "proxyUrl": proxy_url,
            "detail": err.to_string(),
            "timestamp": rpc::timestamp(),
        })),
    }
}

#[actix_web::get("/nodes")]
async fn nodes_list(data: web::Data<AppState>) -> HttpResponse {
    let request = RpcRequest::gossip_nodes();
    match serve(&data, &request).await {
        ServeResult::Hit(value) | ServeResult::Live { data: value, .. } => {
            let nodes = parse_gossip_nodes(&value);
            let metrics = calculate_metrics(&nodes);
            HttpResponse::Ok().json(json!({
                "success": true,
                "data": { "nodes": nodes, "metrics": metrics },
                "timestamp": rpc::timestamp(),
            }))
        }
        ServeResult::Failed(_) => nodes_failure(&data, "Failed to fetch nodes"),
    }
}

#[actix_web::get("/nodes/{pubkey}")]
async fn node_detail(path: web::Path<(String,)>, data: web::Data<AppState>) -> HttpResponse {
    let (pubkey,) = path.into_inner();
    if pubkey.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": "pubkey parameter is required",
            "timestamp": rpc::timestamp(),
        }));
    }

    let request = RpcRequest::node_info(&pubkey);
    match serve(&data, &request).await {
        ServeResult::Hit(value) | ServeResult::Live { data: value, .. } => {
            match value.get("result") {
                None | Some(Value::Null) => HttpResponse::NotFound().json(json!({
                    "success": false,
                    "error": format!("Node not found: {pubkey}"),
                    "timestamp": rpc::timestamp(),
                })),
                Some(result) => HttpResponse::Ok().json(json!({
                    "success": true,
                    "data": normalize_pnode(result),
                    "timestamp": rpc::timestamp(),
                })),
            }
        }
        ServeResult::Failed(_) => nodes_failure(&data, "Failed to fetch node details"),
    }
}

fn nodes_failure(state: &AppState, error: &str) -> HttpResponse {
    let body = json!({
        "success": false,
        "error": error,
        "timestamp": rpc::timestamp(),
    });
    match state.config.mode {
        UpstreamMode::SingleProxy => HttpResponse::BadGateway().json(body),
        UpstreamMode::MultiHost => HttpResponse::ServiceUnavailable().json(body),
    }
}
