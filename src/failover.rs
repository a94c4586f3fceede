use std::time::Duration;

use serde_json::Value;

use crate::rpc::{HostAttempt, RpcRequest};
use crate::upstream::RpcCaller;

#[derive(Debug)]
pub enum FailoverOutcome {
    Success { host: String, data: Value },
    Exhausted { attempts: Vec<HostAttempt> },
}

pub async fn attempt_all(
    caller: &dyn RpcCaller,
    hosts: &[String],
    request: &RpcRequest,
    timeout: Duration,
) -> FailoverOutcome {
    let mut attempts = Vec::with_capacity(hosts.len());

    for host in hosts {
        match caller.call(host, request, timeout).await {
            Ok(data) => {
                tracing::info!("successful upstream host {} for {}", host, request.method);
                return FailoverOutcome::Success {
                    host: host.clone(),
                    data,
                };
            }
            Err(err) => {
                tracing::warn!("pRPC host {} failed: {}", host, err);
                attempts.push(HostAttempt {
                    host: host.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    if let Some(last) = attempts.last() {
        tracing::error!(
            "all pRPC hosts failed, last error from {}: {}",
            last.host,
            last.error
        );
    }

    FailoverOutcome::Exhausted { attempts }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::upstream::UpstreamError;

    struct ScriptedCaller {
        fail_first: usize,
        calls: AtomicUsize,
    }

    impl ScriptedCaller {
        fn new(fail_first: usize) -> Self {
            Self {
                fail_first,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RpcCaller for ScriptedCaller {
        async fn call(
            &self,
            host: &str,
            _request: &RpcRequest,
            _timeout: Duration,
        ) -> Result<Value, UpstreamError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(UpstreamError::ConnectionFailed(format!("{host} unreachable")))
            } else {
                Ok(json!({"jsonrpc": "2.0", "result": [], "id": "prpc-proxy"}))
            }
        }
    }

    fn hosts(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("http://node{i}:8899")).collect()
    }

    #[tokio::test]
    async fn first_host_success_stops_the_walk() {
        let caller = ScriptedCaller::new(0);
        let request = RpcRequest::gossip_nodes();

        let outcome = attempt_all(&caller, &hosts(3), &request, Duration::from_secs(1)).await;

        match outcome {
            FailoverOutcome::Success { host, .. } => assert_eq!(host, "http://node1:8899"),
            FailoverOutcome::Exhausted { .. } => panic!("expected a success"),
        }
        assert_eq!(caller.calls(), 1);
    }

    #[tokio::test]
    async fn result_is_tagged_with_the_surviving_host() {
        let caller = ScriptedCaller::new(2);
        let request = RpcRequest::gossip_nodes();

        let outcome = attempt_all(&caller, &hosts(4), &request, Duration::from_secs(1)).await;

        match outcome {
            FailoverOutcome::Success { host, data } => {
                assert_eq!(host, "http://node3:8899");
                assert_eq!(data["result"], json!([]));
            }
            FailoverOutcome::Exhausted { .. } => panic!("expected a success"),
        }
        assert_eq!(caller.calls(), 3);
    }

    #[tokio::test]
    async fn exhaustion_records_every_host_in_order() {
        let caller = ScriptedCaller::new(usize::MAX);
        let request = RpcRequest::gossip_nodes();

        let outcome = attempt_all(&caller, &hosts(3), &request, Duration::from_secs(1)).await;

        match outcome {
            FailoverOutcome::Success { .. } => panic!("expected exhaustion"),
            FailoverOutcome::Exhausted { attempts } => {
                assert_eq!(attempts.len(), 3);
                assert_eq!(attempts[0].host, "http://node1:8899");
                assert_eq!(attempts[1].host, "http://node2:8899");
                assert_eq!(attempts[2].host, "http://node3:8899");
                assert!(attempts[0].error.contains("unreachable"));
            }
        }
        assert_eq!(caller.calls(), 3);
    }
}
