//! etcd v3 gRPC backend.
//!
//! Speaks the `etcdserverpb.KV` service over a tonic [`Channel`] using the
//! hand-written messages in [`super::proto`]. The channel is pinned to the
//! first endpoint that answers a probe during [`EtcdBackend::connect`].
//!
//! Connectivity state is tracked from call results:
//!
//! ```text
//!   connect ok + probe answered ──▶ READY
//!   Unavailable / ready() failed ──▶ TRANSIENT_FAILURE
//!   any server answer            ──▶ READY
//!   refresh_state (not READY)    ──▶ probe ──▶ READY | TRANSIENT_FAILURE
//! ```
//!
//! tonic reconnects the channel on the next call after a connect error, so a
//! probe is enough to leave `TRANSIENT_FAILURE` once the member is back.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic::{Code, Status};

use super::backend::{ConnState, KvBackend, StateCell};
use super::proto;
use crate::codec::KEY_PREFIX;
use crate::connection::ConnectionSettings;
use crate::core::error::{ConnError, ConnResult, StoreError, StoreOp, StoreResult};

/// Key read by the connectivity probe. Its value is ignored.
const PROBE_KEY: &str = KEY_PREFIX;

/// Prefix endpoints that carry no scheme with `https://`.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    }
}

/// Parse `uri` and attach the connect timeout and TLS settings.
///
/// A TLS failure is a certificate problem, anything else is an endpoint
/// problem.
fn build_endpoint(
    uri: &str,
    connect_timeout: Duration,
    tls: Option<&ClientTlsConfig>,
    cert_dir: &Path,
) -> ConnResult<Endpoint> {
    let endpoint = Endpoint::from_shared(uri.to_string())
        .map_err(|e| ConnError::dial(&[uri.to_string()], e.to_string()))?
        .connect_timeout(connect_timeout);
    match tls {
        Some(tls) => endpoint
            .tls_config(tls.clone())
            .map_err(|e| ConnError::cert_load(cert_dir, e.to_string())),
        None => Ok(endpoint),
    }
}

/// etcd KV client over a single tonic channel.
#[derive(Debug)]
pub struct EtcdBackend {
    channel: Channel,
    endpoint: String,
    state: StateCell,
    probe_timeout: Duration,
}

impl EtcdBackend {
    /// Dial the configured endpoints in order.
    ///
    /// `tls` is `None` only for plaintext `http://` endpoints. The attempt
    /// across all endpoints is bounded by `settings.dial_timeout`; each
    /// endpoint gets an equal share of what is left when its turn comes, so a
    /// member that drops packets cannot starve the ones after it.
    ///
    /// An endpoint is accepted only once it answers a `Range` probe. tonic's
    /// `connect` resolves as soon as the socket is up, which says nothing
    /// about the peer being an etcd member.
    pub async fn connect(
        settings: &ConnectionSettings,
        tls: Option<ClientTlsConfig>,
    ) -> ConnResult<Self> {
        let endpoints = &settings.endpoints;
        if endpoints.is_empty() {
            return Err(ConnError::dial(endpoints, "no endpoints configured"));
        }

        let deadline = Instant::now() + settings.dial_timeout;
        let mut last_error = String::new();

        for (i, raw) in endpoints.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                last_error = format!("dial timed out after {:?}", settings.dial_timeout);
                break;
            }
            let budget = remaining / (endpoints.len() - i) as u32;

            let uri = normalize_endpoint(raw);
            let endpoint = match build_endpoint(&uri, budget, tls.as_ref(), &settings.cert_dir) {
                Ok(endpoint) => endpoint,
                Err(e @ ConnError::CertLoad { .. }) => return Err(e),
                Err(e) => {
                    tracing::warn!(endpoint = %raw, error = %e, "invalid etcd endpoint");
                    last_error = e.to_string();
                    continue;
                }
            };

            match tokio::time::timeout(budget, Self::dial(endpoint, &uri, settings.dial_timeout))
                .await
            {
                Ok(Ok(backend)) => {
                    tracing::info!(endpoint = %uri, "connected to etcd");
                    return Ok(backend);
                }
                Ok(Err(message)) => {
                    tracing::warn!(endpoint = %uri, error = %message, "etcd endpoint unreachable");
                    last_error = format!("{}: {}", uri, message);
                }
                Err(_) => {
                    tracing::warn!(endpoint = %uri, budget = ?budget, "etcd endpoint timed out");
                    last_error = format!("{}: timed out after {:?}", uri, budget);
                }
            }
        }

        Err(ConnError::dial(endpoints, last_error))
    }

    async fn dial(endpoint: Endpoint, uri: &str, probe_timeout: Duration) -> Result<Self, String> {
        let channel = endpoint.connect().await.map_err(|e| e.to_string())?;
        let backend = Self::with_channel(channel, uri, ConnState::Connecting, probe_timeout);
        backend.probe().await.map_err(|e| e.to_string())?;
        Ok(backend)
    }

    /// Build a backend on the first configured endpoint without dialing.
    ///
    /// The channel connects on first use. The backend starts `IDLE`, so the
    /// readiness gate probes it before the first batch.
    pub fn connect_lazy(
        settings: &ConnectionSettings,
        tls: Option<ClientTlsConfig>,
    ) -> ConnResult<Self> {
        let raw = settings
            .endpoints
            .first()
            .ok_or_else(|| ConnError::dial(&settings.endpoints, "no endpoints configured"))?;
        let uri = normalize_endpoint(raw);
        let endpoint = build_endpoint(
            &uri,
            settings.dial_timeout,
            tls.as_ref(),
            &settings.cert_dir,
        )?;
        Ok(Self::with_channel(
            endpoint.connect_lazy(),
            &uri,
            ConnState::Idle,
            settings.dial_timeout,
        ))
    }

    fn with_channel(channel: Channel, uri: &str, state: ConnState, probe_timeout: Duration) -> Self {
        Self {
            channel,
            endpoint: uri.to_string(),
            state: StateCell::new(state),
            probe_timeout,
        }
    }

    /// Endpoint the channel is connected to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Single-key `Range` bounded by the probe timeout.
    ///
    /// Succeeds whenever the server answers, even with an error status: the
    /// transport is up either way.
    async fn probe(&self) -> StoreResult<()> {
        let req = proto::RangeRequest::single(PROBE_KEY);
        let call = self.unary::<_, proto::RangeResponse>(StoreOp::Get, proto::KV_RANGE, req);
        match tokio::time::timeout(self.probe_timeout, call).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) if self.state.get() == ConnState::Ready => {
                tracing::debug!(endpoint = %self.endpoint, error = %e, "etcd probe answered with error");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                self.state.set(ConnState::TransientFailure);
                Err(StoreError::Timeout {
                    op: StoreOp::Get,
                    after: self.probe_timeout,
                })
            }
        }
    }

    async fn unary<Req, Resp>(&self, op: StoreOp, path: &'static str, req: Req) -> StoreResult<Resp>
    where
        Req: prost::Message + Send + 'static,
        Resp: prost::Message + Default + Send + 'static,
    {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        if let Err(e) = grpc.ready().await {
            self.mark_unavailable();
            return Err(StoreError::transport(op, format!("service not ready: {}", e)));
        }

        let codec: ProstCodec<Req, Resp> = ProstCodec::default();
        let result = grpc
            .unary(
                tonic::Request::new(req),
                PathAndQuery::from_static(path),
                codec,
            )
            .await;

        match result {
            Ok(response) => {
                self.state.set(ConnState::Ready);
                Ok(response.into_inner())
            }
            Err(status) => {
                self.observe_status(&status);
                Err(StoreError::transport(
                    op,
                    format!("{:?}: {}", status.code(), status.message()),
                ))
            }
        }
    }

    /// Only `Unavailable` says the transport is down; any other status came
    /// from a live server.
    fn observe_status(&self, status: &Status) {
        if status.code() == Code::Unavailable {
            self.mark_unavailable();
        } else {
            self.state.set(ConnState::Ready);
        }
    }

    fn mark_unavailable(&self) {
        let previous = self.state.set(ConnState::TransientFailure);
        if previous != ConnState::TransientFailure {
            tracing::warn!(endpoint = %self.endpoint, "etcd channel unavailable");
        }
    }
}

#[async_trait]
impl KvBackend for EtcdBackend {
    fn name(&self) -> &'static str {
        "etcd"
    }

    fn state(&self) -> ConnState {
        self.state.get()
    }

    async fn refresh_state(&self) -> ConnState {
        if self.state.get() == ConnState::Ready {
            return ConnState::Ready;
        }
        if let Err(e) = self.probe().await {
            tracing::debug!(endpoint = %self.endpoint, error = %e, "etcd probe failed");
        }
        self.state.get()
    }

    async fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let req = proto::PutRequest {
            key: key.as_bytes().to_vec(),
            value: value.to_vec(),
            prev_kv: false,
        };
        let _: proto::PutResponse = self.unary(StoreOp::Put, proto::KV_PUT, req).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let resp: proto::RangeResponse = self
            .unary(StoreOp::Get, proto::KV_RANGE, proto::RangeRequest::single(key))
            .await?;
        Ok(resp.into_value())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let req = proto::DeleteRangeRequest {
            key: key.as_bytes().to_vec(),
            ..Default::default()
        };
        let resp: proto::DeleteRangeResponse = self
            .unary(StoreOp::Delete, proto::KV_DELETE_RANGE, req)
            .await?;
        tracing::debug!(key = %key, deleted = resp.deleted, "etcd delete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::tls::{TlsClientBuilder, CA_FILE, CLIENT_CERT_FILE, CLIENT_KEY_FILE};
    use std::fs;

    /// Address with nothing listening on it.
    fn closed_endpoint() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    fn settings(endpoints: Vec<String>) -> ConnectionSettings {
        ConnectionSettings::new(endpoints, "/nonexistent").with_dial_timeout(Duration::from_secs(2))
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("10.0.0.1:2379"), "https://10.0.0.1:2379");
        assert_eq!(normalize_endpoint(" etcd-0:2379 "), "https://etcd-0:2379");
        assert_eq!(
            normalize_endpoint("https://etcd-0:2379"),
            "https://etcd-0:2379"
        );
        assert_eq!(normalize_endpoint("http://127.0.0.1:2379"), "http://127.0.0.1:2379");
    }

    #[tokio::test]
    async fn test_connect_without_endpoints_fails_fast() {
        let settings = ConnectionSettings::new(Vec::new(), "/nonexistent");
        let err = EtcdBackend::connect(&settings, Some(ClientTlsConfig::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnError::Dial { .. }));
    }

    #[tokio::test]
    async fn test_connect_to_closed_ports_is_dial_error() {
        let endpoints = vec![closed_endpoint(), closed_endpoint()];
        let err = EtcdBackend::connect(&settings(endpoints.clone()), None)
            .await
            .unwrap_err();
        match err {
            ConnError::Dial {
                endpoints: tried, ..
            } => assert_eq!(tried, endpoints),
            other => panic!("expected Dial, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unavailable_call_moves_to_transient_failure() {
        let backend = EtcdBackend::connect_lazy(&settings(vec![closed_endpoint()]), None).unwrap();
        assert_eq!(backend.state(), ConnState::Idle);

        let err = backend.get("/skydns/a/").await.unwrap_err();
        match err {
            StoreError::Transport { op, ref message } => {
                assert_eq!(op, StoreOp::Get);
                assert!(message.starts_with("Unavailable"), "message: {}", message);
            }
            other => panic!("expected Transport, got {:?}", other),
        }
        assert_eq!(backend.state(), ConnState::TransientFailure);
    }

    #[tokio::test]
    async fn test_refresh_state_keeps_failure_while_member_is_down() {
        let backend = EtcdBackend::connect_lazy(&settings(vec![closed_endpoint()]), None).unwrap();
        assert_eq!(backend.refresh_state().await, ConnState::TransientFailure);
        assert_eq!(backend.refresh_state().await, ConnState::TransientFailure);
    }

    #[tokio::test]
    async fn test_observe_status_classification() {
        let backend = EtcdBackend::connect_lazy(&settings(vec![closed_endpoint()]), None).unwrap();

        backend.observe_status(&Status::unavailable("connection refused"));
        assert_eq!(backend.state(), ConnState::TransientFailure);

        backend.observe_status(&Status::permission_denied("no read on /skydns/"));
        assert_eq!(backend.state(), ConnState::Ready);
    }

    #[tokio::test]
    async fn test_unparseable_tls_material_is_cert_load() {
        let dir = tempfile::tempdir().unwrap();
        let garbage = |label: &str| {
            format!(
                "-----BEGIN {label}-----\nbm90IHJlYWwgZGVyIGJ5dGVz\n-----END {label}-----\n"
            )
        };
        fs::write(dir.path().join(CLIENT_CERT_FILE), garbage("CERTIFICATE")).unwrap();
        fs::write(dir.path().join(CLIENT_KEY_FILE), garbage("PRIVATE KEY")).unwrap();
        fs::write(dir.path().join(CA_FILE), garbage("CERTIFICATE")).unwrap();

        let tls = TlsClientBuilder::from_cert_dir(dir.path()).unwrap().build();
        let settings = ConnectionSettings::new(vec!["127.0.0.1:2379".to_string()], dir.path());

        match EtcdBackend::connect(&settings, Some(tls)).await {
            Err(ConnError::CertLoad { path, .. }) => assert_eq!(path, dir.path()),
            other => panic!("expected CertLoad, got {:?}", other),
        }
    }
}
