//! Common test utilities for the rendezvous gateway

#![allow(dead_code)]

use rendezvous_core::config::SessionSettings;
use rendezvous_core::proto::gateway_service_client::GatewayServiceClient;
use rendezvous_core::proto::{ForwardMessage, ForwardResponse, RegisterRequest, ServiceType};
use rendezvous_core::{GatewayServer, SERVICE_ID_METADATA};
use std::error::Error;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tonic::transport::{Channel, Server};
use tonic::{Request, Status, Streaming};

pub type Client = GatewayServiceClient<Channel>;

pub struct TestServer {
    pub handle: tokio::task::JoinHandle<()>,
    pub endpoint: String,
    /// Shares registry and connection table with the running service
    pub gateway: GatewayServer,
}

impl TestServer {
    pub async fn client(&self) -> Client {
        GatewayServiceClient::connect(self.endpoint.clone())
            .await
            .expect("connect to test gateway")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn start_test_gateway() -> Result<TestServer, Box<dyn Error>> {
    start_test_gateway_with(SessionSettings::default()).await
}

pub async fn start_test_gateway_with(settings: SessionSettings) -> Result<TestServer, Box<dyn Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let endpoint = format!("http://127.0.0.1:{}", addr.port());

    let gateway = GatewayServer::in_memory(&settings);
    let service = gateway.clone().into_service();
    let incoming = TcpListenerStream::new(listener);

    let handle = tokio::spawn(async move {
        if let Err(e) = Server::builder()
            .add_service(service)
            .serve_with_incoming(incoming)
            .await
        {
            eprintln!("Test server failed: {}", e);
        }
    });

    Ok(TestServer {
        handle,
        endpoint,
        gateway,
    })
}

pub async fn register(client: &mut Client, name: &str, service_type: ServiceType) -> String {
    let response = client
        .register(RegisterRequest {
            service_name: name.to_string(),
            service_type: service_type as i32,
        })
        .await
        .expect("register")
        .into_inner();
    assert!(response.success);
    response.service_id
}

/// Client side of an open gateway stream.
pub struct OpenStream {
    pub tx: mpsc::Sender<ForwardMessage>,
    pub inbound: Streaming<ForwardResponse>,
}

impl OpenStream {
    pub async fn send(&self, target: &str, payload: &[u8]) {
        self.tx
            .send(ForwardMessage {
                target_service: target.to_string(),
                payload: payload.to_vec().into(),
                ..Default::default()
            })
            .await
            .expect("stream still open");
    }

    /// Next frame, or `None` if nothing arrives within `wait`.
    pub async fn next_within(&mut self, wait: Duration) -> Option<Result<ForwardResponse, Status>> {
        match tokio::time::timeout(wait, self.inbound.message()).await {
            Ok(Ok(Some(frame))) => Some(Ok(frame)),
            Ok(Ok(None)) => None,
            Ok(Err(status)) => Some(Err(status)),
            Err(_) => None,
        }
    }
}

/// Open a stream presenting `service_id` (if any) and send the handshake frame.
pub async fn open_stream(client: &mut Client, service_id: Option<&str>) -> OpenStream {
    let (tx, rx) = mpsc::channel(16);
    let mut request = Request::new(ReceiverStream::new(rx));
    if let Some(id) = service_id {
        request
            .metadata_mut()
            .insert(SERVICE_ID_METADATA, id.parse().expect("ascii service id"));
    }

    tx.send(ForwardMessage::default()).await.expect("queue handshake");
    let inbound = client.stream(request).await.expect("open stream").into_inner();
    OpenStream { tx, inbound }
}

/// Poll `condition` until it holds, failing the test after five seconds.
pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
