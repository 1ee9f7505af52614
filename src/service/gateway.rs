//! gRPC implementation of `rendezvous.GatewayService`.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, error};

use crate::config::SessionSettings;
use crate::connection::ConnectionTable;
use crate::proto::gateway_service_server::{GatewayService, GatewayServiceServer};
use crate::proto::{
    ForwardMessage, ForwardResponse, RegisterRequest, RegisterResponse, ServiceType,
};
use crate::registry::{MemoryServiceRegistry, ServiceRegistry, ServiceRole};
use crate::session::{SessionContext, StreamSession, SERVICE_ID_METADATA};

/// Gateway service wiring the registry, connection table and sessions together.
#[derive(Clone)]
pub struct GatewayServer {
    ctx: SessionContext,
    outbound_buffer: usize,
}

impl GatewayServer {
    pub fn new(
        registry: Arc<dyn ServiceRegistry>,
        connections: Arc<ConnectionTable>,
        settings: &SessionSettings,
    ) -> Self {
        Self {
            ctx: SessionContext::new(registry, connections, settings.idle_timeout()),
            outbound_buffer: settings.outbound_buffer.max(1),
        }
    }

    /// Gateway backed by a fresh in-memory registry and an empty connection table.
    pub fn in_memory(settings: &SessionSettings) -> Self {
        Self::new(
            Arc::new(MemoryServiceRegistry::new()),
            Arc::new(ConnectionTable::new()),
            settings,
        )
    }

    pub fn registry(&self) -> &Arc<dyn ServiceRegistry> {
        &self.ctx.registry
    }

    pub fn connections(&self) -> &Arc<ConnectionTable> {
        &self.ctx.connections
    }

    pub fn into_service(self) -> GatewayServiceServer<Self> {
        GatewayServiceServer::new(self)
    }
}

#[async_trait]
impl GatewayService for GatewayServer {
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        let req = request.into_inner();
        let role = match ServiceType::try_from(req.service_type) {
            Ok(ServiceType::Producer) => ServiceRole::Producer,
            Ok(ServiceType::Consumer) => ServiceRole::Consumer,
            _ => return Err(Status::invalid_argument("invalid service type")),
        };

        let service = self
            .ctx
            .registry
            .register(&req.service_name, role)
            .map_err(|e| {
                error!(error = %e, name = %req.service_name, "Registration failed");
                Status::from(e)
            })?;

        Ok(Response::new(RegisterResponse {
            success: true,
            message: "registered successfully".to_string(),
            service_id: service.id,
        }))
    }

    type StreamStream = ReceiverStream<Result<ForwardResponse, Status>>;

    async fn stream(
        &self,
        request: Request<Streaming<ForwardMessage>>,
    ) -> Result<Response<Self::StreamStream>, Status> {
        let token = request
            .metadata()
            .get(SERVICE_ID_METADATA)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let inbound = request.into_inner();

        let (tx, rx) = mpsc::channel(self.outbound_buffer);
        let session = StreamSession::new(self.ctx.clone(), token, tx);
        tokio::spawn(async move {
            let reason = session.run(inbound).await;
            debug!(?reason, "Session finished");
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
