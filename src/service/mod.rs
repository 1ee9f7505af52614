//! gRPC service layer for the rendezvous gateway

pub mod gateway;

pub use gateway::GatewayServer;
