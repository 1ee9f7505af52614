//! Wire messages for the `rendezvous.GatewayService` gRPC service.
//!
//! The message structs are declared directly with `prost` derives; the client
//! and server glue is generated by `build.rs`.

use std::collections::HashMap;

/// Declared role of a registering endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ServiceType {
    Unknown = 0,
    Producer = 1,
    Consumer = 2,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RegisterRequest {
    #[prost(string, tag = "1")]
    pub service_name: String,
    #[prost(enumeration = "ServiceType", tag = "2")]
    pub service_type: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RegisterResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(string, tag = "3")]
    pub service_id: String,
}

/// Inbound stream frame. The first frame on a stream is the handshake and its
/// fields are ignored.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ForwardMessage {
    #[prost(string, tag = "1")]
    pub target_service: String,
    #[prost(bytes = "bytes", tag = "2")]
    pub payload: bytes::Bytes,
    #[prost(map = "string, string", tag = "3")]
    pub metadata: HashMap<String, String>,
}

/// Outbound stream frame: either delivered traffic or a local failure notice.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ForwardResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(bytes = "bytes", tag = "3")]
    pub payload: bytes::Bytes,
    #[prost(string, tag = "4")]
    pub from_service_id: String,
    #[prost(map = "string, string", tag = "5")]
    pub metadata: HashMap<String, String>,
}

include!(concat!(env!("OUT_DIR"), "/rendezvous.GatewayService.rs"));
