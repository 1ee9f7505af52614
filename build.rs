//! Build script generating the gRPC service glue for the gateway.
//!
//! Messages are plain `prost` structs in `src/proto.rs`; only the service
//! client/server code is generated here, so no `protoc` is required.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let service = tonic_build::manual::Service::builder()
        .name("GatewayService")
        .package("rendezvous")
        .method(
            tonic_build::manual::Method::builder()
                .name("register")
                .route_name("Register")
                .input_type("crate::proto::RegisterRequest")
                .output_type("crate::proto::RegisterResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .method(
            tonic_build::manual::Method::builder()
                .name("stream")
                .route_name("Stream")
                .input_type("crate::proto::ForwardMessage")
                .output_type("crate::proto::ForwardResponse")
                .codec_path("tonic::codec::ProstCodec")
                .client_streaming()
                .server_streaming()
                .build(),
        )
        .build();

    tonic_build::manual::Builder::new().compile(&[service]);
}
