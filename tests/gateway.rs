mod common;

use common::{open_stream, register, start_test_gateway, start_test_gateway_with, wait_until};
use rendezvous_core::config::SessionSettings;
use rendezvous_core::proto::ServiceType;
use rendezvous_core::{Error, ForwardEngine, ForwardMessage, ServiceRegistry};
use std::time::Duration;
use tonic::Code;

const QUIET: Duration = Duration::from_millis(200);
const PATIENT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_register_and_bind() {
    let server = start_test_gateway().await.unwrap();
    let mut client = server.client().await;

    let id = register(&mut client, "cache", ServiceType::Consumer).await;
    let service = server.gateway.registry().get_by_id(&id).unwrap();
    assert_eq!(service.name, "cache");
    assert_eq!(service.registered_at, service.last_active_at);

    let _stream = open_stream(&mut client, Some(&id)).await;
    let connections = server.gateway.connections().clone();
    wait_until(|| connections.lookup(&id).is_some()).await;
}

#[tokio::test]
async fn test_register_rejects_unknown_role() {
    let server = start_test_gateway().await.unwrap();
    let mut client = server.client().await;

    let status = client
        .register(rendezvous_core::proto::RegisterRequest {
            service_name: "cache".to_string(),
            service_type: ServiceType::Unknown as i32,
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_end_to_end_forwarding() {
    let server = start_test_gateway().await.unwrap();
    let mut client = server.client().await;
    let connections = server.gateway.connections().clone();

    let cache_id = register(&mut client, "cache", ServiceType::Consumer).await;
    let mut cache = open_stream(&mut client, Some(&cache_id)).await;
    wait_until(|| connections.lookup(&cache_id).is_some()).await;

    let writer_id = register(&mut client, "writer", ServiceType::Producer).await;
    let mut writer = open_stream(&mut client, Some(&writer_id)).await;
    wait_until(|| connections.lookup(&writer_id).is_some()).await;

    writer.send("cache", &[1, 2, 3]).await;

    let delivered = cache.next_within(PATIENT).await.unwrap().unwrap();
    assert!(delivered.success);
    assert_eq!(&delivered.payload[..], &[1, 2, 3]);
    assert_eq!(delivered.from_service_id, writer_id);

    // Success emits nothing back to the sender.
    assert!(writer.next_within(QUIET).await.is_none());
}

#[tokio::test]
async fn test_frames_forwarded_in_receipt_order() {
    let server = start_test_gateway().await.unwrap();
    let mut client = server.client().await;
    let connections = server.gateway.connections().clone();

    let cache_id = register(&mut client, "cache", ServiceType::Consumer).await;
    let mut cache = open_stream(&mut client, Some(&cache_id)).await;
    let writer_id = register(&mut client, "writer", ServiceType::Producer).await;
    let mut writer = open_stream(&mut client, Some(&writer_id)).await;
    wait_until(|| connections.len() == 2).await;

    for i in 0..32u8 {
        writer.send("cache", &[i]).await;
    }
    for i in 0..32u8 {
        let delivered = cache.next_within(PATIENT).await.unwrap().unwrap();
        assert_eq!(&delivered.payload[..], &[i]);
        assert_eq!(delivered.from_service_id, writer_id);
    }
    assert!(writer.next_within(QUIET).await.is_none());
}

#[tokio::test]
async fn test_reply_travels_back_by_name() {
    let server = start_test_gateway().await.unwrap();
    let mut client = server.client().await;
    let connections = server.gateway.connections().clone();

    let cache_id = register(&mut client, "cache", ServiceType::Consumer).await;
    let writer_id = register(&mut client, "writer", ServiceType::Producer).await;
    let mut cache = open_stream(&mut client, Some(&cache_id)).await;
    let mut writer = open_stream(&mut client, Some(&writer_id)).await;
    wait_until(|| connections.len() == 2).await;

    writer.send("cache", b"get k").await;
    let request = cache.next_within(PATIENT).await.unwrap().unwrap();
    assert_eq!(request.from_service_id, writer_id);

    cache.send("writer", b"v").await;
    let reply = writer.next_within(PATIENT).await.unwrap().unwrap();
    assert_eq!(&reply.payload[..], b"v");
    assert_eq!(reply.from_service_id, cache_id);
}

#[tokio::test]
async fn test_forward_failure_is_reported_to_sender() {
    let server = start_test_gateway().await.unwrap();
    let mut client = server.client().await;
    let connections = server.gateway.connections().clone();

    let writer_id = register(&mut client, "writer", ServiceType::Producer).await;
    let mut writer = open_stream(&mut client, Some(&writer_id)).await;
    wait_until(|| connections.lookup(&writer_id).is_some()).await;

    writer.send("nobody", b"hello").await;
    let notice = writer.next_within(PATIENT).await.unwrap().unwrap();
    assert!(!notice.success);
    assert_eq!(notice.message, "target service not found: nobody");

    // Registered but not connected.
    register(&mut client, "idle", ServiceType::Consumer).await;
    writer.send("idle", b"hello").await;
    let notice = writer.next_within(PATIENT).await.unwrap().unwrap();
    assert!(!notice.success);
    assert!(notice.message.starts_with("failed to send message"));

    // The session survives failures.
    assert!(connections.lookup(&writer_id).is_some());
}

#[tokio::test]
async fn test_teardown_removes_service() {
    let server = start_test_gateway().await.unwrap();
    let mut client = server.client().await;
    let registry = server.gateway.registry().clone();
    let connections = server.gateway.connections().clone();

    let cache_id = register(&mut client, "cache", ServiceType::Consumer).await;
    let mut cache = open_stream(&mut client, Some(&cache_id)).await;
    let writer_id = register(&mut client, "writer", ServiceType::Producer).await;
    let writer = open_stream(&mut client, Some(&writer_id)).await;
    wait_until(|| connections.len() == 2).await;

    drop(writer);
    wait_until(|| connections.lookup(&writer_id).is_none()).await;
    wait_until(|| registry.get_by_id(&writer_id).is_err()).await;
    assert!(registry.get_by_name("writer").unwrap().is_empty());

    let engine = ForwardEngine::new(registry.clone(), connections.clone());
    assert!(matches!(
        engine.forward(&cache_id, ForwardMessage::new("writer", vec![1])),
        Err(Error::TargetNotFound(_))
    ));

    cache.send("writer", b"anyone?").await;
    let notice = cache.next_within(PATIENT).await.unwrap().unwrap();
    assert!(!notice.success);
    assert_eq!(notice.message, "target service not found: writer");
}

#[tokio::test]
async fn test_missing_identity_is_unauthenticated() {
    let server = start_test_gateway().await.unwrap();
    let mut client = server.client().await;

    let mut anonymous = open_stream(&mut client, None).await;
    let status = anonymous.next_within(PATIENT).await.unwrap().unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);

    let mut stranger = open_stream(&mut client, Some("not-a-registered-id")).await;
    let status = stranger.next_within(PATIENT).await.unwrap().unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);

    assert!(server.gateway.connections().is_empty());
}

#[tokio::test]
async fn test_second_stream_supersedes_first() {
    let server = start_test_gateway().await.unwrap();
    let mut client = server.client().await;
    let connections = server.gateway.connections().clone();

    let cache_id = register(&mut client, "cache", ServiceType::Consumer).await;
    let writer_id = register(&mut client, "writer", ServiceType::Producer).await;
    let writer = open_stream(&mut client, Some(&writer_id)).await;

    let mut first = open_stream(&mut client, Some(&cache_id)).await;
    wait_until(|| connections.len() == 2).await;
    let mut second = open_stream(&mut client, Some(&cache_id)).await;

    let status = first.next_within(PATIENT).await.unwrap().unwrap_err();
    assert_eq!(status.code(), Code::Aborted);

    // The replacement keeps the identity and receives traffic.
    assert!(server.gateway.registry().get_by_id(&cache_id).is_ok());
    writer.send("cache", b"after").await;
    let delivered = second.next_within(PATIENT).await.unwrap().unwrap();
    assert_eq!(&delivered.payload[..], b"after");
}

#[tokio::test]
async fn test_idle_session_is_closed() {
    let settings = SessionSettings {
        idle_timeout_secs: 1,
        ..Default::default()
    };
    let server = start_test_gateway_with(settings).await.unwrap();
    let mut client = server.client().await;
    let registry = server.gateway.registry().clone();

    let id = register(&mut client, "cache", ServiceType::Consumer).await;
    let mut stream = open_stream(&mut client, Some(&id)).await;

    let status = stream.next_within(PATIENT).await.unwrap().unwrap_err();
    assert_eq!(status.code(), Code::DeadlineExceeded);
    wait_until(|| registry.get_by_id(&id).is_err()).await;
}
