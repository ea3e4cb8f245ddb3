//! End-to-end request/response behavior against the in-process mock PLC.

mod support;

use adstc_client::{Client, ConnectionState, ErrorCategory};
use adstc_core::ads::{AdsState, ReturnCode};
use support::MockPlc;

#[tokio::test]
async fn device_info_echo() {
    let plc = MockPlc::builder().device("Plc30 App", 3, 1, 1969).start().await;
    let client = Client::connect(plc.client_options()).await.unwrap();

    let info = client.device_info().await.unwrap();
    assert_eq!(info.major, 3);
    assert_eq!(info.minor, 1);
    assert_eq!(info.build, 1969);
    assert_eq!(info.name, "Plc30 App");

    client.close().await;
}

#[tokio::test]
async fn little_endian_read() {
    let plc = MockPlc::start().await;
    plc.set_memory(0x4020, vec![0x2A, 0x00, 0x00, 0x00]);

    let client = Client::connect(plc.client_options()).await.unwrap();
    let data = client.read(0x4020, 0, 4).await.unwrap();
    assert_eq!(data, [0x2A, 0x00, 0x00, 0x00]);

    client.close().await;
}

#[tokio::test]
async fn zero_length_read_is_legal() {
    let plc = MockPlc::start().await;
    plc.set_memory(0x4020, vec![1, 2, 3]);

    let client = Client::connect(plc.client_options()).await.unwrap();
    let data = client.read(0x4020, 0, 0).await.unwrap();
    assert!(data.is_empty());

    client.close().await;
}

#[tokio::test]
async fn concurrent_reads_multiplex_on_one_connection() {
    let plc = MockPlc::start().await;
    let area: Vec<u8> = (0..=255).collect();
    plc.set_memory(0x4020, area.clone());

    let client = Client::connect(plc.client_options()).await.unwrap();

    let mut tasks = Vec::new();
    for offset in (0u32..64).step_by(8) {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            (offset, client.read(0x4020, offset, 8).await.unwrap())
        }));
    }
    for task in tasks {
        let (offset, data) = task.await.unwrap();
        assert_eq!(data, area[offset as usize..offset as usize + 8]);
    }

    assert_eq!(plc.connections_served(), 1);
    client.close().await;
}

#[tokio::test]
async fn write_then_read_back() {
    let plc = MockPlc::start().await;
    plc.set_memory(0x4020, vec![0; 16]);

    let client = Client::connect(plc.client_options()).await.unwrap();
    client.write(0x4020, 4, vec![0xDE, 0xAD]).await.unwrap();
    assert_eq!(client.read(0x4020, 4, 2).await.unwrap(), [0xDE, 0xAD]);

    client.close().await;
}

#[tokio::test]
async fn read_state_and_write_control() {
    let plc = MockPlc::start().await;
    let client = Client::connect(plc.client_options()).await.unwrap();

    let (ads_state, device_state) = client.read_state().await.unwrap();
    assert_eq!(ads_state, AdsState::Run);
    assert_eq!(device_state, 0);

    client
        .write_control(AdsState::Stop, 0, Vec::new())
        .await
        .unwrap();
    let (ads_state, _) = client.read_state().await.unwrap();
    assert_eq!(ads_state, AdsState::Stop);

    client.close().await;
}

#[tokio::test]
async fn device_error_surfaces_with_code() {
    let plc = MockPlc::start().await;
    let client = Client::connect(plc.client_options()).await.unwrap();

    let err = client.read(0x9999, 0, 4).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Device);
    assert_eq!(err.device_code(), Some(ReturnCode::InvalidIndexGroup));

    client.close().await;
}

#[tokio::test]
async fn config_mode_probe_aborts_connect() {
    let plc = MockPlc::start().await;
    plc.refuse_all(true);

    let err = Client::connect(plc.client_options()).await.unwrap_err();
    assert_eq!(err.device_code(), Some(ReturnCode::TargetPortNotFound));
}

#[tokio::test]
async fn closed_client_fails_requests_synchronously() {
    let plc = MockPlc::start().await;
    let client = Client::connect(plc.client_options()).await.unwrap();

    client.close().await;
    assert_eq!(client.state(), ConnectionState::Closed);

    let err = client.read(0x4020, 0, 4).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::State);

    // Close is idempotent.
    client.close().await;
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn state_callback_sees_lifecycle() {
    let plc = MockPlc::start().await;
    let client = Client::connect(plc.client_options()).await.unwrap();
    assert!(client.state().is_connected());

    let mut changes = client.state_changes();
    client.close().await;
    changes.changed().await.unwrap();
    // Disconnecting may already have been replaced by Closed.
    let state = changes.borrow().clone();
    assert!(matches!(
        state,
        ConnectionState::Disconnecting | ConnectionState::Closed
    ));
}

#[tokio::test]
async fn connect_to_nothing_is_a_network_error() {
    // Bind-then-drop gives a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let opts = adstc_client::ClientOptions::new(
        addr.to_string(),
        adstc_core::ams::AmsNetId::new(127, 0, 0, 1, 1, 1),
    )
    .with_connect_timeout(std::time::Duration::from_secs(2));

    let err = Client::connect(opts).await.unwrap_err();
    assert!(matches!(
        err.category(),
        ErrorCategory::Network | ErrorCategory::Timeout
    ));
}
