//! Notification fan-out, drop accounting, and subscription teardown.

mod support;

use adstc_client::{Client, SubscriptionOptions};
use adstc_core::ads::FileTime;
use adstc_core::protocol::{Notification, Sample, Stamp};
use adstc_core::NotificationHandle;
use std::time::Duration;
use support::{MockPlc, SymbolDef};

fn plc_builder() -> support::MockPlcBuilder {
    MockPlc::builder()
        .symbol(SymbolDef::new("MAIN.a", 0x4020, 0, 2, "INT"))
        .symbol(SymbolDef::new("MAIN.b", 0x4020, 8, 4, "UDINT"))
        .memory(0x4020, vec![0u8; 64])
}

/// 2021-01-01 00:00:00 UTC as FILETIME.
fn sample_filetime() -> FileTime {
    FileTime::from_raw(FileTime::UNIX_EPOCH_TICKS + 1_609_459_200 * FileTime::TICKS_PER_SEC)
}

#[tokio::test]
async fn single_frame_fans_out_to_both_subscriptions() {
    let plc = plc_builder().next_handle(5).start().await;
    let client = Client::connect(plc.client_options()).await.unwrap();

    let mut sub_a = client
        .subscribe("MAIN.a", SubscriptionOptions::default())
        .await
        .unwrap();
    let mut sub_b = client
        .subscribe("MAIN.b", SubscriptionOptions::default())
        .await
        .unwrap();
    assert_eq!(sub_a.handle(), Some(NotificationHandle::new(5)));
    assert_eq!(sub_b.handle(), Some(NotificationHandle::new(6)));

    // One frame, one stamp, both handles.
    plc.push_frame(Notification {
        stamps: vec![Stamp {
            timestamp: sample_filetime(),
            samples: vec![
                Sample {
                    handle: NotificationHandle::new(5),
                    data: vec![0x01, 0x00],
                },
                Sample {
                    handle: NotificationHandle::new(6),
                    data: vec![0x02, 0x00, 0x03, 0x00],
                },
            ],
        }],
    });

    let got_a = sub_a.recv().await.unwrap();
    assert_eq!(got_a.data, [0x01, 0x00]);
    assert_eq!(got_a.timestamp.timestamp(), 1_609_459_200);
    assert_eq!(got_a.epoch, 1);

    let got_b = sub_b.recv().await.unwrap();
    assert_eq!(got_b.data, [0x02, 0x00, 0x03, 0x00]);

    assert_eq!(client.dropped_notifications(), 0);
    client.close().await;
}

#[tokio::test]
async fn per_subscription_order_is_preserved() {
    let plc = plc_builder().start().await;
    let client = Client::connect(plc.client_options()).await.unwrap();

    let mut sub = client
        .subscribe("MAIN.a", SubscriptionOptions::default())
        .await
        .unwrap();
    let handle = sub.handle().unwrap().as_u32();

    for n in 0..5i16 {
        plc.push_notification(handle, sample_filetime(), n.to_le_bytes().to_vec());
    }
    for n in 0..5i16 {
        let got = sub.recv().await.unwrap();
        assert_eq!(got.data, n.to_le_bytes());
    }

    client.close().await;
}

#[tokio::test]
async fn unknown_handle_is_dropped_and_counted() {
    let plc = plc_builder().start().await;
    let client = Client::connect(plc.client_options()).await.unwrap();

    let mut sub = client
        .subscribe("MAIN.a", SubscriptionOptions::default())
        .await
        .unwrap();
    let handle = sub.handle().unwrap().as_u32();

    plc.push_notification(9999, sample_filetime(), vec![0xFF]);
    // A known-handle sample afterwards proves the unknown one was processed.
    plc.push_notification(handle, sample_filetime(), vec![0x07, 0x00]);

    let got = sub.recv().await.unwrap();
    assert_eq!(got.data, [0x07, 0x00]);
    assert_eq!(client.dropped_notifications(), 1);

    client.close().await;
}

#[tokio::test]
async fn close_is_idempotent_and_tears_down_once() {
    let plc = plc_builder().start().await;
    let client = Client::connect(plc.client_options()).await.unwrap();

    let mut sub = client
        .subscribe("MAIN.a", SubscriptionOptions::default())
        .await
        .unwrap();
    assert_eq!(plc.subscription_handles().len(), 1);

    sub.close().await.unwrap();
    sub.close().await.unwrap();
    assert!(plc.subscription_handles().is_empty());

    // The queue ends for the consumer.
    assert_eq!(sub.recv().await, None);

    client.close().await;
}

#[tokio::test]
async fn samples_after_close_hit_the_drop_counter() {
    let plc = plc_builder().start().await;
    let client = Client::connect(plc.client_options()).await.unwrap();

    let mut sub = client
        .subscribe("MAIN.a", SubscriptionOptions::default())
        .await
        .unwrap();
    let handle = sub.handle().unwrap().as_u32();
    sub.close().await.unwrap();

    // The PLC may keep pushing until its own teardown lands.
    plc.push_notification(handle, sample_filetime(), vec![1, 0]);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while client.dropped_notifications() == 0 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "late sample was never counted"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    client.close().await;
}

#[tokio::test]
async fn client_close_ends_all_queues() {
    let plc = plc_builder().start().await;
    let client = Client::connect(plc.client_options()).await.unwrap();

    let mut sub = client
        .subscribe("MAIN.a", SubscriptionOptions::default())
        .await
        .unwrap();

    client.close().await;
    assert_eq!(sub.recv().await, None);
    assert!(plc.subscription_handles().is_empty());
}
