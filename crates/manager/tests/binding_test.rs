mod common;

use chrono::{Duration, Utc};
use common::Harness;
use stratbot_core::common::BindingId;
use stratbot_core::common::time::TimeProvider;
use stratbot_core::exchange::error::ExchangeError;
use stratbot_core::store::port::CredentialStore;
use stratbot_core::test_utils::MockCall;
use stratbot_manager::ManagerError;

#[tokio::test]
async fn test_bind_then_lookup_returns_keys() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;

    let binding = h.bindings.bind(u, "k1", "s1").await?;
    assert_eq!(binding.owner, u);
    assert_eq!(binding.bound_at, h.clock.now());

    let found = h.store.find_binding_by_user(u).await?.expect("binding");
    assert_eq!(found.api_key, "k1");
    assert_eq!(found.secret_key, "s1");
    Ok(())
}

#[tokio::test]
async fn test_second_bind_conflicts() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;

    h.bindings.bind(u, "k1", "s1").await?;
    let second = h.bindings.bind(u, "k2", "s2").await;
    assert!(matches!(second, Err(ManagerError::Conflict(_))));
    assert_eq!(h.store.binding_count_for(u).await, 1);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_binds_leave_one_binding() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let bindings = h.bindings.clone();
        handles.push(tokio::spawn(async move {
            bindings.bind(u, &format!("k{i}"), &format!("s{i}")).await
        }));
    }
    let mut ok = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => ok += 1,
            Err(ManagerError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(h.store.binding_count_for(u).await, 1);
    Ok(())
}

#[tokio::test]
async fn test_empty_keys_are_rejected() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;

    assert!(matches!(
        h.bindings.bind(u, "", "s1").await,
        Err(ManagerError::Validation(_))
    ));
    assert!(matches!(
        h.bindings.bind(u, "k1", "  ").await,
        Err(ManagerError::Validation(_))
    ));
    assert_eq!(h.store.binding_count_for(u).await, 0);
    Ok(())
}

#[tokio::test]
async fn test_update_and_unbind_are_owner_checked() -> anyhow::Result<()> {
    let h = Harness::new();
    let alice = h.user("alice@example.com").await;
    let bob = h.user("bob@example.com").await;
    let binding = h.bindings.bind(alice, "k1", "s1").await?;

    assert!(matches!(
        h.bindings.update(bob, binding.id, "k2", "s2").await,
        Err(ManagerError::Forbidden)
    ));
    assert!(matches!(
        h.bindings.unbind(bob, binding.id).await,
        Err(ManagerError::Forbidden)
    ));
    assert!(matches!(
        h.bindings.update(alice, BindingId(9999), "k2", "s2").await,
        Err(ManagerError::NotFound(_))
    ));

    let untouched = h.store.get_binding(binding.id).await?.expect("binding");
    assert_eq!(untouched.api_key, "k1");

    h.bindings.unbind(alice, binding.id).await?;
    assert!(h.store.get_binding(binding.id).await?.is_none());
    assert!(matches!(
        h.bindings.unbind(alice, binding.id).await,
        Err(ManagerError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_start_stream_requires_binding() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;

    assert!(matches!(
        h.bindings.start_stream(u).await,
        Err(ManagerError::NotBound)
    ));
    assert!(h.exchange.calls().is_empty());

    let binding = h.bindings.bind(u, "k1", "s1").await?;
    let key = h.bindings.start_stream(u).await?;
    assert!(!key.is_empty());

    let stored = h.store.get_binding(binding.id).await?.expect("binding");
    assert_eq!(stored.stream_key.as_deref(), Some(key.as_str()));
    assert!(stored.streamed_at.is_some());
    assert_eq!(h.exchange.calls_for("k1"), vec![MockCall::StartUserStream]);
    Ok(())
}

#[tokio::test]
async fn test_start_stream_overwrites_previous_key() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;
    let binding = h.bindings.bind(u, "k1", "s1").await?;

    h.exchange.set_stream_key("first");
    h.bindings.start_stream(u).await?;
    h.clock.set_time(Utc::now() + Duration::hours(1));
    h.exchange.set_stream_key("second");
    h.bindings.start_stream(u).await?;

    let stored = h.store.get_binding(binding.id).await?.expect("binding");
    assert_eq!(stored.stream_key.as_deref(), Some("second"));
    Ok(())
}

#[tokio::test]
async fn test_empty_or_failed_stream_is_upstream_error() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;
    let binding = h.bindings.bind(u, "k1", "s1").await?;

    h.exchange.set_stream_key("");
    assert!(matches!(
        h.bindings.start_stream(u).await,
        Err(ManagerError::Upstream(_))
    ));

    h.exchange.set_stream_key("listen");
    h.exchange.fail_next(ExchangeError::Transport("connection reset".into()));
    assert!(matches!(
        h.bindings.start_stream(u).await,
        Err(ManagerError::Upstream(_))
    ));

    let stored = h.store.get_binding(binding.id).await?.expect("binding");
    assert!(stored.stream_key.is_none());
    Ok(())
}

#[tokio::test]
async fn test_keep_alive_forwards_existing_key() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;

    assert!(matches!(h.bindings.keep_alive(u).await, Err(ManagerError::NotBound)));

    h.bindings.bind(u, "k1", "s1").await?;
    // 已绑定但尚未开启数据流
    assert!(matches!(h.bindings.keep_alive(u).await, Err(ManagerError::NotBound)));

    h.exchange.set_stream_key("listen-1");
    h.bindings.start_stream(u).await?;
    h.bindings.keep_alive(u).await?;

    let calls = h.exchange.calls_for("k1");
    assert_eq!(calls.last(), Some(&MockCall::KeepAlive("listen-1".to_string())));
    let binding = h.bindings.require_binding(u).await?;
    assert_eq!(binding.stream_key.as_deref(), Some("listen-1"));
    Ok(())
}

#[tokio::test]
async fn test_update_clears_stream_and_uses_new_keys() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;
    let binding = h.bindings.bind(u, "k1", "s1").await?;
    h.bindings.start_stream(u).await?;

    let updated = h.bindings.update(u, binding.id, "k2", "s2").await?;
    assert!(updated.stream_key.is_none());
    assert!(updated.streamed_at.is_none());
    assert_eq!(updated.bound_at, binding.bound_at);

    h.bindings.start_stream(u).await?;
    assert_eq!(h.exchange.calls_for("k2"), vec![MockCall::StartUserStream]);
    Ok(())
}

#[tokio::test]
async fn test_list_for_owner_is_scoped() -> anyhow::Result<()> {
    let h = Harness::new();
    let alice = h.user("alice@example.com").await;
    let bob = h.user("bob@example.com").await;
    h.bindings.bind(alice, "ka", "sa").await?;

    let mine = h.bindings.list_for_owner(alice).await?;
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].api_key, "ka");
    assert!(h.bindings.list_for_owner(bob).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_stream_call_respects_deadline() -> anyhow::Result<()> {
    let h = Harness::with_timeout(std::time::Duration::from_millis(50));
    let u = h.user("u@example.com").await;
    h.bindings.bind(u, "k1", "s1").await?;

    h.exchange.set_delay(std::time::Duration::from_millis(500));
    assert!(matches!(
        h.bindings.start_stream(u).await,
        Err(ManagerError::Upstream(_))
    ));
    Ok(())
}
