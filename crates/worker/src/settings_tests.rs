// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_adapters::{ConfigPublisher, LocalBus};
use fleet_core::{ConfigAction, FakeClock};
use parking_lot::Mutex;
use serde_json::json;
use std::time::Duration;

/// Counts loads and serves a version number per read
#[derive(Default)]
struct CountingLoader {
    loads: Mutex<Vec<(ConfigModule, GuildId)>>,
    fail: bool,
}

impl SettingsLoader for Arc<CountingLoader> {
    fn load(&self, module: ConfigModule, guild_id: &GuildId) -> Result<Value, LoadError> {
        if self.fail {
            return Err(LoadError {
                module,
                guild_id: guild_id.clone(),
                reason: "connection refused".to_string(),
            });
        }
        let mut loads = self.loads.lock();
        loads.push((module, guild_id.clone()));
        Ok(json!({ "version": loads.len() }))
    }
}

fn config_update(module: ConfigModule, guild: &str, action: ConfigAction) -> ConfigUpdateMessage {
    ConfigUpdateMessage::new(module, GuildId::new(guild), action, 1)
}

#[test]
fn second_read_is_served_from_cache() {
    let loader = Arc::new(CountingLoader::default());
    let cache = SettingsCache::new(Arc::clone(&loader));
    let guild = GuildId::new("g1");

    let first = cache.get(ConfigModule::Welcome, &guild).unwrap();
    let second = cache.get(ConfigModule::Welcome, &guild).unwrap();

    assert_eq!(first, second);
    assert_eq!(loader.loads.lock().len(), 1);
}

#[test]
fn update_evicts_only_its_module_and_guild() {
    let loader = Arc::new(CountingLoader::default());
    let cache = SettingsCache::new(Arc::clone(&loader));
    let g1 = GuildId::new("g1");
    let g2 = GuildId::new("g2");
    cache.get(ConfigModule::Welcome, &g1).unwrap();
    cache.get(ConfigModule::Welcome, &g2).unwrap();
    cache.get(ConfigModule::Leveling, &g1).unwrap();

    assert!(cache.invalidate(&config_update(ConfigModule::Welcome, "g1", ConfigAction::Update)));

    assert_eq!(cache.len(), 2);
    let reread = cache.get(ConfigModule::Welcome, &g1).unwrap();
    assert_eq!(*reread, json!({ "version": 4 }));
}

#[yare::parameterized(
    create = { ConfigAction::Create },
    update = { ConfigAction::Update },
    delete = { ConfigAction::Delete },
)]
fn every_action_evicts(action: ConfigAction) {
    let cache = SettingsCache::new(NoSettings);
    cache.get(ConfigModule::Tickets, &GuildId::new("g1")).unwrap();
    assert!(cache.invalidate(&config_update(ConfigModule::Tickets, "g1", action)));
    assert!(cache.is_empty());
}

#[test]
fn invalidating_unknown_entry_is_a_noop() {
    let cache = SettingsCache::new(NoSettings);
    assert!(!cache.invalidate(&config_update(ConfigModule::General, "g1", ConfigAction::Delete)));
}

#[test]
fn failed_load_is_not_cached() {
    let loader = Arc::new(CountingLoader {
        fail: true,
        ..Default::default()
    });
    let cache = SettingsCache::new(loader);

    let err = cache
        .get(ConfigModule::Security, &GuildId::new("g1"))
        .unwrap_err();

    assert_eq!(err.reason, "connection refused");
    assert!(cache.is_empty());
}

/// Fires a config update for the row it is reading, once
struct RacingLoader {
    loads: Mutex<u64>,
    on_load: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl SettingsLoader for Arc<RacingLoader> {
    fn load(&self, _module: ConfigModule, _guild_id: &GuildId) -> Result<Value, LoadError> {
        let version = {
            let mut loads = self.loads.lock();
            *loads += 1;
            *loads
        };
        let hook = self.on_load.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        Ok(json!({ "version": version }))
    }
}

#[test]
fn update_during_load_is_not_lost() {
    let loader = Arc::new(RacingLoader {
        loads: Mutex::new(0),
        on_load: Mutex::new(None),
    });
    let cache = SettingsCache::new(Arc::clone(&loader));
    let guild = GuildId::new("g1");
    let racing = cache.clone();
    *loader.on_load.lock() = Some(Box::new(move || {
        racing.invalidate(&config_update(ConfigModule::Welcome, "g1", ConfigAction::Update));
    }));

    let stale = cache.get(ConfigModule::Welcome, &guild).unwrap();
    assert_eq!(*stale, json!({ "version": 1 }));
    assert!(cache.is_empty());

    let fresh = cache.get(ConfigModule::Welcome, &guild).unwrap();
    assert_eq!(*fresh, json!({ "version": 2 }));
    assert_eq!(cache.len(), 1);
}

#[test]
fn update_for_another_guild_during_load_keeps_entry() {
    let loader = Arc::new(RacingLoader {
        loads: Mutex::new(0),
        on_load: Mutex::new(None),
    });
    let cache = SettingsCache::new(Arc::clone(&loader));
    let racing = cache.clone();
    *loader.on_load.lock() = Some(Box::new(move || {
        racing.invalidate(&config_update(ConfigModule::Welcome, "g2", ConfigAction::Update));
    }));

    cache.get(ConfigModule::Welcome, &GuildId::new("g1")).unwrap();

    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn published_update_evicts_through_subscriber() {
    let loader = Arc::new(CountingLoader::default());
    let cache = SettingsCache::new(Arc::clone(&loader));
    let guild = GuildId::new("g1");
    cache.get(ConfigModule::Moderation, &guild).unwrap();

    let subscriber = ConfigSubscriber::new();
    cache.subscribe(&subscriber);
    let bus = LocalBus::new();
    let _listener = subscriber.listen(&bus).await.unwrap();

    ConfigPublisher::new(bus, FakeClock::new())
        .publish(ConfigModule::Moderation, guild.clone(), ConfigAction::Update)
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(2), async {
        while !cache.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    cache.get(ConfigModule::Moderation, &guild).unwrap();
    assert_eq!(loader.loads.lock().len(), 2);
}
