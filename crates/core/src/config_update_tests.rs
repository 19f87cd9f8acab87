// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn every_module_has_its_own_channel() {
    let channels = ConfigModule::all_channels();
    assert_eq!(channels.len(), 11);
    assert!(channels.contains(&"config:general".to_string()));
    assert!(channels.contains(&"config:logging".to_string()));

    let mut unique = channels.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), channels.len());
}

#[test]
fn channel_round_trips_through_module() {
    for module in ConfigModule::ALL {
        assert_eq!(ConfigModule::from_channel(&module.channel()), Some(module));
    }
}

#[yare::parameterized(
    no_prefix     = { "welcome" },
    wrong_prefix  = { "cfg:welcome" },
    unknown       = { "config:music" },
    empty         = { "" },
)]
fn from_channel_rejects(channel: &str) {
    assert_eq!(ConfigModule::from_channel(channel), None);
}

#[test]
fn message_wire_shape_is_camel_case() {
    let msg = ConfigUpdateMessage::new(
        ConfigModule::Welcome,
        GuildId::new("42"),
        ConfigAction::Update,
        1_700_000_000_000,
    );
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "guildId": "42",
            "module": "welcome",
            "action": "update",
            "timestamp": 1_700_000_000_000i64,
        })
    );
    assert_eq!(msg.channel(), "config:welcome");
}

#[test]
fn action_parses_from_cli_text() {
    assert_eq!("delete".parse::<ConfigAction>(), Ok(ConfigAction::Delete));
    let err = "purge".parse::<ConfigAction>().unwrap_err();
    assert_eq!(err.to_string(), "unknown config action: purge");
}
