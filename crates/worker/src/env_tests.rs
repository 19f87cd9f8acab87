// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn reads_full_environment() {
    let worker_env = WorkerEnv::from_lookup(lookup(&[
        (env::TENANT_ID, "t1"),
        (env::TOKEN, "secret-token"),
        (env::CLIENT_ID, "app-1"),
        (env::DATABASE_URL, "postgresql://db/fleet?schema=tenant_t1"),
        (env::REDIS_URL, "redis://cache:6379"),
    ]))
    .unwrap();

    assert_eq!(worker_env.tenant_id, "t1");
    assert_eq!(worker_env.token, "secret-token");
    assert_eq!(worker_env.client_id.as_deref(), Some("app-1"));
    assert_eq!(worker_env.redis_url.as_deref(), Some("redis://cache:6379"));
}

#[yare::parameterized(
    no_tenant = { &[(env::TOKEN, "tok")], env::TENANT_ID },
    no_token = { &[(env::TENANT_ID, "t1")], env::TOKEN },
    blank_token = { &[(env::TENANT_ID, "t1"), (env::TOKEN, " ")], env::TOKEN },
)]
fn missing_required_variable(pairs: &[(&str, &str)], missing: &'static str) {
    let err = WorkerEnv::from_lookup(lookup(pairs)).unwrap_err();
    assert_eq!(err, EnvError::Missing(missing));
}

#[test]
fn optional_variables_may_be_absent() {
    let worker_env =
        WorkerEnv::from_lookup(lookup(&[(env::TENANT_ID, "t1"), (env::TOKEN, "tok")])).unwrap();
    assert!(worker_env.client_id.is_none());
    assert!(worker_env.database_url.is_none());
    assert!(worker_env.redis_url.is_none());
}

#[test]
fn debug_output_hides_token() {
    let worker_env = WorkerEnv::from_lookup(lookup(&[
        (env::TENANT_ID, "t1"),
        (env::TOKEN, "secret-token"),
        (env::DATABASE_URL, "postgresql://user:pw@db/fleet"),
    ]))
    .unwrap();
    let debug = format!("{worker_env:?}");
    assert!(!debug.contains("secret-token"));
    assert!(!debug.contains("pw@db"));
}
