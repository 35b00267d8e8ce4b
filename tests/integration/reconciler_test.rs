// tests/integration/reconciler_test.rs

//! Integration tests for pool reconciliation
//! Tests: pool creation, option drift, replica enrollment, authority rules, check mode

use super::test_helpers::*;
use warden_reconcile::core::{Endpoint, WardenError};
use warden_reconcile::core::protocol::RespFrame;
use warden_reconcile::sentinel::action::Action;
use warden_reconcile::sentinel::pool_option::PoolOption;
use warden_reconcile::sentinel::{Mode, reconcile_pool};

fn commands(calls: &[Call]) -> Vec<String> {
    calls.iter().map(|c| c.command.clone()).collect()
}

// ===== Pool Presence =====

#[tokio::test]
async fn test_authority_creates_missing_pool_and_enrolls_replicas() {
    let exec = ScriptedExecutor::new();
    exec.on_seq(
        &authority(),
        "SENTINEL MASTER",
        vec![no_such_master(&authority()), cache_report(&member(1), &[])],
    )
    .on(&member(1), "PING", pong())
    .on(&authority(), "SENTINEL MONITOR", ok())
    .on(&authority(), "SENTINEL SET", ok())
    .on(&authority(), "SENTINEL GET-MASTER-ADDR-BY-NAME", master_addr(&member(1)))
    .on(&authority(), "SENTINEL SLAVES", replica_list(&[]))
    .on(&member(2), "REPLICAOF", ok())
    .on(&member(3), "REPLICAOF", ok());

    let report = reconcile_pool(&exec, &desired(), &authority(), "cache", Mode::Fix)
        .await
        .unwrap();

    let mutations = exec.mutating_calls();
    assert_eq!(
        commands(&mutations),
        vec![
            "SENTINEL MONITOR cache 10.0.0.1 6379 2",
            "SENTINEL SET cache auth-pass s3cret",
            "REPLICAOF 10.0.0.1 6379",
            "REPLICAOF 10.0.0.1 6379",
        ]
    );
    assert_eq!(mutations[2].endpoint, member(2));
    assert_eq!(mutations[3].endpoint, member(3));
    assert_eq!(mutations[2].auth.as_deref(), Some("s3cret"));
    // Monitors never see the pool secret as a connection credential.
    assert!(
        mutations[..2].iter().all(|c| c.auth.is_none() && c.endpoint == authority())
    );

    let ping = &exec.calls_matching("PING")[0];
    assert_eq!(ping.endpoint, member(1));
    assert_eq!(ping.auth.as_deref(), Some("s3cret"));

    assert_eq!(report.applied.len(), 4);
    assert!(matches!(report.applied[0], Action::CreatePool { quorum: 2, .. }));
    assert!(report.tolerated.is_empty());
}

#[tokio::test]
async fn test_follower_creates_pool_with_authoritys_master() {
    let exec = ScriptedExecutor::new();
    exec.on_seq(
        &follower(),
        "SENTINEL MASTER",
        vec![no_such_master(&follower()), cache_report(&member(2), &[])],
    )
    .on(&authority(), "SENTINEL GET-MASTER-ADDR-BY-NAME", master_addr(&member(2)))
    .on(&member(2), "PING", pong())
    .on(&follower(), "SENTINEL MONITOR", ok())
    .on(&follower(), "SENTINEL SET", ok());

    let report = reconcile_pool(&exec, &desired(), &follower(), "cache", Mode::Fix)
        .await
        .unwrap();

    let mutations = exec.mutating_calls();
    assert_eq!(
        commands(&mutations),
        vec![
            "SENTINEL MONITOR cache 10.0.0.2 6379 2",
            "SENTINEL SET cache auth-pass s3cret",
        ]
    );
    assert!(mutations.iter().all(|c| c.endpoint == follower()));
    assert!(report.applied.iter().all(|a| !a.mutates_roles()));
    // Declared order is ignored once the authority knows a master.
    assert!(exec.calls_matching("PING").iter().all(|c| c.endpoint == member(2)));
}

#[tokio::test]
async fn test_check_mode_reports_missing_pool() {
    let exec = ScriptedExecutor::new();
    exec.on(&authority(), "SENTINEL MASTER", no_such_master(&authority()));

    let err = reconcile_pool(&exec, &desired(), &authority(), "cache", Mode::Check)
        .await
        .unwrap_err();

    assert_eq!(err, WardenError::Drift("pool cache is missing".into()));
    assert_eq!(err.exit_code(), 1);
    assert!(exec.mutating_calls().is_empty());
    assert!(exec.calls_matching("PING").is_empty());
}

#[tokio::test]
async fn test_unresponsive_master_candidate_blocks_creation() {
    let exec = ScriptedExecutor::new();
    exec.on(&authority(), "SENTINEL MASTER", no_such_master(&authority()))
        .on(&member(1), "PING", refused(&member(1), "NOAUTH Authentication required."))
        .on(&authority(), "SENTINEL MONITOR", ok());

    let err = reconcile_pool(&exec, &desired(), &authority(), "cache", Mode::Fix)
        .await
        .unwrap_err();

    assert!(matches!(err, WardenError::Unreachable { ref endpoint, .. } if endpoint == "10.0.0.1:6379"));
    assert_eq!(err.exit_code(), 1);
    assert!(exec.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_down_master_candidate_blocks_creation() {
    let exec = ScriptedExecutor::new();
    exec.on(&authority(), "SENTINEL MASTER", no_such_master(&authority()))
        .on(&authority(), "SENTINEL MONITOR", ok());

    let err = reconcile_pool(&exec, &desired(), &authority(), "cache", Mode::Fix)
        .await
        .unwrap_err();

    assert!(matches!(err, WardenError::Unreachable { .. }));
    assert!(exec.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_follower_without_authority_master_fails() {
    let exec = ScriptedExecutor::new();
    exec.on(&follower(), "SENTINEL MASTER", no_such_master(&follower()))
        .on(&authority(), "SENTINEL GET-MASTER-ADDR-BY-NAME", Ok(RespFrame::NullArray));

    let err = reconcile_pool(&exec, &desired(), &follower(), "cache", Mode::Fix)
        .await
        .unwrap_err();

    assert_eq!(err, WardenError::MasterNotFound { pool: "cache".into() });
    assert_eq!(err.exit_code(), 1);
    assert!(exec.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_pool_still_missing_after_monitor_is_an_error() {
    let exec = ScriptedExecutor::new();
    exec.on(&authority(), "SENTINEL MASTER", no_such_master(&authority()))
        .on(&member(1), "PING", pong())
        .on(&authority(), "SENTINEL MONITOR", ok());

    let err = reconcile_pool(&exec, &desired(), &authority(), "cache", Mode::Fix)
        .await
        .unwrap_err();

    assert!(matches!(err, WardenError::CommandFailed { .. }));
    assert_eq!(commands(&exec.mutating_calls()), vec!["SENTINEL MONITOR cache 10.0.0.1 6379 2"]);
}

// ===== Options =====

#[tokio::test]
async fn test_follower_corrects_option_drift_without_touching_roles() {
    let exec = ScriptedExecutor::new();
    exec.on(
        &follower(),
        "SENTINEL MASTER",
        cache_report(&member(1), &[("down-after-milliseconds", "5000")]),
    )
    .on(&follower(), "SENTINEL SET", ok());

    let report = reconcile_pool(&exec, &desired(), &follower(), "cache", Mode::Fix)
        .await
        .unwrap();

    assert_eq!(
        commands(&exec.mutating_calls()),
        vec![
            "SENTINEL SET cache down-after-milliseconds 30000",
            "SENTINEL SET cache auth-pass s3cret",
        ]
    );
    assert!(exec.calls().iter().all(|c| c.endpoint == follower()));
    assert!(exec.calls_matching("SENTINEL SLAVES").is_empty());
    assert_eq!(
        report.applied[0],
        Action::SetOption {
            pool: "cache".into(),
            option: PoolOption::DownAfterMilliseconds,
            value: "30000".into(),
        }
    );
}

#[tokio::test]
async fn test_options_are_corrected_in_canonical_order() {
    let exec = ScriptedExecutor::new();
    exec.on(
        &follower(),
        "SENTINEL MASTER",
        cache_report(
            &member(1),
            &[
                ("failover-timeout", "60000"),
                ("quorum", "1"),
                ("notification-script", "/bin/notify.sh"),
                ("client-reconfig-script", "/bin/reconf.sh"),
            ],
        ),
    )
    .on(&follower(), "SENTINEL SET", ok());

    reconcile_pool(&exec, &desired(), &follower(), "cache", Mode::Fix)
        .await
        .unwrap();

    assert_eq!(
        commands(&exec.mutating_calls()),
        vec![
            "SENTINEL SET cache quorum 2",
            "SENTINEL SET cache failover-timeout 180000",
            "SENTINEL SET cache notification-script ",
            "SENTINEL SET cache auth-pass s3cret",
        ]
    );
}

#[tokio::test]
async fn test_check_mode_stops_at_first_option_drift() {
    let exec = ScriptedExecutor::new();
    exec.on(
        &follower(),
        "SENTINEL MASTER",
        cache_report(
            &member(1),
            &[("parallel-syncs", "4"), ("failover-timeout", "1")],
        ),
    );

    let err = reconcile_pool(&exec, &desired(), &follower(), "cache", Mode::Check)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        WardenError::Drift("option parallel_syncs has wrong value 4".into())
    );
    assert!(exec.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_failed_option_write_aborts_run() {
    let exec = ScriptedExecutor::new();
    exec.on(
        &follower(),
        "SENTINEL MASTER",
        cache_report(&member(1), &[("parallel-syncs", "4")]),
    )
    .on(&follower(), "SENTINEL SET", refused(&follower(), "ERR Invalid argument"));

    let err = reconcile_pool(&exec, &desired(), &follower(), "cache", Mode::Fix)
        .await
        .unwrap_err();

    assert!(matches!(err, WardenError::CommandFailed { .. }));
    assert_eq!(exec.calls_matching("SENTINEL SET").len(), 1);
}

// ===== Replicas =====

#[tokio::test]
async fn test_enrollment_follows_failed_over_master() {
    let exec = ScriptedExecutor::new();
    exec.on(&authority(), "SENTINEL MASTER", cache_report(&member(2), &[]))
        .on(&authority(), "SENTINEL SET", ok())
        .on(&authority(), "SENTINEL GET-MASTER-ADDR-BY-NAME", master_addr(&member(2)))
        .on(&authority(), "SENTINEL SLAVES", replica_list(&[&member(3)]))
        .on(&member(1), "REPLICAOF", ok());

    let report = reconcile_pool(&exec, &desired(), &authority(), "cache", Mode::Fix)
        .await
        .unwrap();

    let enrollments = exec.calls_matching("REPLICAOF");
    assert_eq!(enrollments.len(), 1);
    assert_eq!(enrollments[0].endpoint, member(1));
    assert_eq!(enrollments[0].command, "REPLICAOF 10.0.0.2 6379");
    assert!(exec.calls_matching("SENTINEL MONITOR").is_empty());
    assert_eq!(
        report.applied.last(),
        Some(&Action::EnrollReplica {
            pool: "cache".into(),
            replica: member(1),
            master: member(2),
        })
    );
}

#[tokio::test]
async fn test_unreachable_member_enrollment_is_tolerated() {
    let exec = ScriptedExecutor::new();
    exec.on(&authority(), "SENTINEL MASTER", cache_report(&member(1), &[]))
        .on(&authority(), "SENTINEL SET", ok())
        .on(&authority(), "SENTINEL GET-MASTER-ADDR-BY-NAME", master_addr(&member(1)))
        .on(&authority(), "SENTINEL SLAVES", replica_list(&[]))
        .on(&member(2), "REPLICAOF", ok());
    // member 3 has no script and behaves as down.

    let report = reconcile_pool(&exec, &desired(), &authority(), "cache", Mode::Fix)
        .await
        .unwrap();

    assert_eq!(exec.calls_matching("REPLICAOF").len(), 2);
    assert_eq!(report.tolerated.len(), 1);
    let (action, err) = &report.tolerated[0];
    assert_eq!(action.target(&authority()), &member(3));
    assert!(matches!(err, WardenError::Unreachable { .. }));
    assert!(report.applied.iter().any(|a| a.target(&authority()) == &member(2)));
}

#[tokio::test]
async fn test_refused_enrollment_is_tolerated() {
    let exec = ScriptedExecutor::new();
    exec.on(&authority(), "SENTINEL MASTER", cache_report(&member(1), &[]))
        .on(&authority(), "SENTINEL SET", ok())
        .on(&authority(), "SENTINEL GET-MASTER-ADDR-BY-NAME", master_addr(&member(1)))
        .on(&authority(), "SENTINEL SLAVES", replica_list(&[&member(3)]))
        .on(
            &member(2),
            "REPLICAOF",
            refused(&member(2), "ERR REPLICAOF not allowed in cluster mode."),
        );

    let report = reconcile_pool(&exec, &desired(), &authority(), "cache", Mode::Fix)
        .await
        .unwrap();

    assert_eq!(report.tolerated.len(), 1);
    let (action, err) = &report.tolerated[0];
    assert_eq!(
        action,
        &Action::EnrollReplica {
            pool: "cache".into(),
            replica: member(2),
            master: member(1),
        }
    );
    assert!(matches!(err, WardenError::CommandFailed { .. }));
    assert!(report.applied.iter().all(|a| !a.mutates_roles()));
}

#[tokio::test]
async fn test_check_mode_reports_unenrolled_member() {
    let exec = ScriptedExecutor::new();
    exec.on(&authority(), "SENTINEL MASTER", cache_report(&member(1), &[]))
        .on(&authority(), "SENTINEL GET-MASTER-ADDR-BY-NAME", master_addr(&member(1)))
        .on(&authority(), "SENTINEL SLAVES", replica_list(&[&member(2)]));

    let err = reconcile_pool(&exec, &desired(), &authority(), "cache", Mode::Check)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        WardenError::Drift("10.0.0.3:6379 not configured as replica".into())
    );
    assert!(exec.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_follower_never_reads_or_touches_replicas() {
    let exec = ScriptedExecutor::new();
    exec.on(&follower(), "SENTINEL MASTER", cache_report(&member(1), &[]));

    let report = reconcile_pool(&exec, &desired(), &follower(), "cache", Mode::Check)
        .await
        .unwrap();

    assert!(report.is_noop());
    assert_eq!(commands(&exec.calls()), vec!["SENTINEL MASTER cache"]);
}

// ===== Convergence =====

#[tokio::test]
async fn test_converged_pool_passes_check_without_writes() {
    let exec = ScriptedExecutor::new();
    exec.on(&authority(), "SENTINEL MASTER", cache_report(&member(1), &[]))
        .on(&authority(), "SENTINEL GET-MASTER-ADDR-BY-NAME", master_addr(&member(1)))
        .on(&authority(), "SENTINEL SLAVES", replica_list(&[&member(2), &member(3)]));

    let report = reconcile_pool(&exec, &desired(), &authority(), "cache", Mode::Check)
        .await
        .unwrap();

    assert!(report.is_noop());
    assert!(exec.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_second_fix_run_only_reasserts_auth() {
    let exec = ScriptedExecutor::new();
    exec.on_seq(
        &authority(),
        "SENTINEL MASTER",
        vec![
            cache_report(&member(1), &[("down-after-milliseconds", "5000")]),
            cache_report(&member(1), &[]),
        ],
    )
    .on(&authority(), "SENTINEL SET", ok())
    .on(&authority(), "SENTINEL GET-MASTER-ADDR-BY-NAME", master_addr(&member(1)))
    .on_seq(
        &authority(),
        "SENTINEL SLAVES",
        vec![replica_list(&[]), replica_list(&[&member(2), &member(3)])],
    )
    .on(&member(2), "REPLICAOF", ok())
    .on(&member(3), "REPLICAOF", ok());

    let first = reconcile_pool(&exec, &desired(), &authority(), "cache", Mode::Fix)
        .await
        .unwrap();
    assert_eq!(first.applied.len(), 4);
    let after_first = exec.mutating_calls().len();

    let second = reconcile_pool(&exec, &desired(), &authority(), "cache", Mode::Fix)
        .await
        .unwrap();

    assert_eq!(
        second.applied,
        vec![Action::SetOption {
            pool: "cache".into(),
            option: PoolOption::AuthPass,
            value: "s3cret".into(),
        }]
    );
    assert_eq!(
        commands(&exec.mutating_calls()[after_first..]),
        vec!["SENTINEL SET cache auth-pass s3cret"]
    );
}

#[tokio::test]
async fn test_pool_without_secret_pings_without_auth() {
    let exec = ScriptedExecutor::new();
    let store = Endpoint::new("10.0.1.1", 6379);
    exec.on_seq(
        &authority(),
        "SENTINEL MASTER",
        vec![
            no_such_master(&authority()),
            pool_report("sessions", &store, &[("num-slaves", "0")]),
        ],
    )
    .on(&store, "PING", pong())
    .on(&authority(), "SENTINEL MONITOR", ok())
    .on(&authority(), "SENTINEL SET", ok())
    .on(&authority(), "SENTINEL GET-MASTER-ADDR-BY-NAME", master_addr(&store))
    .on(&authority(), "SENTINEL SLAVES", replica_list(&[]));

    reconcile_pool(&exec, &desired(), &authority(), "sessions", Mode::Fix)
        .await
        .unwrap();

    assert_eq!(exec.calls_matching("PING")[0].auth, None);
    assert_eq!(
        commands(&exec.mutating_calls()),
        vec![
            "SENTINEL MONITOR sessions 10.0.1.1 6379 2",
            "SENTINEL SET sessions auth-pass ",
        ]
    );
}

#[tokio::test]
async fn test_undeclared_tunables_keep_monitor_values() {
    let store = Endpoint::new("10.0.1.1", 6379);
    let report = || {
        pool_report(
            "sessions",
            &store,
            &[
                ("down-after-milliseconds", "5000"),
                ("notification-script", "/var/lib/notify.sh"),
            ],
        )
    };

    let exec = ScriptedExecutor::new();
    exec.on(&follower(), "SENTINEL MASTER", report());
    let check = reconcile_pool(&exec, &desired(), &follower(), "sessions", Mode::Check)
        .await
        .unwrap();
    assert!(check.is_noop());
    assert!(exec.mutating_calls().is_empty());

    let exec = ScriptedExecutor::new();
    exec.on(&follower(), "SENTINEL MASTER", report())
        .on(&follower(), "SENTINEL SET", ok());
    for _ in 0..2 {
        let fix = reconcile_pool(&exec, &desired(), &follower(), "sessions", Mode::Fix)
            .await
            .unwrap();
        assert_eq!(fix.applied.len(), 1);
    }
    assert_eq!(
        commands(&exec.mutating_calls()),
        vec![
            "SENTINEL SET sessions auth-pass ",
            "SENTINEL SET sessions auth-pass ",
        ]
    );
}

#[tokio::test]
async fn test_check_mode_flags_declared_option_missing_from_report() {
    let exec = ScriptedExecutor::new();
    exec.on(
        &follower(),
        "SENTINEL MASTER",
        without(cache_report(&member(1), &[]), &["failover-timeout"]),
    );

    let err = reconcile_pool(&exec, &desired(), &follower(), "cache", Mode::Check)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        WardenError::Drift("option failover_timeout has wrong value <unset>".into())
    );
    assert!(exec.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_fix_mode_sets_declared_option_missing_from_report() {
    let exec = ScriptedExecutor::new();
    exec.on(
        &follower(),
        "SENTINEL MASTER",
        without(cache_report(&member(1), &[]), &["failover-timeout"]),
    )
    .on(&follower(), "SENTINEL SET", ok());

    reconcile_pool(&exec, &desired(), &follower(), "cache", Mode::Fix)
        .await
        .unwrap();

    assert_eq!(
        commands(&exec.mutating_calls()),
        vec![
            "SENTINEL SET cache failover-timeout 180000",
            "SENTINEL SET cache auth-pass s3cret",
        ]
    );
}

#[tokio::test]
async fn test_declared_empty_option_is_satisfied_by_absence() {
    let exec = ScriptedExecutor::new();
    // The converged report carries no notification-script at all.
    exec.on(&follower(), "SENTINEL MASTER", cache_report(&member(1), &[]));

    let report = reconcile_pool(&exec, &desired(), &follower(), "cache", Mode::Check)
        .await
        .unwrap();

    assert!(report.is_noop());
}

// ===== Failures =====

#[tokio::test]
async fn test_undeclared_pool_is_invalid_config() {
    let exec = ScriptedExecutor::new();

    let err = reconcile_pool(&exec, &desired(), &authority(), "nope", Mode::Check)
        .await
        .unwrap_err();

    assert!(matches!(err, WardenError::ConfigInvalid(_)));
    assert_eq!(err.exit_code(), 2);
    assert!(exec.calls().is_empty());
}

#[tokio::test]
async fn test_unreachable_monitor_fails_run() {
    let exec = ScriptedExecutor::new();

    let err = reconcile_pool(&exec, &desired(), &authority(), "cache", Mode::Fix)
        .await
        .unwrap_err();

    assert!(matches!(err, WardenError::Unreachable { .. }));
    assert_eq!(exec.calls().len(), 1);
}
