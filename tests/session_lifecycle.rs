use std::collections::HashMap;

use approx::assert_abs_diff_eq;
use chrono::Duration;
use poker_settle::auth::{CodeIssuer, OutboxChannel, Permission, Role};
use poker_settle::clock::{Clock, ManualClock};
use poker_settle::config::EngineConfig;
use poker_settle::core::Cents;
use poker_settle::errors::{SessionError, SettlementError};
use poker_settle::ledger::GameConfig;
use poker_settle::notify::{NullNotifier, RecordingNotifier, Severity};
use poker_settle::session::{SessionController, SessionStatus};
use poker_settle::store::DirectoryStore;

fn controller_at(
    dir: &std::path::Path,
    clock: &ManualClock,
    notifier: &RecordingNotifier,
) -> SessionController {
    SessionController::builder()
        .store(Box::new(DirectoryStore::new(dir.to_path_buf())))
        .clock(Box::new(clock.clone()))
        .notifier(Box::new(notifier.clone()))
        .build()
        .unwrap()
}

#[test_log::test]
fn test_home_game_from_login_to_history() {
    let dir = tempfile::TempDir::new().unwrap();
    let clock = ManualClock::default();
    let notifier = RecordingNotifier::new();
    let config = EngineConfig::default();

    let mut game = controller_at(dir.path(), &clock, &notifier);
    game.bootstrap_super_admin("Host@Example.com").unwrap();
    let host = game.directory().operator_for("host@example.com");
    game.invite_user(&host, "dealer@example.com", Role::Admin)
        .unwrap();
    game.invite_user(&host, "rail@example.com", Role::Viewer)
        .unwrap();

    // The dealer logs in with a one-time code
    let outbox = OutboxChannel::new();
    let mut codes = CodeIssuer::new(
        Box::new(outbox.clone()),
        config.code_ttl(),
        config.login_ttl(),
    );
    codes
        .issue(game.directory(), "dealer@example.com", clock.now())
        .unwrap();
    let code = outbox.last_code_for("dealer@example.com").unwrap();
    let login = codes
        .verify(game.directory(), "dealer@example.com", &code, clock.now())
        .unwrap();
    let dealer = login.operator(game.directory(), clock.now());
    assert_eq!(dealer.permission, Permission::Admin);

    let rail = game.directory().operator_for("rail@example.com");
    assert!(matches!(
        game.start(&rail),
        Err(SessionError::Unauthorized { .. })
    ));

    game.start(&dealer).unwrap();
    let alice = game.add_player(&dealer, "Alice").unwrap();
    let bob = game.add_player(&dealer, "Bob").unwrap();
    let carol = game.add_player(&dealer, " Carol ").unwrap();
    for id in [alice, alice, bob, carol, carol, carol] {
        game.add_buyin(&dealer, id).unwrap();
    }
    game.set_current_chips_str(&dealer, bob, "not a number")
        .unwrap();
    assert_eq!(game.ledger().player(bob).unwrap().current_chips, 0);
    assert_eq!(
        game.ledger().player(carol).unwrap().total_spent,
        Cents::new(6000)
    );

    clock.advance(Duration::minutes(150));
    game.begin_settlement(&dealer).unwrap();
    let finals = HashMap::from([(alice, 360), (bob, 0), (carol, 240)]);
    let result = game.settle(&dealer, finals).unwrap();

    assert_abs_diff_eq!(result.chip_value, 0.2, epsilon = 1e-12);
    assert_abs_diff_eq!(result.player(alice).unwrap().profit, 32.0, epsilon = 1e-9);
    assert_abs_diff_eq!(result.player(bob).unwrap().profit, -20.0, epsilon = 1e-9);
    assert_abs_diff_eq!(result.player(carol).unwrap().profit, -12.0, epsilon = 1e-9);
    assert!(result.is_zero_sum());
    let lines: Vec<String> = result.payments.iter().map(|p| p.to_string()).collect();
    assert_eq!(
        lines,
        vec!["Bob pays Alice $20.00", "Carol pays Alice $12.00"]
    );
    assert!(result.to_markdown().contains("- **Value per Chip**: $0.2000"));

    let record = game.end(&dealer).unwrap();
    assert_eq!(record.completed_by, "dealer@example.com");
    assert_eq!(record.duration(), Duration::minutes(150));
    assert_eq!(game.status(), SessionStatus::Ended);
    assert!(game.ledger().is_empty());

    // Everything survives a restart from the same directory
    drop(game);
    let reopened = controller_at(dir.path(), &clock, &RecordingNotifier::new());
    assert_eq!(reopened.history().len(), 1);
    assert_eq!(reopened.history().latest(), Some(&record));
    assert_eq!(reopened.directory().users().len(), 3);
    assert_eq!(reopened.status(), SessionStatus::Ended);

    let severities: Vec<Severity> = notifier.notices().into_iter().map(|(_, s)| s).collect();
    assert_eq!(
        severities,
        vec![Severity::Success, Severity::Info, Severity::Info]
    );
}

#[test_log::test]
fn test_interrupted_session_resumes() {
    let dir = tempfile::TempDir::new().unwrap();
    let clock = ManualClock::default();
    let admin = poker_settle::auth::Operator::new("host@example.com", Permission::Admin);

    let (alice, bob) = {
        let mut game = controller_at(dir.path(), &clock, &RecordingNotifier::new());
        game.update_config(&admin, GameConfig::new(200, 50.0).unwrap())
            .unwrap();
        game.start(&admin).unwrap();
        let alice = game.add_player(&admin, "Alice").unwrap();
        let bob = game.add_player(&admin, "Bob").unwrap();
        game.add_buyin(&admin, alice).unwrap();
        game.add_buyin(&admin, bob).unwrap();
        (alice, bob)
    };

    clock.advance(Duration::minutes(20));
    let notifier = RecordingNotifier::new();
    let mut game = controller_at(dir.path(), &clock, &notifier);
    assert_eq!(game.status(), SessionStatus::Active);
    assert_eq!(game.game_config().chips_per_buyin, 200);
    assert_eq!(game.ledger().total_buyins(), 2);
    assert!(notifier.messages()[0].ends_with("resumed (20 min active)"));

    assert_eq!(game.end(&admin), Err(SessionError::SettlementRequired));
    assert_eq!(
        game.settle(&admin, HashMap::from([(alice, 400)])),
        Err(SessionError::Settlement(
            SettlementError::IncompleteSettlementInput { player: bob }
        ))
    );

    // Settling the chips everyone still holds is a break-even game
    let result = game.settle(&admin, game.current_chip_counts()).unwrap();
    assert!(result.payments.is_empty());
    assert!(
        result
            .to_markdown()
            .contains("No settlements needed - all players broke even!")
    );
    game.end(&admin).unwrap();
    assert_eq!(game.history().len(), 1);
}

#[test]
fn test_restore_shortcut_reads_existing_store() {
    let dir = tempfile::TempDir::new().unwrap();
    let admin = poker_settle::auth::Operator::new("host@example.com", Permission::SuperAdmin);
    {
        let mut game = SessionController::builder()
            .store(Box::new(DirectoryStore::new(dir.path().to_path_buf())))
            .notifier(Box::new(NullNotifier))
            .build()
            .unwrap();
        game.add_player(&admin, "Alice").unwrap();
    }

    let game =
        SessionController::restore(Box::new(DirectoryStore::new(dir.path().to_path_buf())))
            .unwrap();
    assert!(game.ledger().find_by_name("alice").is_some());
    assert_eq!(game.status(), SessionStatus::Inactive);
}
