use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use collab_realtime::{
    error::RealtimeError,
    session_guard::{
        GuardOutcome, GuardState, NO_SESSION_NOTICE, ROOMS_ROUTE, SESSION_EXPIRED_NOTICE,
        SessionGuard, SessionMembership, SessionValidator, room_route,
    },
    types::Result,
};

enum Reply {
    Member { active: bool },
    Nobody,
    Fails,
    Expired,
    Hangs,
}

struct FakeValidator {
    reply: Reply,
    calls: Arc<AtomicUsize>,
}

impl FakeValidator {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SessionValidator for FakeValidator {
    async fn validate(&self, room_id: Option<&str>) -> Result<Option<SessionMembership>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.reply {
            Reply::Member { active } => Ok(Some(SessionMembership {
                session_id: String::from(room_id.unwrap_or("S9")),
                participant_id: String::from("u1"),
                active,
            })),
            Reply::Nobody => Ok(None),
            Reply::Fails => Err(RealtimeError::RequestFailed {
                status: 500,
                message: String::from("boom"),
            }),
            Reply::Expired => Err(RealtimeError::SessionExpired),
            Reply::Hangs => std::future::pending().await,
        }
    }
}

fn assert_rejected(outcome: &GuardOutcome) {
    assert_eq!(
        *outcome,
        GuardOutcome::Redirect {
            route: String::from(ROOMS_ROUTE),
            notice: String::from(NO_SESSION_NOTICE),
        }
    );
}

#[tokio::test]
async fn starts_loading_and_blocks_rendering() {
    let guard = SessionGuard::new(FakeValidator::new(Reply::Nobody));
    assert_eq!(guard.state(), GuardState::Loading);
    assert!(guard.is_loading());
    assert!(!guard.can_render());
}

#[tokio::test]
async fn active_membership_enters_canonical_room() {
    let guard = SessionGuard::new(FakeValidator::new(Reply::Member { active: true }));

    let outcome = guard.check(Some("R1")).await;

    let (route, membership) = match outcome {
        GuardOutcome::Enter { route, membership } => (route, membership),
        other => panic!("expected to enter the room, got {other:?}"),
    };
    assert_eq!(route, room_route("R1"));
    assert_eq!(route, "/planning-poker/room/R1");
    assert_eq!(guard.state(), GuardState::ActiveSession(membership));
    assert!(guard.can_render());
    assert!(!guard.is_loading());
}

#[tokio::test]
async fn validates_without_room_id() {
    let guard = SessionGuard::new(FakeValidator::new(Reply::Member { active: true }));
    let outcome = guard.check(None).await;
    assert!(matches!(outcome, GuardOutcome::Enter { ref route, .. } if route == "/planning-poker/room/S9"));
}

#[tokio::test]
async fn missing_membership_never_renders() {
    let guard = SessionGuard::new(FakeValidator::new(Reply::Nobody));
    let mut states = guard.watch();

    let outcome = guard.check(Some("R1")).await;

    assert_rejected(&outcome);
    assert_eq!(guard.state(), GuardState::NoSession);
    assert!(!guard.can_render());
    assert!(states.has_changed().expect("guard alive"));
    assert_eq!(*states.borrow_and_update(), GuardState::NoSession);
}

#[tokio::test]
async fn inactive_membership_is_no_session() {
    let guard = SessionGuard::new(FakeValidator::new(Reply::Member { active: false }));
    assert_rejected(&guard.check(Some("R1")).await);
    assert!(!guard.can_render());
}

#[tokio::test]
async fn validation_errors_redirect_with_notice() {
    let guard = SessionGuard::new(FakeValidator::new(Reply::Fails));
    assert_rejected(&guard.check(Some("R1")).await);
    assert_eq!(guard.state(), GuardState::NoSession);
}

#[tokio::test]
async fn expired_session_goes_to_login() {
    let guard = SessionGuard::new(FakeValidator::new(Reply::Expired));

    let outcome = guard.check(Some("R1")).await;

    assert_eq!(
        outcome,
        GuardOutcome::Redirect {
            route: String::from("/login"),
            notice: String::from(SESSION_EXPIRED_NOTICE),
        }
    );
    assert_eq!(guard.state(), GuardState::NoSession);
    assert!(!guard.can_render());
}

#[tokio::test(start_paused = true)]
async fn hung_validation_times_out() {
    let guard = SessionGuard::new(FakeValidator::new(Reply::Hangs))
        .with_timeout(Duration::from_secs(3));
    let mut states = guard.watch();

    let check = guard.check(Some("R1"));
    tokio::pin!(check);

    tokio::select! {
        _ = &mut check => panic!("validation should still be pending"),
        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
    }
    assert_eq!(*states.borrow_and_update(), GuardState::Validating);
    assert!(guard.is_loading());
    assert!(!guard.can_render());

    assert_rejected(&check.await);
    assert_eq!(guard.state(), GuardState::NoSession);
}

#[tokio::test]
async fn every_check_revalidates() {
    let validator = FakeValidator::new(Reply::Member { active: true });
    let calls = Arc::clone(&validator.calls);
    let guard = SessionGuard::new(validator);

    guard.check(Some("R1")).await;
    guard.check(Some("R1")).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
