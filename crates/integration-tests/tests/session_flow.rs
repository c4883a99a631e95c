//! Sign-up, sign-in and role routing against the fake backend.

use pedeai_client::ServiceError;
use pedeai_client::backend::{AuthEvent, BackendError, SignUpOutcome};
use pedeai_client::services::{Registration, Screen, SessionService};
use pedeai_core::{Email, Role, StoreStatus};
use pedeai_integration_tests::{FakeBackend, PASSWORD};
use secrecy::{ExposeSecret, SecretString};

fn registration(email: &str, role: Role) -> Registration {
    Registration {
        email: Email::parse(email).expect("email"),
        password: SecretString::from(PASSWORD),
        full_name: "Ana Souza".to_string(),
        role,
        cnpj: None,
        cnh: None,
    }
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_customer_signs_up_and_lands_on_customer_screen() {
    let fake = FakeBackend::start().await;
    let backend = fake.client();
    let sessions = SessionService::new(&backend);

    let registered = sessions
        .register(registration("ana@pedeai.app", Role::Client))
        .await
        .expect("register");

    assert!(matches!(registered.outcome, SignUpOutcome::SignedIn(_)));
    assert!(registered.company.is_none());
    assert_eq!(
        sessions.current_screen().await.expect("screen"),
        Screen::Customer
    );
}

#[tokio::test]
async fn test_store_registration_keeps_cnpj_and_starts_pending() {
    let fake = FakeBackend::start().await;
    let backend = fake.client();
    let sessions = SessionService::new(&backend);

    let mut store = registration("loja@pedeai.app", Role::Store);
    store.cnpj = Some("11.222.333/0001-81".to_string());
    sessions.register(store).await.expect("register");

    let profile = sessions
        .current_profile()
        .await
        .expect("profile query")
        .expect("profile");
    assert_eq!(profile.role, Role::Store);
    assert_eq!(profile.cnpj.as_deref(), Some("11222333000181"));
    assert_eq!(profile.status, Some(StoreStatus::Pending));
    assert_eq!(Screen::for_profile(Some(&profile)), Screen::StoreAdmin);
}

#[tokio::test]
async fn test_invalid_documents_never_reach_the_backend() {
    let fake = FakeBackend::start().await;
    let backend = fake.client();
    let sessions = SessionService::new(&backend);

    let mut store = registration("loja@pedeai.app", Role::Store);
    store.cnpj = Some("11.111.111/1111-11".to_string());
    let err = sessions.register(store).await.expect_err("repeated cnpj");
    assert!(matches!(err, ServiceError::Validation(_)));

    let mut courier = registration("moto@pedeai.app", Role::Courier);
    courier.cnh = Some("   ".to_string());
    let err = sessions.register(courier).await.expect_err("blank cnh");
    assert!(matches!(err, ServiceError::Validation(_)));

    assert!(fake.rows("profiles").is_empty());
}

#[tokio::test]
async fn test_staff_cannot_self_register() {
    let fake = FakeBackend::start().await;
    let backend = fake.client();
    let sessions = SessionService::new(&backend);

    let err = sessions
        .register(registration("equipe@pedeai.app", Role::Staff))
        .await
        .expect_err("staff sign-up");
    assert!(matches!(err, ServiceError::Forbidden(_)));

    assert!(fake.rows("profiles").is_empty());
    assert!(backend.current_user().await.is_none());
    assert_eq!(
        sessions.current_screen().await.expect("screen"),
        Screen::Onboarding
    );
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let fake = FakeBackend::start().await;
    let backend = fake.client();
    let sessions = SessionService::new(&backend);

    sessions
        .register(registration("ana@pedeai.app", Role::Client))
        .await
        .expect("first registration");
    let err = sessions
        .register(registration("ana@pedeai.app", Role::Client))
        .await
        .expect_err("second registration");
    assert!(err.is_remote());
}

// =============================================================================
// Sign-in and sign-out
// =============================================================================

#[tokio::test]
async fn test_sign_in_routes_each_role() {
    let fake = FakeBackend::start().await;
    let cases = [
        ("cliente@pedeai.app", Role::Client, Screen::Customer),
        ("loja@pedeai.app", Role::Store, Screen::StoreAdmin),
        ("moto@pedeai.app", Role::Courier, Screen::Courier),
        ("staff@pedeai.app", Role::Staff, Screen::Staff),
    ];

    for (email, role, expected) in cases {
        let (registered, _) = fake.signed_in(email, role, "Teste").await;
        SessionService::new(&registered)
            .sign_out()
            .await
            .expect("sign out");

        let backend = fake.client();
        let (session, screen) = SessionService::new(&backend)
            .sign_in(
                &Email::parse(email).expect("email"),
                &SecretString::from(PASSWORD),
            )
            .await
            .expect("sign in");
        assert_eq!(screen, expected, "{email}");
        assert_eq!(session.user.email.as_deref(), Some(email));
    }
}

#[tokio::test]
async fn test_wrong_password_leaves_client_signed_out() {
    let fake = FakeBackend::start().await;
    fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;

    let backend = fake.client();
    let result = SessionService::new(&backend)
        .sign_in(
            &Email::parse("ana@pedeai.app").expect("email"),
            &SecretString::from("wrong-password"),
        )
        .await;

    assert!(result.is_err());
    assert!(backend.current_user().await.is_none());
}

#[tokio::test]
async fn test_sign_out_returns_to_onboarding() {
    let fake = FakeBackend::start().await;
    let (backend, _) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;
    let sessions = SessionService::new(&backend);

    assert_eq!(sessions.sign_out().await.expect("sign out"), Screen::Onboarding);
    assert!(backend.current_user().await.is_none());
    assert_eq!(
        sessions.current_screen().await.expect("screen"),
        Screen::Onboarding
    );
}

// =============================================================================
// Token refresh and auth events
// =============================================================================

#[tokio::test]
async fn test_refresh_rotates_the_session() {
    let fake = FakeBackend::start().await;
    let (backend, user_id) = fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;
    let before = backend.session().await.expect("session");

    let refreshed = backend.refresh_session().await.expect("refresh");
    assert_eq!(refreshed.user.id, user_id);
    assert_ne!(
        refreshed.access_token.expose_secret(),
        before.access_token.expose_secret()
    );
    assert_ne!(
        refreshed.refresh_token.expose_secret(),
        before.refresh_token.expose_secret()
    );

    let stored = backend.session().await.expect("stored session");
    assert_eq!(
        stored.access_token.expose_secret(),
        refreshed.access_token.expose_secret()
    );
    assert_eq!(backend.get_user().await.expect("user").id, user_id);

    // The rotated token keeps working.
    backend.refresh_session().await.expect("second refresh");
}

#[tokio::test]
async fn test_auth_events_follow_the_session() {
    let fake = FakeBackend::start().await;
    fake.signed_in("ana@pedeai.app", Role::Client, "Ana").await;

    let backend = fake.client();
    let mut events = backend.auth_events();
    assert_eq!(*events.borrow_and_update(), AuthEvent::SignedOut);

    let (session, _) = SessionService::new(&backend)
        .sign_in(
            &Email::parse("ana@pedeai.app").expect("email"),
            &SecretString::from(PASSWORD),
        )
        .await
        .expect("sign in");
    let user_id = session.user.id;
    events.changed().await.expect("sign-in event");
    assert_eq!(*events.borrow_and_update(), AuthEvent::SignedIn(user_id));

    backend.refresh_session().await.expect("refresh");
    events.changed().await.expect("refresh event");
    assert_eq!(*events.borrow_and_update(), AuthEvent::TokenRefreshed(user_id));

    SessionService::new(&backend)
        .sign_out()
        .await
        .expect("sign out");
    events.changed().await.expect("sign-out event");
    assert_eq!(*events.borrow_and_update(), AuthEvent::SignedOut);

    assert!(matches!(
        backend.get_user().await,
        Err(BackendError::NotSignedIn)
    ));
    assert!(matches!(
        backend.refresh_session().await,
        Err(BackendError::NotSignedIn)
    ));
}
