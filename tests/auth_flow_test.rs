//! Integration tests for signup, verification, login and promotion.

mod common;

use chrono::{Duration, Utc};

use common::{harness, TEST_CODE};
use ticketa_server::config::VerificationMode;
use ticketa_server::models::Role;
use ticketa_server::services::{AuthFlowError, SignupInput, SignupOutcome};
use ticketa_server::store::Store;

const VALID_CNPJ: &str = "11.222.333/0001-81";

fn signup_input(email: &str) -> SignupInput {
    SignupInput {
        name: "Alice Doe".to_string(),
        email: email.to_string(),
        password: "secret123".to_string(),
        role: None,
        company_name: None,
        cnpj: None,
    }
}

#[tokio::test]
async fn test_signup_sends_code_and_blocks_login_until_verified() {
    let h = harness(VerificationMode::Email);

    let outcome = h
        .state
        .auth
        .signup(signup_input("Alice@Example.com"))
        .await
        .unwrap();
    match outcome {
        SignupOutcome::VerificationSent { email, demo } => {
            assert_eq!(email, "alice@example.com");
            assert!(demo.is_none());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "alice@example.com");
    assert!(sent[0].html.contains(TEST_CODE));

    let stored = h
        .store
        .find_user_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.is_verified());
    assert_ne!(stored.verify_code_hash.as_deref(), Some(TEST_CODE));

    let err = h
        .state
        .auth
        .login("alice@example.com", "secret123")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::VerificationRequired));

    let session = h
        .state
        .auth
        .verify_email("alice@example.com", TEST_CODE)
        .await
        .unwrap();
    assert_eq!(session.user.role, Role::Attendee);
    assert!(session.user.email_verified_at.is_some());

    let claims = h.state.tokens.verify_token(&session.token).unwrap();
    assert_eq!(claims.sub, session.user.id);

    let session = h
        .state
        .auth
        .login("alice@example.com", "secret123")
        .await
        .unwrap();
    assert_eq!(session.user.email, "alice@example.com");
}

#[tokio::test]
async fn test_verified_email_cannot_sign_up_again() {
    let h = harness(VerificationMode::Email);
    h.state
        .auth
        .signup(signup_input("bob@example.com"))
        .await
        .unwrap();
    h.state
        .auth
        .verify_email("bob@example.com", TEST_CODE)
        .await
        .unwrap();

    let err = h
        .state
        .auth
        .signup(signup_input("bob@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::EmailInUse));
}

#[tokio::test]
async fn test_unverified_signup_can_be_repeated() {
    let h = harness(VerificationMode::Email);
    h.state
        .auth
        .signup(signup_input("carol@example.com"))
        .await
        .unwrap();

    let mut again = signup_input("carol@example.com");
    again.password = "another-secret".to_string();
    let err = h.state.auth.signup(again.clone()).await.unwrap_err();
    assert!(matches!(err, AuthFlowError::TooSoon));
    assert_eq!(h.mailer.sent().len(), 1);

    let mut user = h
        .store
        .find_user_by_email("carol@example.com")
        .await
        .unwrap()
        .unwrap();
    user.verify_code_expires_at = Some(Utc::now() + Duration::seconds(30));
    h.store.update_user(&user).await.unwrap();

    h.state.auth.signup(again).await.unwrap();
    assert_eq!(h.mailer.sent().len(), 2);

    h.state
        .auth
        .verify_email("carol@example.com", TEST_CODE)
        .await
        .unwrap();
    let login = h
        .state
        .auth
        .login("carol@example.com", "another-secret")
        .await;
    assert!(login.is_ok());
    assert!(matches!(
        h.state
            .auth
            .login("carol@example.com", "secret123")
            .await
            .unwrap_err(),
        AuthFlowError::InvalidCredentials
    ));
}

#[tokio::test]
async fn test_signup_validation_reports_fields() {
    let h = harness(VerificationMode::Email);
    let input = SignupInput {
        name: "Al".to_string(),
        email: "not-an-email".to_string(),
        password: "123".to_string(),
        role: Some(Role::Admin),
        company_name: None,
        cnpj: Some("12345678000100".to_string()),
    };

    let err = h.state.auth.signup(input).await.unwrap_err();
    let AuthFlowError::Invalid(issues) = err else {
        panic!("expected validation failure, got {err:?}");
    };
    let fields: Vec<&str> = issues.0.iter().map(|i| i.field.as_str()).collect();
    assert_eq!(fields, vec!["name", "email", "password", "role", "cnpj"]);
}

#[tokio::test]
async fn test_wrong_and_expired_codes_are_rejected() {
    let h = harness(VerificationMode::Email);
    h.state
        .auth
        .signup(signup_input("dave@example.com"))
        .await
        .unwrap();

    let err = h
        .state
        .auth
        .verify_email("dave@example.com", "654321")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::InvalidCode));

    let err = h
        .state
        .auth
        .verify_email("dave@example.com", "12ab56")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::Invalid(_)));

    let mut user = h
        .store
        .find_user_by_email("dave@example.com")
        .await
        .unwrap()
        .unwrap();
    user.verify_code_expires_at = Some(Utc::now() - Duration::seconds(1));
    h.store.update_user(&user).await.unwrap();

    let err = h
        .state
        .auth
        .verify_email("dave@example.com", TEST_CODE)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::CodeExpired));
}

#[tokio::test]
async fn test_verify_unknown_or_already_verified() {
    let h = harness(VerificationMode::Email);

    let err = h
        .state
        .auth
        .verify_email("ghost@example.com", TEST_CODE)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::NotFound));

    h.state
        .auth
        .signup(signup_input("erin@example.com"))
        .await
        .unwrap();
    h.state
        .auth
        .verify_email("erin@example.com", TEST_CODE)
        .await
        .unwrap();

    let err = h
        .state
        .auth
        .verify_email("erin@example.com", TEST_CODE)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::NoPendingVerification));
}

#[tokio::test]
async fn test_resend_respects_cooldown() {
    let h = harness(VerificationMode::Email);
    h.state
        .auth
        .signup(signup_input("frank@example.com"))
        .await
        .unwrap();

    let err = h
        .state
        .auth
        .resend_code("frank@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::TooSoon));
    assert_eq!(h.mailer.sent().len(), 1);

    let mut user = h
        .store
        .find_user_by_email("frank@example.com")
        .await
        .unwrap()
        .unwrap();
    user.verify_code_expires_at = Some(Utc::now() + Duration::seconds(30));
    h.store.update_user(&user).await.unwrap();

    let demo = h.state.auth.resend_code("frank@example.com").await.unwrap();
    assert!(demo.is_none());
    assert_eq!(h.mailer.sent().len(), 2);

    let user = h
        .store
        .find_user_by_email("frank@example.com")
        .await
        .unwrap()
        .unwrap();
    let expires_at = user.verify_code_expires_at.unwrap();
    assert!(expires_at > Utc::now() + Duration::minutes(14));
}

#[tokio::test]
async fn test_resend_rejects_unknown_and_verified() {
    let h = harness(VerificationMode::Email);

    let err = h
        .state
        .auth
        .resend_code("nobody@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::NotFound));

    h.state
        .auth
        .signup(signup_input("gina@example.com"))
        .await
        .unwrap();
    h.state
        .auth
        .verify_email("gina@example.com", TEST_CODE)
        .await
        .unwrap();

    let err = h
        .state
        .auth
        .resend_code("gina@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::AlreadyVerified));
}

#[tokio::test]
async fn test_demo_mode_exposes_code_without_mail() {
    let h = harness(VerificationMode::DemoExposeCode);

    let outcome = h
        .state
        .auth
        .signup(signup_input("hank@example.com"))
        .await
        .unwrap();
    let SignupOutcome::VerificationSent { demo: Some(demo), .. } = outcome else {
        panic!("expected demo code in outcome");
    };
    assert_eq!(demo.code, TEST_CODE);
    assert!(h.mailer.sent().is_empty());

    let demo = h.state.auth.resend_code("hank@example.com").await.unwrap();
    assert_eq!(demo.map(|d| d.code).as_deref(), Some(TEST_CODE));
}

#[tokio::test]
async fn test_auto_verify_returns_session() {
    let h = harness(VerificationMode::DemoAutoVerify);

    let outcome = h
        .state
        .auth
        .signup(signup_input("ivy@example.com"))
        .await
        .unwrap();
    let SignupOutcome::AutoVerified { token, user } = outcome else {
        panic!("expected auto-verified outcome");
    };
    assert!(user.email_verified_at.is_some());
    assert_eq!(h.state.tokens.verify_token(&token).unwrap().sub, user.id);
    let login = h.state.auth.login("ivy@example.com", "secret123").await;
    assert!(login.is_ok());
}

#[tokio::test]
async fn test_login_with_unknown_email_is_invalid_credentials() {
    let h = harness(VerificationMode::Email);
    let err = h
        .state
        .auth
        .login("nobody@example.com", "whatever")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::InvalidCredentials));
}

#[tokio::test]
async fn test_become_organizer() {
    let h = harness(VerificationMode::DemoAutoVerify);
    let SignupOutcome::AutoVerified { user, .. } =
        h.state
            .auth
            .signup(signup_input("jack@example.com"))
            .await
            .unwrap()
    else {
        panic!("expected auto-verified outcome");
    };

    let err = h
        .state
        .auth
        .become_organizer(user.id, "Jack Events", "11.111.111/1111-11")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::InvalidTaxId));

    let session = h
        .state
        .auth
        .become_organizer(user.id, "Jack Events", VALID_CNPJ)
        .await
        .unwrap();
    assert_eq!(session.user.role, Role::Organizer);
    assert_eq!(session.user.org_cnpj.as_deref(), Some("11222333000181"));
    let claims = h.state.tokens.verify_token(&session.token).unwrap();
    assert_eq!(claims.role, Role::Organizer);

    let err = h
        .state
        .auth
        .become_organizer(user.id, "Jack Events", VALID_CNPJ)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::AlreadyOrganizer));
}

#[tokio::test]
async fn test_tax_id_is_unique_across_organizers() {
    let h = harness(VerificationMode::DemoAutoVerify);
    let SignupOutcome::AutoVerified { user: first, .. } =
        h.state
            .auth
            .signup(signup_input("kate@example.com"))
            .await
            .unwrap()
    else {
        panic!("expected auto-verified outcome");
    };
    let SignupOutcome::AutoVerified { user: second, .. } =
        h.state
            .auth
            .signup(signup_input("liam@example.com"))
            .await
            .unwrap()
    else {
        panic!("expected auto-verified outcome");
    };

    h.state
        .auth
        .become_organizer(first.id, "Kate Shows", VALID_CNPJ)
        .await
        .unwrap();
    let err = h
        .state
        .auth
        .become_organizer(second.id, "Liam Shows", VALID_CNPJ)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::TaxIdInUse));
}
