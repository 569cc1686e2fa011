//! Sign-up, sign-in and session binding.

use finguard_core::{
    auth::{AuthError, AuthFlow, AuthProvider, LocalAuthProvider},
    error::HubResult,
    hub::LiveHub,
    model::UserProfile,
    path::DocPath,
    types::Tier,
};
use serde_json::json;

fn provider() -> LocalAuthProvider {
    LocalAuthProvider::new(6)
}

#[test]
fn sign_up_writes_profile_and_binds_session() -> HubResult<()> {
    let mut hub = LiveHub::build_test()?;
    let mut auth = provider();

    let session = hub
        .sign_up(&mut auth, "Alice@Example.com", "hunter22", "Alice", Tier::Analyst)
        .expect("sign up");
    assert_eq!(session.tier, Tier::Analyst);
    assert_eq!(session.email, "alice@example.com");
    assert_eq!(hub.session().map(|s| s.identity.as_str()), Some(session.identity.as_str()));

    let profile: UserProfile = hub
        .read_document(&DocPath::user(&session.identity)?)?
        .expect("profile written");
    assert_eq!(profile.uid, session.identity);
    assert_eq!(profile.display_name.as_deref(), Some("Alice"));
    assert_eq!(profile.tier.as_deref(), Some("analyst"));
    assert!(profile.created_at.is_some());
    Ok(())
}

#[test]
fn sign_in_resolves_tier_from_profile() -> HubResult<()> {
    let mut hub = LiveHub::build_test()?;
    let mut auth = provider();
    let created = hub
        .sign_up(&mut auth, "bank@example.com", "secret-pass", "Bank", Tier::Consumer)
        .expect("sign up");
    hub.sign_out();
    assert!(hub.session().is_none());

    // Bulk-loaded profiles use the B2x spelling.
    hub.store()
        .merge_document(&DocPath::user(&created.identity)?, &json!({ "tier": "B2B" }))?;

    let session = hub
        .sign_in(&auth, "bank@example.com", "secret-pass")
        .expect("sign in");
    assert_eq!(session.tier, Tier::Institution);
    assert_eq!(
        session.institution_id.as_deref(),
        Some(hub.config().default_institution_id.as_str())
    );

    hub.store()
        .merge_document(&DocPath::user(&created.identity)?, &json!({ "institutionId": "acme" }))?;
    let session = hub
        .sign_in(&auth, "bank@example.com", "secret-pass")
        .expect("sign in");
    assert_eq!(session.institution_id.as_deref(), Some("acme"));
    Ok(())
}

#[test]
fn unknown_or_missing_tier_claim_defaults_to_consumer() -> HubResult<()> {
    let mut hub = LiveHub::build_test()?;
    let mut auth = provider();
    let created = auth.sign_up("x@example.com", "password1").expect("account");
    hub.store()
        .set_document(&DocPath::user(&created.uid)?, &json!({ "tier": "platinum" }))?;
    let session = hub.sign_in(&auth, "x@example.com", "password1").expect("sign in");
    assert_eq!(session.tier, Tier::Consumer);

    // No profile document at all.
    auth.sign_up("y@example.com", "password2").expect("account");
    let session = hub.sign_in(&auth, "y@example.com", "password2").expect("sign in");
    assert_eq!(session.tier, Tier::Consumer);
    assert!(session.institution_id.is_none());
    Ok(())
}

#[test]
fn auth_errors_map_to_user_messages() {
    let mut auth = provider();
    auth.sign_up("alice@example.com", "hunter22").expect("account");

    let weak = auth.sign_up("bob@example.com", "12345").unwrap_err();
    assert!(matches!(weak, AuthError::WeakPassword { min: 6 }));
    assert_eq!(weak.user_message(AuthFlow::SignUp), "Password should be at least 6 characters.");

    let taken = auth.sign_up("ALICE@example.com", "another-pass").unwrap_err();
    assert!(matches!(taken, AuthError::EmailAlreadyInUse));
    assert_eq!(taken.user_message(AuthFlow::SignUp), "Email already in use.");

    let wrong = auth.sign_in("alice@example.com", "hunter23").unwrap_err();
    assert_eq!(wrong.user_message(AuthFlow::SignIn), "Invalid email or password.");
    let unknown = auth.sign_in("nobody@example.com", "hunter22").unwrap_err();
    assert!(matches!(unknown, AuthError::InvalidCredentials));

    let malformed = auth.sign_up("not-an-email", "hunter22").unwrap_err();
    assert_eq!(
        malformed.user_message(AuthFlow::SignUp),
        "Failed to create account. Please try again."
    );
    assert_eq!(malformed.user_message(AuthFlow::SignIn), "Sign in failed. Please try again.");
    assert_eq!(auth.account_count(), 1);
}

#[test]
fn weak_password_message_uses_configured_minimum() {
    let mut auth = LocalAuthProvider::new(10);
    let err = auth.sign_up("carol@example.com", "short-pw").unwrap_err();
    assert!(matches!(err, AuthError::WeakPassword { min: 10 }));
    assert_eq!(err.user_message(AuthFlow::SignUp), "Password should be at least 10 characters.");
}

#[test]
fn passwords_verify_against_salted_hashes() {
    let mut auth = provider();
    let a = auth.sign_up("a@example.com", "same-password").expect("account");
    let b = auth.sign_up("b@example.com", "same-password").expect("account");
    assert_ne!(a.uid, b.uid);

    assert_eq!(auth.sign_in("a@example.com", "same-password").expect("sign in").uid, a.uid);
    assert_eq!(auth.sign_in(" B@Example.com ", "same-password").expect("sign in").uid, b.uid);
    assert!(matches!(
        auth.sign_in("a@example.com", "same-passwore"),
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(auth.sign_in("a@example.com", ""), Err(AuthError::InvalidCredentials)));
}

#[test]
fn failed_sign_in_keeps_current_session() -> HubResult<()> {
    let mut hub = LiveHub::build_test()?;
    let mut auth = provider();
    let first = hub
        .sign_up(&mut auth, "alice@example.com", "hunter22", "Alice", Tier::Consumer)
        .expect("sign up");

    assert!(hub.sign_in(&auth, "alice@example.com", "wrong-pass").is_err());
    assert_eq!(hub.session().map(|s| s.identity.clone()), Some(first.identity));
    Ok(())
}

#[test]
fn sign_out_revokes_subscriptions() -> HubResult<()> {
    let mut hub = LiveHub::build_test()?;
    let mut auth = provider();
    let session = hub
        .sign_up(&mut auth, "alice@example.com", "hunter22", "Alice", Tier::Consumer)
        .expect("sign up");
    let live = hub.subscribe_document::<UserProfile>(DocPath::user(&session.identity)?)?;
    hub.dispatch()?;
    assert!(live.data().is_some());

    hub.sign_out();
    assert!(live.is_closed());
    assert!(live.data().is_none());
    assert_eq!(hub.subscription_count(), 0);
    Ok(())
}
