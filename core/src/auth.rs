//! Email/password authentication and session binding.
//!
//! The provider only answers "who is this"; everything else a session
//! carries (tier, institution) comes from the `users/{id}` profile.

use crate::{
    error::HubError,
    hub::LiveHub,
    model::UserProfile,
    path::DocPath,
    session::Session,
    types::{Identity, Tier},
};
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::Utc;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid:   Identity,
    pub email: String,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email already in use")]
    EmailAlreadyInUse,

    #[error("password shorter than {min} characters")]
    WeakPassword { min: usize },

    #[error("auth provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Hub(#[from] HubError),
}

/// Which form the error is shown on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    SignIn,
    SignUp,
}

impl AuthError {
    /// Text shown to the person at the keyboard.
    pub fn user_message(&self, flow: AuthFlow) -> String {
        match self {
            Self::InvalidCredentials => "Invalid email or password.".into(),
            Self::EmailAlreadyInUse => "Email already in use.".into(),
            Self::WeakPassword { min } => format!("Password should be at least {min} characters."),
            Self::Provider(_) | Self::Hub(_) => match flow {
                AuthFlow::SignIn => "Sign in failed. Please try again.".into(),
                AuthFlow::SignUp => "Failed to create account. Please try again.".into(),
            },
        }
    }
}

pub trait AuthProvider {
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;
    fn sign_up(&mut self, email: &str, password: &str) -> Result<AuthUser, AuthError>;
}

struct Account {
    uid:           Identity,
    /// Argon2 PHC string; carries its own salt and parameters.
    password_hash: String,
}

/// In-memory accounts keyed by lowercased email.
pub struct LocalAuthProvider {
    accounts:         HashMap<String, Account>,
    min_password_len: usize,
    argon2:           Argon2<'static>,
}

impl LocalAuthProvider {
    pub fn new(min_password_len: usize) -> Self {
        Self {
            accounts: HashMap::new(),
            min_password_len,
            argon2: Argon2::default(),
        }
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Provider(e.to_string()))?;
        Ok(self.argon2.verify_password(password.as_bytes(), &parsed).is_ok())
    }
}

impl AuthProvider for LocalAuthProvider {
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let key = email.trim().to_lowercase();
        let account = self.accounts.get(&key).ok_or(AuthError::InvalidCredentials)?;
        if !self.verify_password(password, &account.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(AuthUser { uid: account.uid.clone(), email: key })
    }

    fn sign_up(&mut self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let key = email.trim().to_lowercase();
        if key.is_empty() || !key.contains('@') {
            return Err(AuthError::Provider(format!("malformed email '{email}'")));
        }
        if password.chars().count() < self.min_password_len {
            return Err(AuthError::WeakPassword { min: self.min_password_len });
        }
        if self.accounts.contains_key(&key) {
            return Err(AuthError::EmailAlreadyInUse);
        }
        let password_hash = self.hash_password(password)?;
        let uid = Uuid::new_v4().simple().to_string();
        self.accounts.insert(key.clone(), Account { uid: uid.clone(), password_hash });
        Ok(AuthUser { uid, email: key })
    }
}

impl LiveHub {
    /// Authenticate and bind the session. Subscriptions of any previous
    /// identity are revoked.
    pub fn sign_in(
        &mut self,
        provider: &dyn AuthProvider,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let user = provider.sign_in(email, password)?;
        let profile: UserProfile = self
            .store()
            .get_document(&DocPath::user(&user.uid)?)?
            .map(|doc| serde_json::from_value(doc.data))
            .transpose()
            .map_err(HubError::from)?
            .unwrap_or_default();
        let session = self.session_for(user, &profile);
        Ok(self.bind(session))
    }

    /// Create the account, write its profile and bind the session.
    pub fn sign_up(
        &mut self,
        provider: &mut dyn AuthProvider,
        email: &str,
        password: &str,
        display_name: &str,
        tier: Tier,
    ) -> Result<Session, AuthError> {
        let user = provider.sign_up(email, password)?;
        let profile = UserProfile {
            uid: user.uid.clone(),
            email: Some(user.email.clone()),
            display_name: Some(display_name.to_string()),
            tier: Some(tier.as_str().to_string()),
            institution_id: None,
            created_at: Some(Utc::now()),
        };
        self.store().set_document(&DocPath::user(&user.uid)?, &profile)?;
        log::info!("created account {} ({tier})", user.uid);
        let session = self.session_for(user, &profile);
        Ok(self.bind(session))
    }

    pub fn sign_out(&mut self) {
        self.set_session(None);
    }

    fn session_for(&self, user: AuthUser, profile: &UserProfile) -> Session {
        let tier = profile
            .tier
            .as_deref()
            .and_then(Tier::from_claim)
            .unwrap_or_default();
        let mut session = Session::new(user.uid, tier, user.email);
        session.display_name = profile.display_name.clone();
        if tier == Tier::Institution {
            let inst = profile
                .institution_id
                .clone()
                .unwrap_or_else(|| self.config().default_institution_id.clone());
            session = session.with_institution(inst);
        }
        session
    }

    fn bind(&mut self, session: Session) -> Session {
        self.set_session(Some(session.clone()));
        session
    }
}
