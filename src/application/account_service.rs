use std::sync::Arc;

use crate::domain::auth::Role;
use crate::domain::errors::DomainError;
use crate::domain::ports::{Mailer, PasswordHasher, TokenIssuer, UserRepository};
use crate::domain::user::{validate_email, validate_password, NewUser, SignUp, UserRecord};

pub const RESET_LINK_SENT: &str = "A password-reset link has been sent to the email you specified";
pub const PASSWORD_RESET_DONE: &str = "Password reset was successful";

#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub user: UserRecord,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
    mailer: Arc<dyn Mailer>,
    frontend_url: String,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
        mailer: Arc<dyn Mailer>,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            mailer,
            frontend_url: frontend_url.into(),
        }
    }

    pub fn signup(&self, input: SignUp) -> Result<Session, DomainError> {
        input.validate()?;
        let password_hash = self.hasher.hash(&input.password)?;
        let user = self.users.create(NewUser {
            email: input.email.trim().to_lowercase(),
            password_hash,
            first_name: input.first_name,
            last_name: input.last_name,
            phone: input.phone,
            role: Role::Client,
        })?;
        log::info!("Registered user {}", user.id);
        let access_token = self.tokens.issue_access(&user.principal())?;
        Ok(Session { access_token, user })
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Session, DomainError> {
        let user = self
            .users
            .find_by_email(&email.trim().to_lowercase())?
            .ok_or_else(|| DomainError::NotFound("No user with such email exists".to_string()))?;

        if !self.hasher.verify(password, &user.password_hash)? {
            return Err(DomainError::Unauthorized("Invalid credentials".to_string()));
        }
        let access_token = self.tokens.issue_access(&user.principal())?;
        Ok(Session { access_token, user })
    }

    /// Mails a reset link when the address belongs to a user. The reply is the
    /// same either way so the endpoint does not reveal which emails exist.
    pub fn forgot_password(&self, email: &str) -> Result<&'static str, DomainError> {
        validate_email(email)?;
        if let Some(user) = self.users.find_by_email(&email.trim().to_lowercase())? {
            let token = self.tokens.issue_reset(&user.principal())?;
            let reset_url = format!(
                "{}/reset-password?token={}",
                self.frontend_url.trim_end_matches('/'),
                token
            );
            self.mailer.send_password_reset(&user.email, &reset_url)?;
        }
        Ok(RESET_LINK_SENT)
    }

    pub fn reset_password(
        &self,
        reset_token: &str,
        new_password: &str,
    ) -> Result<&'static str, DomainError> {
        let principal = self.tokens.verify_reset(reset_token)?;
        validate_password(new_password)?;
        let password_hash = self.hasher.hash(new_password)?;
        self.users.update_password(principal.user_id, password_hash)?;
        log::info!("Password reset for user {}", principal.user_id);
        Ok(PASSWORD_RESET_DONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{FakeTokens, InMemoryStore, PlainHasher, RecordingMailer};

    struct Fixture {
        store: Arc<InMemoryStore>,
        mailer: Arc<RecordingMailer>,
        accounts: AccountService,
    }

    fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let mailer = Arc::new(RecordingMailer::default());
        let accounts = AccountService::new(
            store.clone(),
            Arc::new(PlainHasher),
            Arc::new(FakeTokens),
            mailer.clone(),
            "https://shop.example.com/",
        );
        Fixture {
            store,
            mailer,
            accounts,
        }
    }

    fn signup(email: &str) -> SignUp {
        SignUp {
            email: email.to_string(),
            password: "hunter2hunter2".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            phone: "555-0100".to_string(),
        }
    }

    #[test]
    fn signup_creates_client_and_returns_token() {
        let f = fixture();
        let session = f.accounts.signup(signup("Grace@Example.com")).unwrap();

        assert_eq!(session.user.role, Role::Client);
        assert_eq!(session.user.email, "grace@example.com");
        assert!(session.user.cart_id.is_some());
        assert_eq!(session.access_token, format!("access:{}:client", session.user.id));
    }

    #[test]
    fn login_distinguishes_unknown_email_and_bad_password() {
        let f = fixture();
        f.accounts.signup(signup("grace@example.com")).unwrap();

        assert!(matches!(
            f.accounts.login("nobody@example.com", "whatever"),
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            f.accounts.login("grace@example.com", "wrong password"),
            Err(DomainError::Unauthorized(_))
        ));
        assert!(f.accounts.login("grace@example.com", "hunter2hunter2").is_ok());
    }

    #[test]
    fn forgot_password_is_silent_for_unknown_email() {
        let f = fixture();
        let message = f.accounts.forgot_password("ghost@example.com").unwrap();

        assert_eq!(message, RESET_LINK_SENT);
        assert!(f.mailer.sent().is_empty());
    }

    #[test]
    fn forgot_password_mails_reset_link() {
        let f = fixture();
        let user = f.accounts.signup(signup("grace@example.com")).unwrap().user;

        let message = f.accounts.forgot_password("grace@example.com").unwrap();

        assert_eq!(message, RESET_LINK_SENT);
        let sent = f.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "grace@example.com");
        assert_eq!(
            sent[0].1,
            format!("https://shop.example.com/reset-password?token=reset:{}", user.id)
        );
    }

    #[test]
    fn reset_password_replaces_hash() {
        let f = fixture();
        let user = f.accounts.signup(signup("grace@example.com")).unwrap().user;

        f.accounts
            .reset_password(&format!("reset:{}", user.id), "a brand new secret")
            .unwrap();

        assert!(f.accounts.login("grace@example.com", "a brand new secret").is_ok());
        assert!(f.store.user_count() == 1);
    }

    #[test]
    fn reset_password_rejects_access_tokens() {
        let f = fixture();
        let user = f.accounts.signup(signup("grace@example.com")).unwrap().user;

        assert!(matches!(
            f.accounts
                .reset_password(&format!("access:{}", user.id), "a brand new secret"),
            Err(DomainError::Unauthorized(_))
        ));
    }
}
