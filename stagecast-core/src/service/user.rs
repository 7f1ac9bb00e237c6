use crate::models::{User, UserId};
use crate::repository::UserRepository;
use crate::service::auth::{hash_password, verify_password, SessionTokenService};
use crate::{Error, Result};

/// Registration and login for dashboard users
#[derive(Clone)]
pub struct UserService {
    users: UserRepository,
    sessions: SessionTokenService,
}

impl UserService {
    pub fn new(users: UserRepository, sessions: SessionTokenService) -> Self {
        Self { users, sessions }
    }

    /// Register a new user and issue a session token
    pub async fn register(&self, email: &str, name: &str, password: &str) -> Result<(User, String)> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::InvalidInput("A valid email is required".to_string()));
        }
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("Name is required".to_string()));
        }
        if password.len() < 8 {
            return Err(Error::InvalidInput(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let password_hash = hash_password(password).await?;
        let user = self
            .users
            .create(&User::new(email, name.trim().to_string(), password_hash))
            .await?;

        let token = self.sessions.sign(&user.id)?;
        tracing::info!(user_id = %user.id, "User registered");

        Ok((user, token))
    }

    /// Verify credentials and issue a session token
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String)> {
        let email = email.trim().to_lowercase();

        let Some(user) = self.users.get_by_email(&email).await? else {
            // Burn a verification anyway so the timing does not reveal
            // whether the account exists
            let _ = verify_password(password, DUMMY_HASH).await;
            return Err(Error::Authentication("Invalid email or password".to_string()));
        };

        if !verify_password(password, &user.password_hash).await? {
            return Err(Error::Authentication("Invalid email or password".to_string()));
        }

        let token = self.sessions.sign(&user.id)?;
        Ok((user, token))
    }

    /// Load a user by ID (current-user endpoint)
    pub async fn get_by_id(&self, user_id: &UserId) -> Result<User> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    /// Verify a session token and return the user ID it names
    pub fn verify_session(&self, token: &str) -> Result<UserId> {
        Ok(self.sessions.verify(token)?.user_id())
    }
}

// Argon2id hash of an unused password, for constant-ish-time login failures
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$MDEyMzQ1Njc4OWFiY2RlZg$GpZ3sK/oz9OIqy5zo6bJBtESJJcKLS5hl9B5EOh7H5s";

#[cfg(test)]
mod tests {
    #[test]
    fn test_dummy_hash_is_phc_formatted() {
        assert!(super::DUMMY_HASH.starts_with("$argon2id$"));
    }
}
