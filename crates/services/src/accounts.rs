//! # AccountService
//!
//! Registration, login, token authentication and author profiles.

use std::sync::Arc;

use domains::validation::{FieldErrors, REQUIRED, USERNAME_TAKEN};
use domains::{
    Author, DomainError, DomainResult, NewUser, PasswordHasher, ProfilePatch, TokenIssuer, UserId,
    UserRepository, NAME_MAX_CHARS, NAME_MIN_CHARS, PASSWORD_MIN_CHARS, PROFILE_IMAGE_MAX_CHARS,
    USERNAME_MAX_CHARS, USERNAME_MIN_CHARS,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::permissions::{AccessPolicy, Operation, Subject};

pub const DEFAULT_PROFILE_IMAGE: &str = "https://storyweave.invalid/static/images/default.jpg";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Login {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image: Option<String>,
}

/// A successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub username: String,
}

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
    default_profile_image: String,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            default_profile_image: DEFAULT_PROFILE_IMAGE.to_string(),
        }
    }

    pub fn with_default_profile_image(mut self, url: impl Into<String>) -> Self {
        self.default_profile_image = url.into();
        self
    }

    #[instrument(skip_all, fields(username = registration.username.as_deref()))]
    pub async fn register(&self, registration: Registration) -> DomainResult<Author> {
        let username = registration.username.map(|u| u.trim().to_string());
        let first_name = registration.first_name.map(|n| n.trim().to_string());
        let last_name = registration.last_name.map(|n| n.trim().to_string());
        let password = registration.password;

        let mut errors = FieldErrors::new();
        errors.require_length("username", username.as_deref(), USERNAME_MIN_CHARS, USERNAME_MAX_CHARS);
        errors.require_length("first_name", first_name.as_deref(), NAME_MIN_CHARS, NAME_MAX_CHARS);
        errors.require_length("last_name", last_name.as_deref(), NAME_MIN_CHARS, NAME_MAX_CHARS);
        match password.as_deref() {
            None => errors.add("password", REQUIRED),
            Some(p) if p.chars().count() < PASSWORD_MIN_CHARS => errors.add(
                "password",
                format!("Ensure this field has at least {PASSWORD_MIN_CHARS} characters."),
            ),
            Some(_) => {}
        }
        if let Some(username) = username.as_deref() {
            if errors.get("username").is_none()
                && self.users.find_credentials(username).await?.is_some()
            {
                errors.add("username", USERNAME_TAKEN);
            }
        }
        errors.into_result()?;

        let hasher = Arc::clone(&self.hasher);
        let password = password.unwrap_or_default();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(DomainError::internal)??;
        let author = self
            .users
            .create_user(NewUser {
                username: username.unwrap_or_default(),
                first_name: first_name.unwrap_or_default(),
                last_name: last_name.unwrap_or_default(),
                password_hash,
                profile_image: self.default_profile_image.clone(),
            })
            .await?;

        info!(user_id = author.id(), "user registered");
        Ok(author)
    }

    #[instrument(skip_all, fields(username = login.username.as_deref()))]
    pub async fn login(&self, login: Login) -> DomainResult<Session> {
        let mut errors = FieldErrors::new();
        if login.username.is_none() {
            errors.add("username", REQUIRED);
        }
        if login.password.is_none() {
            errors.add("password", REQUIRED);
        }
        errors.into_result()?;

        let username = login.username.unwrap_or_default();
        let password = login.password.unwrap_or_default();

        let credentials = match self.users.find_credentials(username.trim()).await? {
            Some(credentials) => credentials,
            None => {
                warn!("login for unknown user");
                return Err(DomainError::InvalidCredentials);
            }
        };
        let hasher = Arc::clone(&self.hasher);
        let stored_hash = credentials.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash))
            .await
            .map_err(DomainError::internal)?;
        if !verified {
            warn!(user_id = credentials.user_id, "login with wrong password");
            return Err(DomainError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(credentials.user_id, &credentials.username)?;
        info!(user_id = credentials.user_id, "user logged in");

        Ok(Session {
            token,
            user_id: credentials.user_id,
            username: credentials.username,
        })
    }

    /// Resolves a bearer token to a user that still exists.
    pub async fn authenticate(&self, token: &str) -> DomainResult<UserId> {
        let user_id = self.tokens.verify(token)?;
        match self.users.find_author(user_id).await? {
            Some(_) => Ok(user_id),
            None => Err(DomainError::Unauthorized("user no longer exists".into())),
        }
    }

    pub async fn profile(&self, viewer: UserId, user_id: UserId) -> DomainResult<Author> {
        let author = self.load_author(user_id).await?;
        AccessPolicy::default().authorize(
            Operation::RetrieveProfile,
            viewer,
            &Subject::profile(author.id()),
        )?;
        Ok(author)
    }

    async fn load_author(&self, user_id: UserId) -> DomainResult<Author> {
        self.users
            .find_author(user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(user_id))
    }

    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        viewer: UserId,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> DomainResult<Author> {
        let current = self.load_author(user_id).await?;
        AccessPolicy::default().authorize(
            Operation::UpdateProfile,
            viewer,
            &Subject::profile(current.id()),
        )?;

        let patch = ProfilePatch {
            first_name: update.first_name.map(|n| n.trim().to_string()),
            last_name: update.last_name.map(|n| n.trim().to_string()),
            profile_image: update.profile_image.map(|u| u.trim().to_string()),
        };

        let mut errors = FieldErrors::new();
        if let Some(first_name) = patch.first_name.as_deref() {
            errors.check_length("first_name", first_name, NAME_MIN_CHARS, NAME_MAX_CHARS);
        }
        if let Some(last_name) = patch.last_name.as_deref() {
            errors.check_length("last_name", last_name, NAME_MIN_CHARS, NAME_MAX_CHARS);
        }
        if let Some(url) = patch.profile_image.as_deref() {
            errors.check_url("profile_image", url, PROFILE_IMAGE_MAX_CHARS);
        }
        errors.into_result()?;

        if patch.is_empty() {
            return Ok(current);
        }
        let author = self.users.update_profile(user_id, patch).await?;
        info!(user_id, "profile updated");
        Ok(author)
    }
}

#[cfg(test)]
mod tests {
    use domains::{
        Credentials, MockPasswordHasher, MockTokenIssuer, MockUserRepository, User,
    };
    use mockall::predicate::eq;
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn author(id: UserId, username: &str) -> Author {
        Author {
            user: User {
                id,
                username: username.into(),
                first_name: "Kendrick".into(),
                last_name: "Lamar".into(),
            },
            profile_image: DEFAULT_PROFILE_IMAGE.into(),
        }
    }

    fn service(
        users: MockUserRepository,
        hasher: MockPasswordHasher,
        tokens: MockTokenIssuer,
    ) -> AccountService {
        AccountService::new(Arc::new(users), Arc::new(hasher), Arc::new(tokens))
    }

    fn registration() -> Registration {
        Registration {
            username: Some("DAMN".into()),
            first_name: Some("Kendrick".into()),
            last_name: Some("Lamar".into()),
            password: Some("straightouttacompton".into()),
        }
    }

    #[tokio::test]
    async fn register_hashes_and_stores() {
        let mut users = MockUserRepository::new();
        users.expect_find_credentials().returning(|_| Ok(None));
        users
            .expect_create_user()
            .withf(|new| {
                new.username == "DAMN"
                    && new.password_hash == "hashed"
                    && new.profile_image == DEFAULT_PROFILE_IMAGE
            })
            .returning(|new| Ok(author(1, &new.username)));
        let mut hasher = MockPasswordHasher::new();
        hasher
            .expect_hash()
            .with(eq("straightouttacompton"))
            .returning(|_| Ok("hashed".into()));

        let svc = service(users, hasher, MockTokenIssuer::new());
        let author = assert_ok!(svc.register(registration()).await);
        assert_eq!(author.user.username, "DAMN");
    }

    #[tokio::test]
    async fn register_reports_every_invalid_field() {
        let mut users = MockUserRepository::new();
        users.expect_find_credentials().returning(|username| {
            Ok(Some(Credentials {
                user_id: 9,
                username: username.to_string(),
                password_hash: "x".into(),
            }))
        });
        users.expect_create_user().never();

        let svc = service(users, MockPasswordHasher::new(), MockTokenIssuer::new());
        let err = assert_err!(
            svc.register(Registration {
                first_name: Some("Jo".into()),
                last_name: None,
                password: Some("short".into()),
                ..registration()
            })
            .await
        );

        let DomainError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("username").unwrap(), [USERNAME_TAKEN]);
        assert_eq!(
            errors.get("first_name").unwrap(),
            ["Ensure this field has at least 3 characters."]
        );
        assert_eq!(errors.get("last_name").unwrap(), ["This field is required."]);
        assert_eq!(
            errors.get("password").unwrap(),
            ["Ensure this field has at least 6 characters."]
        );
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_rejected() {
        let mut users = MockUserRepository::new();
        users.expect_find_credentials().returning(|username| {
            Ok(Some(Credentials {
                user_id: 4,
                username: username.to_string(),
                password_hash: "hashed".into(),
            }))
        });
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_verify().returning(|_, _| false);
        let mut tokens = MockTokenIssuer::new();
        tokens.expect_issue().never();

        let svc = service(users, hasher, tokens);
        let err = assert_err!(
            svc.login(Login {
                username: Some("DAMN".into()),
                password: Some("nope".into()),
            })
            .await
        );
        assert!(matches!(err, DomainError::InvalidCredentials));
    }

    #[tokio::test]
    async fn login_issues_a_token() {
        let mut users = MockUserRepository::new();
        users.expect_find_credentials().returning(|username| {
            Ok(Some(Credentials {
                user_id: 4,
                username: username.to_string(),
                password_hash: "hashed".into(),
            }))
        });
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_verify().returning(|_, _| true);
        let mut tokens = MockTokenIssuer::new();
        tokens
            .expect_issue()
            .with(eq(4), eq("DAMN"))
            .returning(|_, _| Ok("token-abc".into()));

        let svc = service(users, hasher, tokens);
        let session = assert_ok!(
            svc.login(Login {
                username: Some("DAMN".into()),
                password: Some("straightouttacompton".into()),
            })
            .await
        );
        assert_eq!(
            session,
            Session {
                token: "token-abc".into(),
                user_id: 4,
                username: "DAMN".into(),
            }
        );
    }

    #[tokio::test]
    async fn only_the_owner_updates_a_profile() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_author()
            .returning(|id| Ok(Some(author(id, "owner"))));
        users.expect_update_profile().never();

        let svc = service(users, MockPasswordHasher::new(), MockTokenIssuer::new());
        let err = assert_err!(
            svc.update_profile(2, 1, ProfileUpdate::default()).await
        );
        assert!(matches!(
            err,
            DomainError::Forbidden(domains::Denial::NotPermitted)
        ));
    }

    #[tokio::test]
    async fn profile_image_must_be_a_url() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_author()
            .returning(|id| Ok(Some(author(id, "owner"))));
        users.expect_update_profile().never();

        let svc = service(users, MockPasswordHasher::new(), MockTokenIssuer::new());
        let err = assert_err!(
            svc.update_profile(
                1,
                1,
                ProfileUpdate {
                    profile_image: Some("not a url".into()),
                    ..ProfileUpdate::default()
                }
            )
            .await
        );
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn hashing_runs_off_the_async_worker() {
        let worker = std::thread::current().id();
        let mut users = MockUserRepository::new();
        users.expect_find_credentials().returning(|_| Ok(None));
        users
            .expect_create_user()
            .returning(|new| Ok(author(1, &new.username)));
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_hash().returning(move |_| {
            assert_ne!(std::thread::current().id(), worker);
            Ok("hashed".into())
        });

        let svc = service(users, hasher, MockTokenIssuer::new());
        assert_ok!(svc.register(registration()).await);
    }

    #[tokio::test]
    async fn any_user_reads_a_profile_but_missing_ones_are_404() {
        let mut users = MockUserRepository::new();
        users.expect_find_author().returning(|id| {
            Ok((id == 1).then(|| author(id, "owner")))
        });

        let svc = service(users, MockPasswordHasher::new(), MockTokenIssuer::new());
        let profile = assert_ok!(svc.profile(2, 1).await);
        assert_eq!(profile.user.username, "owner");

        let err = assert_err!(svc.profile(2, 7).await);
        assert!(matches!(err, DomainError::NotFound { entity: "user", id: 7 }));
    }

    #[tokio::test]
    async fn oversized_profile_image_is_rejected() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_author()
            .returning(|id| Ok(Some(author(id, "owner"))));
        users.expect_update_profile().never();

        let svc = service(users, MockPasswordHasher::new(), MockTokenIssuer::new());
        let err = assert_err!(
            svc.update_profile(
                1,
                1,
                ProfileUpdate {
                    profile_image: Some(format!("https://example.com/{}", "a".repeat(300))),
                    ..ProfileUpdate::default()
                }
            )
            .await
        );
        let DomainError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.get("profile_image").unwrap(),
            ["Ensure this field has no more than 200 characters."]
        );
    }
}
