//! Core business logic for the authentication system.
//!
//! Registration runs inside one transaction so the member row and its
//! default role grant are written together or not at all. Login and refresh
//! are plain reads followed by token issuance.

use std::sync::Arc;

use crate::auth::models::*;
use crate::auth::observer::{AuthObserver, AuthOperation};
use crate::database::models::{CreateMember, MemberStatus, Role};
use crate::database::{Db, DbTx};
use crate::errors::{ErrorClass, ServiceError, ServiceResult};
use crate::repositories::member_repository::MemberRepository;
use crate::repositories::role_repository::RoleRepository;
use crate::utils::jwt::JwtService;
use crate::utils::password::{PasswordError, PasswordHasher};

/// Authentication service for registration, login and token refresh
pub struct AuthService {
    jwt: Arc<JwtService>,
    hasher: PasswordHasher,
    observer: Arc<dyn AuthObserver>,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(
        jwt: Arc<JwtService>,
        hasher: PasswordHasher,
        observer: Arc<dyn AuthObserver>,
    ) -> Self {
        Self {
            jwt,
            hasher,
            observer,
        }
    }

    /// Register a new member with the default `USER` role.
    ///
    /// # Returns
    /// The ID assigned to the new member
    pub async fn register(&self, db: &Db, request: SignUpRequest) -> ServiceResult<i64> {
        match self.register_member(db, request).await {
            Ok(member_id) => {
                self.observer.succeeded(AuthOperation::Register, member_id);
                Ok(member_id)
            }
            Err(error) => Err(self.report(AuthOperation::Register, error)),
        }
    }

    /// Authenticate a member by email and password and issue a token pair.
    pub async fn login(&self, db: &mut Db, request: LoginRequest) -> ServiceResult<LoginResult> {
        match self.authenticate(db, request).await {
            Ok(result) => {
                self.observer.succeeded(AuthOperation::Login, result.member.id);
                Ok(result)
            }
            Err(error) => Err(self.report(AuthOperation::Login, error)),
        }
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh token itself is not rotated.
    pub async fn refresh(&self, db: &mut Db, refresh_token: &str) -> ServiceResult<RefreshResult> {
        match self.reissue_access(db, refresh_token).await {
            Ok(result) => {
                self.observer.succeeded(AuthOperation::Refresh, result.member.id);
                Ok(result)
            }
            Err(error) => Err(self.report(AuthOperation::Refresh, error)),
        }
    }

    /// Public projection of an admitted member, with roles read fresh.
    pub async fn current_member(&self, db: &mut Db, member_id: i64) -> ServiceResult<MemberResponse> {
        match self.load_member(db, member_id).await {
            Ok(member) => Ok(member),
            Err(error) => Err(self.report(AuthOperation::CurrentMember, error)),
        }
    }

    async fn register_member(&self, db: &Db, request: SignUpRequest) -> ServiceResult<i64> {
        validate_required(&request)?;

        // Hashed outside the transaction so the write lock is never held across bcrypt.
        let password_hash = self.hasher.hash(&request.password).await?;

        let mut tx = db.begin().await?;
        match self.insert_member(&mut tx, request, password_hash).await {
            Ok(member_id) => {
                tx.commit().await?;
                Ok(member_id)
            }
            Err(error) => {
                if let Err(rollback_error) = tx.rollback().await {
                    tracing::warn!(error = %rollback_error, "Failed to roll back registration");
                }
                Err(error)
            }
        }
    }

    async fn insert_member(
        &self,
        tx: &mut DbTx,
        request: SignUpRequest,
        password_hash: String,
    ) -> ServiceResult<i64> {
        let mut members = MemberRepository::new(tx);

        if members.find_by_email(&request.email).await?.is_some() {
            return Err(ServiceError::EmailAlreadyExists);
        }

        let member_id = members
            .create(CreateMember {
                email: request.email,
                password_hash,
                name: request.name,
                tel: request.tel,
                address: request.address,
                profile: request.profile,
                status: MemberStatus::Active,
            })
            .await
            .map_err(insert_error)?;

        RoleRepository::new(tx)
            .insert_member_role(member_id, Role::User)
            .await?;

        Ok(member_id)
    }

    async fn authenticate(&self, db: &mut Db, request: LoginRequest) -> ServiceResult<LoginResult> {
        validate_required(&request)?;

        let member = MemberRepository::new(db)
            .find_by_email(&request.email)
            .await?
            .ok_or(ServiceError::InvalidCredential)?;

        self.hasher
            .verify(&request.password, &member.password)
            .await
            .map_err(|error| match error {
                PasswordError::Mismatch => ServiceError::InvalidCredential,
                other => other.into(),
            })?;

        if !member.is_active() {
            return Err(ServiceError::InvalidCredential);
        }

        let roles = RoleRepository::new(db)
            .get_roles_by_member_id(member.member_id)
            .await?;
        let tokens = self.jwt.login(member.member_id)?;

        Ok(LoginResult {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            member: MemberResponse::new(&member, roles),
        })
    }

    async fn reissue_access(&self, db: &mut Db, refresh_token: &str) -> ServiceResult<RefreshResult> {
        let claims = self.jwt.verify_refresh(refresh_token)?;

        let member = MemberRepository::new(db)
            .find_by_id(claims.member_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Member", claims.member_id))?;

        if !member.is_active() {
            return Err(ServiceError::InvalidCredential);
        }

        let roles = RoleRepository::new(db)
            .get_roles_by_member_id(member.member_id)
            .await?;
        let access_token = self.jwt.issue_access(member.member_id)?;

        Ok(RefreshResult {
            access_token,
            member: MemberResponse::new(&member, roles),
        })
    }

    async fn load_member(&self, db: &mut Db, member_id: i64) -> ServiceResult<MemberResponse> {
        let member = MemberRepository::new(db)
            .find_by_id(member_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Member", member_id))?;

        let roles = RoleRepository::new(db)
            .get_roles_by_member_id(member_id)
            .await?;

        Ok(MemberResponse::new(&member, roles))
    }

    fn report(&self, operation: AuthOperation, error: ServiceError) -> ServiceError {
        match error.class() {
            ErrorClass::Validation => {}
            ErrorClass::Business => self.observer.business_error(operation, &error),
            ErrorClass::Internal => self.observer.service_error(operation, &error),
        }
        error
    }
}

/// A unique violation at insert means a concurrent registration won the race.
fn insert_error(error: sqlx::Error) -> ServiceError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            return ServiceError::EmailAlreadyExists;
        }
    }
    ServiceError::Database(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::observer::testing::{Event, RecordingObserver};
    use crate::database::{Execer, RequestMetrics, file_test_pool, test_pool};
    use crate::utils::jwt::TokenError;
    use chrono::Duration;
    use sqlx::{FromRow, SqlitePool};

    const ACCESS_SECRET: &[u8] = b"access-secret";
    const REFRESH_SECRET: &[u8] = b"refresh-secret";

    #[derive(FromRow)]
    struct Count {
        n: i64,
    }

    struct Harness {
        service: AuthService,
        jwt: Arc<JwtService>,
        observer: Arc<RecordingObserver>,
        db: Db,
        metrics: RequestMetrics,
    }

    fn jwt_service() -> Arc<JwtService> {
        Arc::new(JwtService::new(
            ACCESS_SECRET,
            REFRESH_SECRET,
            Duration::minutes(5),
            Duration::days(1),
        ))
    }

    async fn harness() -> Harness {
        let jwt = jwt_service();
        let observer = Arc::new(RecordingObserver::default());
        let metrics = RequestMetrics::new();

        Harness {
            service: AuthService::new(jwt.clone(), PasswordHasher::new(4), observer.clone()),
            jwt,
            observer,
            db: Db::new(test_pool().await, metrics.clone()),
            metrics,
        }
    }

    fn signup(email: &str, password: &str, name: &str) -> SignUpRequest {
        SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
            tel: None,
            address: None,
            profile: Some("hello".to_string()),
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            remember_me: false,
        }
    }

    async fn count(db: &mut Db, table: &str) -> i64 {
        let sql = format!("SELECT COUNT(*) AS n FROM {table}");
        db.fetch_optional(sqlx::query_as::<_, Count>(&sql))
            .await
            .unwrap()
            .map(|c| c.n)
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let mut h = harness().await;

        let member_id = h.service.register(&h.db, signup("a@x.com", "pw", "A")).await.unwrap();
        let result = h.service.login(&mut h.db, login("a@x.com", "pw")).await.unwrap();

        assert!(!result.access_token.is_empty());
        assert_eq!(result.member.id, member_id);
        assert_eq!(result.member.email, "a@x.com");
        assert_eq!(result.member.profile.as_deref(), Some("hello"));
        assert_eq!(result.member.roles, vec![Role::User]);

        assert_eq!(h.jwt.verify_access(&result.access_token).unwrap().member_id, member_id);
        assert_eq!(h.jwt.verify_refresh(&result.refresh_token).unwrap().member_id, member_id);

        assert_eq!(
            h.observer.events(),
            vec![
                Event::Succeeded(AuthOperation::Register, member_id),
                Event::Succeeded(AuthOperation::Login, member_id),
            ]
        );
    }

    #[tokio::test]
    async fn test_register_stores_hash_and_active_status() {
        let mut h = harness().await;
        h.service.register(&h.db, signup("a@x.com", "pw", "A")).await.unwrap();

        let member = MemberRepository::new(&mut h.db)
            .find_by_email("a@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(member.password, "pw");
        assert!(member.password.starts_with("$2"));
        assert_eq!(member.status, MemberStatus::Active);
    }

    #[tokio::test]
    async fn test_register_runs_in_one_transaction() {
        let h = harness().await;
        h.service.register(&h.db, signup("a@x.com", "pw", "A")).await.unwrap();

        // BEGIN IMMEDIATE, SELECT, INSERT member, INSERT role, COMMIT
        assert_eq!(h.metrics.snapshot().query_count, 5);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let mut h = harness().await;
        h.service.register(&h.db, signup("a@x.com", "pw", "A")).await.unwrap();

        let err = h
            .service
            .register(&h.db, signup("a@x.com", "other", "B"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::EmailAlreadyExists));
        assert_eq!(count(&mut h.db, "members").await, 1);
        assert_eq!(count(&mut h.db, "member_roles").await, 1);
        assert!(h
            .observer
            .events()
            .contains(&Event::Business(AuthOperation::Register, "EMAIL_ALREADY_EXISTS")));
    }

    #[tokio::test]
    async fn test_unique_violation_maps_to_email_exists() {
        let mut h = harness().await;
        let member = CreateMember {
            email: "a@x.com".to_string(),
            password_hash: "hash".to_string(),
            name: "A".to_string(),
            tel: None,
            address: None,
            profile: None,
            status: MemberStatus::Active,
        };

        MemberRepository::new(&mut h.db).create(member.clone()).await.unwrap();
        let err = MemberRepository::new(&mut h.db)
            .create(member)
            .await
            .map_err(insert_error)
            .unwrap_err();

        assert!(matches!(err, ServiceError::EmailAlreadyExists));
    }

    /// Runs one registration per email at the same time against a shared pool.
    async fn register_concurrently(
        pool: &SqlitePool,
        emails: &[&str],
    ) -> (Vec<ServiceResult<i64>>, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        let service = Arc::new(AuthService::new(
            jwt_service(),
            PasswordHasher::new(4),
            observer.clone(),
        ));

        let tasks: Vec<_> = emails
            .iter()
            .map(|email| {
                let service = service.clone();
                let db = Db::new(pool.clone(), RequestMetrics::new());
                let request = signup(email, "pw", "A");
                tokio::spawn(async move { service.register(&db, request).await })
            })
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            results.push(task.await.unwrap());
        }
        (results, observer)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_test_pool(&dir.path().join("members.db"), 5).await;
        let emails = ["u0@x.com", "u1@x.com", "u2@x.com", "u3@x.com", "u4@x.com"];

        let (results, _) = register_concurrently(&pool, &emails).await;

        let failures: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert!(failures.is_empty(), "{failures:?}");

        let mut db = Db::new(pool, RequestMetrics::new());
        assert_eq!(count(&mut db, "members").await, 5);
        assert_eq!(count(&mut db, "member_roles").await, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_registrations() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_test_pool(&dir.path().join("members.db"), 5).await;

        let (results, observer) = register_concurrently(&pool, &["dup@x.com"; 5]).await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for error in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(error, ServiceError::EmailAlreadyExists), "{error:?}");
        }
        assert_eq!(
            observer
                .events()
                .iter()
                .filter(|e| **e == Event::Business(AuthOperation::Register, "EMAIL_ALREADY_EXISTS"))
                .count(),
            4
        );

        let mut db = Db::new(pool, RequestMetrics::new());
        assert_eq!(count(&mut db, "members").await, 1);
        assert_eq!(count(&mut db, "member_roles").await, 1);
    }

    #[tokio::test]
    async fn test_missing_fields_are_not_reported() {
        let h = harness().await;

        let err = h.service.register(&h.db, signup("a@x.com", "", "")).await.unwrap_err();

        match err {
            ServiceError::RequiredFieldMissing { fields } => {
                assert_eq!(fields, vec!["name", "password"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(h.observer.events().is_empty());
        assert_eq!(h.metrics.snapshot().query_count, 0);
    }

    #[tokio::test]
    async fn test_failed_role_grant_rolls_back_member() {
        let mut h = harness().await;
        h.db.execute(sqlx::query("DROP TABLE member_roles")).await.unwrap();

        let err = h.service.register(&h.db, signup("a@x.com", "pw", "A")).await.unwrap_err();

        assert!(matches!(err, ServiceError::Database(_)));
        assert_eq!(count(&mut h.db, "members").await, 0);
        assert_eq!(
            h.observer.events(),
            vec![Event::Service(AuthOperation::Register, "INTERNAL_ERROR")]
        );
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let mut h = harness().await;
        h.service.register(&h.db, signup("a@x.com", "pw", "A")).await.unwrap();

        let wrong_password = h.service.login(&mut h.db, login("a@x.com", "nope")).await;
        let unknown_email = h.service.login(&mut h.db, login("b@x.com", "pw")).await;

        assert!(matches!(wrong_password, Err(ServiceError::InvalidCredential)));
        assert!(matches!(unknown_email, Err(ServiceError::InvalidCredential)));

        let events = h.observer.events();
        assert_eq!(
            events[1..],
            [
                Event::Business(AuthOperation::Login, "INVALID_CREDENTIAL"),
                Event::Business(AuthOperation::Login, "INVALID_CREDENTIAL"),
            ]
        );
    }

    #[tokio::test]
    async fn test_inactive_member_cannot_login() {
        let mut h = harness().await;
        let member_id = h.service.register(&h.db, signup("a@x.com", "pw", "A")).await.unwrap();

        h.db.execute(
            sqlx::query("UPDATE members SET status = 'DISABLED' WHERE member_id = ?")
                .bind(member_id),
        )
        .await
        .unwrap();

        let result = h.service.login(&mut h.db, login("a@x.com", "pw")).await;
        assert!(matches!(result, Err(ServiceError::InvalidCredential)));
    }

    #[tokio::test]
    async fn test_refresh_issues_access_token_with_fresh_roles() {
        let mut h = harness().await;
        let member_id = h.service.register(&h.db, signup("a@x.com", "pw", "A")).await.unwrap();
        let session = h.service.login(&mut h.db, login("a@x.com", "pw")).await.unwrap();

        RoleRepository::new(&mut h.db)
            .insert_member_role(member_id, Role::Admin)
            .await
            .unwrap();

        let refreshed = h
            .service
            .refresh(&mut h.db, &session.refresh_token)
            .await
            .unwrap();

        assert_eq!(h.jwt.verify_access(&refreshed.access_token).unwrap().member_id, member_id);
        assert_eq!(refreshed.member.roles, vec![Role::Admin, Role::User]);
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let mut h = harness().await;
        h.service.register(&h.db, signup("a@x.com", "pw", "A")).await.unwrap();
        let session = h.service.login(&mut h.db, login("a@x.com", "pw")).await.unwrap();

        let err = h
            .service
            .refresh(&mut h.db, &session.access_token)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Token(TokenError::TypeWrong)));
        assert!(h
            .observer
            .events()
            .contains(&Event::Business(AuthOperation::Refresh, "TOKEN_TYPE_WRONG")));
    }

    #[tokio::test]
    async fn test_refresh_with_expired_token() {
        let mut h = harness().await;
        let member_id = h.service.register(&h.db, signup("a@x.com", "pw", "A")).await.unwrap();
        let stale = JwtService::new(
            ACCESS_SECRET,
            REFRESH_SECRET,
            Duration::minutes(-5),
            Duration::days(-1),
        );
        let token = stale.issue_refresh(member_id).unwrap();

        let err = h.service.refresh(&mut h.db, &token).await.unwrap_err();

        assert!(matches!(err, ServiceError::Token(TokenError::Expired)));
        assert_eq!(
            h.observer.events().last(),
            Some(&Event::Business(AuthOperation::Refresh, "TOKEN_EXPIRED"))
        );
    }

    #[tokio::test]
    async fn test_refresh_forged_token_is_internal() {
        let mut h = harness().await;

        let err = h.service.refresh(&mut h.db, "not.a.token").await.unwrap_err();

        assert!(matches!(err, ServiceError::Token(TokenError::Invalid)));
        assert_eq!(
            h.observer.events(),
            vec![Event::Service(AuthOperation::Refresh, "TOKEN_INVALID")]
        );
    }

    #[tokio::test]
    async fn test_refresh_for_missing_member_fails() {
        let mut h = harness().await;
        let token = h.jwt.issue_refresh(404).unwrap();

        let err = h.service.refresh(&mut h.db, &token).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_current_member() {
        let mut h = harness().await;
        let member_id = h.service.register(&h.db, signup("a@x.com", "pw", "A")).await.unwrap();

        let member = h.service.current_member(&mut h.db, member_id).await.unwrap();
        assert_eq!(member.email, "a@x.com");
        assert_eq!(member.roles, vec![Role::User]);

        let missing = h.service.current_member(&mut h.db, member_id + 1).await;
        assert!(matches!(missing, Err(ServiceError::NotFound { .. })));
    }
}
