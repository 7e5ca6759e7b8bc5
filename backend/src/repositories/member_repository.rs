//! Database repository for member accounts.
//!
//! Provides lookup and creation of members on any storage handle, so the
//! same queries run on the pool or inside a registration transaction.

use crate::database::Execer;
use crate::database::models::{CreateMember, Member};
use chrono::Utc;

const MEMBER_COLUMNS: &str = "member_id, email, password, name, tel, address, profile, status, \
                              created_at, updated_at, deleted_at";

/// Repository for member database operations.
pub struct MemberRepository<'a, E: Execer> {
    /// Pooled connection or open transaction
    db: &'a mut E,
}

impl<'a, E: Execer> MemberRepository<'a, E> {
    /// Creates a new MemberRepository instance.
    ///
    /// # Arguments
    /// * `db` - Storage handle the queries run on
    pub fn new(db: &'a mut E) -> Self {
        Self { db }
    }

    /// Inserts a new member.
    ///
    /// # Arguments
    /// * `member` - CreateMember payload with the already hashed password
    ///
    /// # Returns
    /// The member ID assigned by the database
    ///
    /// # Errors
    /// Propagates the database error, including a unique violation when the
    /// email is already taken
    pub async fn create(&mut self, member: CreateMember) -> sqlx::Result<i64> {
        let result = self
            .db
            .execute(
                sqlx::query(
                    r#"
                    INSERT INTO members (email, password, name, tel, address, profile, status, created_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(member.email)
                .bind(member.password_hash)
                .bind(member.name)
                .bind(member.tel)
                .bind(member.address)
                .bind(member.profile)
                .bind(member.status)
                .bind(Utc::now()),
            )
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// Retrieves a member by email (exact, case-sensitive match).
    ///
    /// # Returns
    /// `Some(Member)` if found, `None` otherwise
    pub async fn find_by_email(&mut self, email: &str) -> sqlx::Result<Option<Member>> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE email = ?");
        self.db
            .fetch_optional(sqlx::query_as::<_, Member>(&sql).bind(email))
            .await
    }

    /// Retrieves a member by ID.
    ///
    /// # Returns
    /// `Some(Member)` if found, `None` otherwise
    pub async fn find_by_id(&mut self, member_id: i64) -> sqlx::Result<Option<Member>> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE member_id = ?");
        self.db
            .fetch_optional(sqlx::query_as::<_, Member>(&sql).bind(member_id))
            .await
    }
}
