//! Database repository for member role grants.
//!
//! Provides:
//! - Granting a role to a member
//! - Listing the roles currently granted to a member
use crate::database::Execer;
use crate::database::models::{MemberRole, Role};

/// Repository for role grant operations.
pub struct RoleRepository<'a, E: Execer> {
    /// Pooled connection or open transaction
    db: &'a mut E,
}

impl<'a, E: Execer> RoleRepository<'a, E> {
    /// Creates a new RoleRepository instance.
    ///
    /// # Arguments
    /// * `db` - Storage handle the queries run on
    pub fn new(db: &'a mut E) -> Self {
        Self { db }
    }

    /// Grants a role to a member.
    ///
    /// # Arguments
    /// * `member_id` - Member receiving the grant
    /// * `role` - Role to grant
    pub async fn insert_member_role(&mut self, member_id: i64, role: Role) -> sqlx::Result<()> {
        self.db
            .execute(
                sqlx::query("INSERT INTO member_roles (member_id, role) VALUES (?, ?)")
                    .bind(member_id)
                    .bind(role),
            )
            .await?;

        Ok(())
    }

    /// Retrieves every role granted to a member.
    ///
    /// # Returns
    /// Roles ordered by name, empty when the member has no grants
    pub async fn get_roles_by_member_id(&mut self, member_id: i64) -> sqlx::Result<Vec<Role>> {
        let grants = self
            .db
            .fetch_all(
                sqlx::query_as::<_, MemberRole>(
                    "SELECT member_id, role FROM member_roles WHERE member_id = ? ORDER BY role",
                )
                .bind(member_id),
            )
            .await?;

        Ok(grants.into_iter().map(|grant| grant.role).collect())
    }
}
