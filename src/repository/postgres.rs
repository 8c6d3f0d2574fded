use async_trait::async_trait;
use sqlx::{PgPool, Postgres, postgres::PgRow, query_builder::QueryBuilder};
use std::marker::PhantomData;
use uuid::Uuid;

use super::{
    EntityRepository, NewRefreshToken, PostDraft, PostTagMapRepository, RefreshTokenRepository,
    RepoResult, RepositoryError, TaxonomyDraft, USERS_EMAIL_KEY, UserRepository,
};
use crate::models::{PageWindow, Post, PostTagLink, User, UserRefreshToken};

const TAXONOMY_COLUMNS: &str = "id, name, url_slug, description";
const POST_COLUMNS: &str = "id, title, short_description, description, meta, url_slug, \
                            published, posted_on, modified, category_id";
const USER_COLUMNS: &str = "id, first_name, last_name, user_name, email, password_hash, \
                            two_factor_enabled, role, created_on";
const REFRESH_TOKEN_COLUMNS: &str = "id, user_id, access_token, refresh_token, expiry_time, \
                                     is_used, is_revoked, created_on, updated_on";

/// Builds an ILIKE pattern matching `keyword` literally anywhere in the column.
fn contains_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Appends `LIMIT/OFFSET` for bounded windows; unbounded windows return every row.
fn push_window(builder: &mut QueryBuilder<'_, Postgres>, window: PageWindow) {
    if let Some(limit) = window.limit() {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(window.offset());
    }
}

// --- Categories & Tags ---

/// PgTaxonomyRepository
///
/// Categories and tags share one table shape, so a single implementation serves
/// both; only the table name differs. The table name is a compile-time constant
/// supplied by `UnitOfWork::postgres`, never user input.
pub struct PgTaxonomyRepository<T> {
    pool: PgPool,
    table: &'static str,
    _row: PhantomData<fn() -> T>,
}

impl<T> PgTaxonomyRepository<T> {
    pub fn new(pool: PgPool, table: &'static str) -> Self {
        Self {
            pool,
            table,
            _row: PhantomData,
        }
    }
}

#[async_trait]
impl<T> EntityRepository<T, TaxonomyDraft> for PgTaxonomyRepository<T>
where
    T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin + 'static,
{
    async fn count(&self) -> RepoResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        Ok(sqlx::query_scalar::<_, i64>(&sql).fetch_one(&self.pool).await?)
    }

    async fn list(&self, window: PageWindow) -> RepoResult<Vec<T>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {TAXONOMY_COLUMNS} FROM {} ORDER BY id",
            self.table
        ));
        push_window(&mut builder, window);

        Ok(builder.build_query_as::<T>().fetch_all(&self.pool).await?)
    }

    async fn get_by_id(&self, id: i32) -> RepoResult<Option<T>> {
        let sql = format!("SELECT {TAXONOMY_COLUMNS} FROM {} WHERE id = $1", self.table);
        Ok(sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert(&self, draft: &TaxonomyDraft) -> RepoResult<T> {
        let sql = format!(
            "INSERT INTO {} (name, url_slug, description) VALUES ($1, $2, $3) \
             RETURNING {TAXONOMY_COLUMNS}",
            self.table
        );
        Ok(sqlx::query_as::<_, T>(&sql)
            .bind(&draft.name)
            .bind(&draft.url_slug)
            .bind(&draft.description)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update(&self, id: i32, draft: &TaxonomyDraft) -> RepoResult<Option<T>> {
        let sql = format!(
            "UPDATE {} SET name = $2, url_slug = $3, description = $4 WHERE id = $1 \
             RETURNING {TAXONOMY_COLUMNS}",
            self.table
        );
        Ok(sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .bind(&draft.name)
            .bind(&draft.url_slug)
            .bind(&draft.description)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete(&self, id: i32) -> RepoResult<Option<T>> {
        let sql = format!(
            "DELETE FROM {} WHERE id = $1 RETURNING {TAXONOMY_COLUMNS}",
            self.table
        );
        Ok(sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn search(&self, keyword: &str) -> RepoResult<Vec<T>> {
        let sql = format!(
            "SELECT {TAXONOMY_COLUMNS} FROM {} \
             WHERE name ILIKE $1 OR description ILIKE $1 ORDER BY id",
            self.table
        );
        Ok(sqlx::query_as::<_, T>(&sql)
            .bind(contains_pattern(keyword))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn url_slugs(&self) -> RepoResult<Vec<(i32, String)>> {
        let sql = format!("SELECT id, url_slug FROM {}", self.table);
        Ok(sqlx::query_as::<_, (i32, String)>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }
}

// --- Posts ---

pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityRepository<Post, PostDraft> for PgPostRepository {
    async fn count(&self) -> RepoResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list(&self, window: PageWindow) -> RepoResult<Vec<Post>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts ORDER BY id"));
        push_window(&mut builder, window);

        Ok(builder.build_query_as::<Post>().fetch_all(&self.pool).await?)
    }

    async fn get_by_id(&self, id: i32) -> RepoResult<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert(&self, draft: &PostDraft) -> RepoResult<Post> {
        let sql = format!(
            r#"
            INSERT INTO posts
                (title, short_description, description, meta, url_slug, published, posted_on, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {POST_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(&draft.title)
            .bind(&draft.short_description)
            .bind(&draft.description)
            .bind(&draft.meta)
            .bind(&draft.url_slug)
            .bind(draft.published)
            .bind(draft.stamped_at)
            .bind(draft.category_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update(&self, id: i32, draft: &PostDraft) -> RepoResult<Option<Post>> {
        let sql = format!(
            r#"
            UPDATE posts SET
                title = $2, short_description = $3, description = $4, meta = $5,
                url_slug = $6, published = $7, modified = $8, category_id = $9
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .bind(&draft.title)
            .bind(&draft.short_description)
            .bind(&draft.description)
            .bind(&draft.meta)
            .bind(&draft.url_slug)
            .bind(draft.published)
            .bind(draft.stamped_at)
            .bind(draft.category_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete(&self, id: i32) -> RepoResult<Option<Post>> {
        let sql = format!("DELETE FROM posts WHERE id = $1 RETURNING {POST_COLUMNS}");
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn search(&self, keyword: &str) -> RepoResult<Vec<Post>> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS} FROM posts
            WHERE title ILIKE $1 OR short_description ILIKE $1 OR description ILIKE $1
            ORDER BY id
            "#
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(contains_pattern(keyword))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn url_slugs(&self) -> RepoResult<Vec<(i32, String)>> {
        Ok(sqlx::query_as::<_, (i32, String)>("SELECT id, url_slug FROM posts")
            .fetch_all(&self.pool)
            .await?)
    }
}

// --- Post/Tag Links ---

pub struct PgPostTagMapRepository {
    pool: PgPool,
}

impl PgPostTagMapRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostTagMapRepository for PgPostTagMapRepository {
    async fn tags_for_post(&self, post_id: i32) -> RepoResult<Vec<PostTagLink>> {
        Ok(sqlx::query_as::<_, PostTagLink>(
            r#"
            SELECT m.post_id, m.tag_id, t.name AS tag_name
            FROM post_tag_maps m
            JOIN tags t ON t.id = m.tag_id
            WHERE m.post_id = $1
            ORDER BY m.tag_id
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn add_links(&self, post_id: i32, tag_ids: &[i32]) -> RepoResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut added = 0;

        for tag_id in tag_ids {
            let result = sqlx::query(
                "INSERT INTO post_tag_maps (post_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;
            added += result.rows_affected();
        }

        tx.commit().await?;
        Ok(added)
    }

    async fn delete_link(&self, post_id: i32, tag_id: i32) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM post_tag_maps WHERE post_id = $1 AND tag_id = $2")
            .bind(post_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- Users ---

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_user_name(&self, user_name: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(user_name) = LOWER($1)");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(user_name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert(&self, user: &User) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, first_name, last_name, user_name, email, password_hash,
                 two_factor_enabled, role, created_on)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.user_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.two_factor_enabled)
        .bind(&user.role)
        .bind(user.created_on)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict(
                db.constraint().unwrap_or(USERS_EMAIL_KEY).to_string(),
            ),
            other => RepositoryError::Database(other),
        })?;

        Ok(())
    }
}

// --- Refresh Tokens ---

pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn insert_refresh_token_sql() -> String {
    format!(
        "INSERT INTO user_refresh_tokens (user_id, access_token, refresh_token, expiry_time) \
         VALUES ($1, $2, $3, $4) RETURNING {REFRESH_TOKEN_COLUMNS}"
    )
}

#[async_trait]
impl RefreshTokenRepository for PgRefreshTokenRepository {
    async fn insert(&self, token: &NewRefreshToken) -> RepoResult<UserRefreshToken> {
        let sql = insert_refresh_token_sql();
        Ok(sqlx::query_as::<_, UserRefreshToken>(&sql)
            .bind(token.user_id)
            .bind(&token.access_token)
            .bind(&token.refresh_token)
            .bind(token.expiry_time)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find(
        &self,
        user_id: Uuid,
        access_token: &str,
        refresh_token: &str,
    ) -> RepoResult<Option<UserRefreshToken>> {
        let sql = format!(
            "SELECT {REFRESH_TOKEN_COLUMNS} FROM user_refresh_tokens \
             WHERE user_id = $1 AND access_token = $2 AND refresh_token = $3"
        );
        Ok(sqlx::query_as::<_, UserRefreshToken>(&sql)
            .bind(user_id)
            .bind(access_token)
            .bind(refresh_token)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn rotate(
        &self,
        consumed_id: i32,
        replacement: &NewRefreshToken,
    ) -> RepoResult<Option<UserRefreshToken>> {
        let mut tx = self.pool.begin().await?;

        // The flag guard makes concurrent refreshes of the same token race on this row.
        let consumed = sqlx::query(
            r#"
            UPDATE user_refresh_tokens
            SET is_used = TRUE, updated_on = NOW()
            WHERE id = $1 AND is_used = FALSE AND is_revoked = FALSE
            "#,
        )
        .bind(consumed_id)
        .execute(&mut *tx)
        .await?;

        if consumed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let sql = insert_refresh_token_sql();
        let issued = sqlx::query_as::<_, UserRefreshToken>(&sql)
            .bind(replacement.user_id)
            .bind(&replacement.access_token)
            .bind(&replacement.refresh_token)
            .bind(replacement.expiry_time)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(issued))
    }

    async fn revoke(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE user_refresh_tokens SET is_revoked = TRUE, updated_on = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::contains_pattern;

    #[test]
    fn test_like_wildcards_are_escaped() {
        assert_eq!(contains_pattern("rust"), "%rust%");
        assert_eq!(contains_pattern("100%_done"), "%100\\%\\_done%");
    }
}
