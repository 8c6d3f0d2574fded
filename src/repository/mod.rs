use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Category, PageWindow, Post, PostTagLink, Tag, User, UserRefreshToken};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The in-memory store's lock was poisoned by a panicking writer.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A write hit a unique constraint. Carries the constraint name.
    #[error("unique constraint violated: {0}")]
    Conflict(String),
}

/// Unique constraints on `users`, as named in the schema.
pub const USERS_EMAIL_KEY: &str = "users_email_key";
pub const USERS_USER_NAME_KEY: &str = "idx_users_user_name_lower";

pub type RepoResult<T> = Result<T, RepositoryError>;

// --- Write Models ---

/// TaxonomyDraft
///
/// Column values for inserting or updating a category or tag.
/// `url_slug` must already be sealed.
#[derive(Debug, Clone)]
pub struct TaxonomyDraft {
    pub name: String,
    pub url_slug: String,
    pub description: String,
}

/// PostDraft
///
/// Column values for a post write. `stamped_at` becomes `posted_on` on insert
/// and `modified` on update; `posted_on` is never rewritten.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub short_description: String,
    pub description: String,
    pub meta: String,
    pub url_slug: String,
    pub published: bool,
    pub category_id: i32,
    pub stamped_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub expiry_time: DateTime<Utc>,
}

// --- Contracts ---

/// EntityRepository
///
/// Generic CRUD contract shared by categories, tags and posts.
/// `T` is the stored row, `D` the write model accepted by insert/update.
///
/// Missing rows are reported as `Ok(None)`; `Err` is reserved for
/// infrastructure failures so callers can tell absence from breakage.
#[async_trait]
pub trait EntityRepository<T, D>: Send + Sync {
    async fn count(&self) -> RepoResult<i64>;
    /// Rows ordered by id, restricted to `window`.
    async fn list(&self, window: PageWindow) -> RepoResult<Vec<T>>;
    async fn get_by_id(&self, id: i32) -> RepoResult<Option<T>>;
    async fn insert(&self, draft: &D) -> RepoResult<T>;
    async fn update(&self, id: i32, draft: &D) -> RepoResult<Option<T>>;
    /// Returns the removed row.
    async fn delete(&self, id: i32) -> RepoResult<Option<T>>;
    /// Case-insensitive substring match over the entity's text columns.
    async fn search(&self, keyword: &str) -> RepoResult<Vec<T>>;
    /// Every stored `(id, sealed slug)` pair, for plaintext uniqueness checks.
    async fn url_slugs(&self) -> RepoResult<Vec<(i32, String)>>;
}

#[async_trait]
pub trait PostTagMapRepository: Send + Sync {
    async fn tags_for_post(&self, post_id: i32) -> RepoResult<Vec<PostTagLink>>;
    /// Links every id in `tag_ids` to the post inside a single transaction.
    /// Pairs that already exist are left alone. Returns the number of new links.
    async fn add_links(&self, post_id: i32, tag_ids: &[i32]) -> RepoResult<u64>;
    /// Returns `false` when the pair was not linked.
    async fn delete_link(&self, post_id: i32, tag_id: i32) -> RepoResult<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;
    /// Case-insensitive match on `user_name`.
    async fn find_by_user_name(&self, user_name: &str) -> RepoResult<Option<User>>;
    /// Exact match on the normalized email.
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn insert(&self, user: &User) -> RepoResult<()>;
}

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn insert(&self, token: &NewRefreshToken) -> RepoResult<UserRefreshToken>;
    /// Looks up the record issued for exactly this `(user, access, refresh)` triple.
    async fn find(
        &self,
        user_id: Uuid,
        access_token: &str,
        refresh_token: &str,
    ) -> RepoResult<Option<UserRefreshToken>>;
    /// Marks `consumed_id` used and stores `replacement`, atomically.
    ///
    /// The consume step only applies while the record is neither used nor revoked.
    /// If it loses that race nothing is written and `Ok(None)` is returned.
    async fn rotate(
        &self,
        consumed_id: i32,
        replacement: &NewRefreshToken,
    ) -> RepoResult<Option<UserRefreshToken>>;
    async fn revoke(&self, id: i32) -> RepoResult<bool>;
}

pub type CategoryRepository = dyn EntityRepository<Category, TaxonomyDraft>;
pub type TagRepository = dyn EntityRepository<Tag, TaxonomyDraft>;
pub type PostRepository = dyn EntityRepository<Post, PostDraft>;

/// UnitOfWork
///
/// Aggregates every repository behind one cloneable handle carried in the
/// application state. Multi-row writes are exposed as single repository calls
/// (`add_links`, `rotate`) that run inside one database transaction, so each
/// logical operation commits exactly once.
#[derive(Clone)]
pub struct UnitOfWork {
    pub categories: Arc<CategoryRepository>,
    pub tags: Arc<TagRepository>,
    pub posts: Arc<PostRepository>,
    pub post_tags: Arc<dyn PostTagMapRepository>,
    pub users: Arc<dyn UserRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
}

impl UnitOfWork {
    /// Postgres-backed repositories sharing one connection pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            categories: Arc::new(postgres::PgTaxonomyRepository::<Category>::new(
                pool.clone(),
                "categories",
            )),
            tags: Arc::new(postgres::PgTaxonomyRepository::<Tag>::new(pool.clone(), "tags")),
            posts: Arc::new(postgres::PgPostRepository::new(pool.clone())),
            post_tags: Arc::new(postgres::PgPostTagMapRepository::new(pool.clone())),
            users: Arc::new(postgres::PgUserRepository::new(pool.clone())),
            refresh_tokens: Arc::new(postgres::PgRefreshTokenRepository::new(pool)),
        }
    }

    /// Every repository backed by one shared [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::default()))
    }

    pub fn from_store(store: Arc<MemoryStore>) -> Self {
        Self {
            categories: Arc::new(memory::MemoryTaxonomy::categories(store.clone())),
            tags: Arc::new(memory::MemoryTaxonomy::tags(store.clone())),
            posts: Arc::new(memory::MemoryPosts(store.clone())),
            post_tags: store.clone(),
            users: store.clone(),
            refresh_tokens: store,
        }
    }
}
