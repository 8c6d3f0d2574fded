use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard},
};
use uuid::Uuid;

use super::{
    EntityRepository, NewRefreshToken, PostDraft, PostTagMapRepository, RefreshTokenRepository,
    RepoResult, RepositoryError, TaxonomyDraft, USERS_EMAIL_KEY, USERS_USER_NAME_KEY,
    UserRepository,
};
use crate::models::{Category, PageWindow, Post, PostTagLink, Tag, User, UserRefreshToken};

/// MemoryStore
///
/// A process-local implementation of every repository contract, used by the test
/// suites and for running the API without a database. All tables sit behind one
/// mutex, so each call is atomic the same way a single transaction would be.
/// Foreign-key cascades mirror the SQL schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    categories: Table<Category>,
    tags: Table<Tag>,
    posts: Table<Post>,
    links: BTreeSet<(i32, i32)>,
    users: BTreeMap<Uuid, User>,
    refresh_tokens: Table<UserRefreshToken>,
}

/// Rows keyed by a serial id, like a table with a `SERIAL` primary key.
struct Table<T> {
    rows: BTreeMap<i32, T>,
    last_id: i32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T: Clone> Table<T> {
    fn insert_with(&mut self, build: impl FnOnce(i32) -> T) -> T {
        self.last_id += 1;
        let row = build(self.last_id);
        self.rows.insert(self.last_id, row.clone());
        row
    }

    fn page(&self, window: PageWindow) -> Vec<T> {
        let offset = usize::try_from(window.offset()).unwrap_or(usize::MAX);
        let rows = self.rows.values().skip(offset).cloned();
        match window.limit() {
            Some(limit) => rows.take(limit as usize).collect(),
            None => rows.collect(),
        }
    }
}

impl MemoryStore {
    fn tables(&self) -> RepoResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))
    }
}

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

// --- Categories & Tags ---

/// Row types stored by [`MemoryTaxonomy`].
pub trait TaxonomyRow: Clone + Send + 'static {
    fn from_draft(id: i32, draft: &TaxonomyDraft) -> Self;
    fn apply(&mut self, draft: &TaxonomyDraft);
    fn url_slug(&self) -> &str;
    fn matches(&self, keyword_lower: &str) -> bool;
}

macro_rules! taxonomy_row {
    ($row:ty) => {
        impl TaxonomyRow for $row {
            fn from_draft(id: i32, draft: &TaxonomyDraft) -> Self {
                Self {
                    id,
                    name: draft.name.clone(),
                    url_slug: draft.url_slug.clone(),
                    description: draft.description.clone(),
                }
            }

            fn apply(&mut self, draft: &TaxonomyDraft) {
                self.name = draft.name.clone();
                self.url_slug = draft.url_slug.clone();
                self.description = draft.description.clone();
            }

            fn url_slug(&self) -> &str {
                &self.url_slug
            }

            fn matches(&self, keyword_lower: &str) -> bool {
                contains_ignore_case(&self.name, keyword_lower)
                    || contains_ignore_case(&self.description, keyword_lower)
            }
        }
    };
}

taxonomy_row!(Category);
taxonomy_row!(Tag);

pub struct MemoryTaxonomy<T> {
    store: Arc<MemoryStore>,
    table: fn(&mut Tables) -> &mut Table<T>,
    // Removes rows that reference the deleted id.
    cascade: fn(&mut Tables, i32),
}

fn categories_table(tables: &mut Tables) -> &mut Table<Category> {
    &mut tables.categories
}

fn tags_table(tables: &mut Tables) -> &mut Table<Tag> {
    &mut tables.tags
}

fn cascade_category(tables: &mut Tables, category_id: i32) {
    let orphaned: Vec<i32> = tables
        .posts
        .rows
        .values()
        .filter(|post| post.category_id == category_id)
        .map(|post| post.id)
        .collect();
    for post_id in orphaned {
        tables.posts.rows.remove(&post_id);
        cascade_post(tables, post_id);
    }
}

fn cascade_tag(tables: &mut Tables, tag_id: i32) {
    tables.links.retain(|(_, linked)| *linked != tag_id);
}

fn cascade_post(tables: &mut Tables, post_id: i32) {
    tables.links.retain(|(linked, _)| *linked != post_id);
}

impl MemoryTaxonomy<Category> {
    pub fn categories(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            table: categories_table,
            cascade: cascade_category,
        }
    }
}

impl MemoryTaxonomy<Tag> {
    pub fn tags(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            table: tags_table,
            cascade: cascade_tag,
        }
    }
}

#[async_trait]
impl<T: TaxonomyRow> EntityRepository<T, TaxonomyDraft> for MemoryTaxonomy<T> {
    async fn count(&self) -> RepoResult<i64> {
        let mut tables = self.store.tables()?;
        Ok((self.table)(&mut tables).rows.len() as i64)
    }

    async fn list(&self, window: PageWindow) -> RepoResult<Vec<T>> {
        let mut tables = self.store.tables()?;
        Ok((self.table)(&mut tables).page(window))
    }

    async fn get_by_id(&self, id: i32) -> RepoResult<Option<T>> {
        let mut tables = self.store.tables()?;
        Ok((self.table)(&mut tables).rows.get(&id).cloned())
    }

    async fn insert(&self, draft: &TaxonomyDraft) -> RepoResult<T> {
        let mut tables = self.store.tables()?;
        Ok((self.table)(&mut tables).insert_with(|id| T::from_draft(id, draft)))
    }

    async fn update(&self, id: i32, draft: &TaxonomyDraft) -> RepoResult<Option<T>> {
        let mut tables = self.store.tables()?;
        let updated = (self.table)(&mut tables).rows.get_mut(&id).map(|row| {
            row.apply(draft);
            row.clone()
        });
        Ok(updated)
    }

    async fn delete(&self, id: i32) -> RepoResult<Option<T>> {
        let mut tables = self.store.tables()?;
        let removed = (self.table)(&mut tables).rows.remove(&id);
        if removed.is_some() {
            (self.cascade)(&mut tables, id);
        }
        Ok(removed)
    }

    async fn search(&self, keyword: &str) -> RepoResult<Vec<T>> {
        let keyword = keyword.to_lowercase();
        let mut tables = self.store.tables()?;
        Ok((self.table)(&mut tables)
            .rows
            .values()
            .filter(|row| row.matches(&keyword))
            .cloned()
            .collect())
    }

    async fn url_slugs(&self) -> RepoResult<Vec<(i32, String)>> {
        let mut tables = self.store.tables()?;
        Ok((self.table)(&mut tables)
            .rows
            .iter()
            .map(|(id, row)| (*id, row.url_slug().to_string()))
            .collect())
    }
}

// --- Posts ---

pub struct MemoryPosts(pub Arc<MemoryStore>);

#[async_trait]
impl EntityRepository<Post, PostDraft> for MemoryPosts {
    async fn count(&self) -> RepoResult<i64> {
        Ok(self.0.tables()?.posts.rows.len() as i64)
    }

    async fn list(&self, window: PageWindow) -> RepoResult<Vec<Post>> {
        Ok(self.0.tables()?.posts.page(window))
    }

    async fn get_by_id(&self, id: i32) -> RepoResult<Option<Post>> {
        Ok(self.0.tables()?.posts.rows.get(&id).cloned())
    }

    async fn insert(&self, draft: &PostDraft) -> RepoResult<Post> {
        let mut tables = self.0.tables()?;
        Ok(tables.posts.insert_with(|id| Post {
            id,
            title: draft.title.clone(),
            short_description: draft.short_description.clone(),
            description: draft.description.clone(),
            meta: draft.meta.clone(),
            url_slug: draft.url_slug.clone(),
            published: draft.published,
            posted_on: draft.stamped_at,
            modified: None,
            category_id: draft.category_id,
        }))
    }

    async fn update(&self, id: i32, draft: &PostDraft) -> RepoResult<Option<Post>> {
        let mut tables = self.0.tables()?;
        let updated = tables.posts.rows.get_mut(&id).map(|post| {
            post.title = draft.title.clone();
            post.short_description = draft.short_description.clone();
            post.description = draft.description.clone();
            post.meta = draft.meta.clone();
            post.url_slug = draft.url_slug.clone();
            post.published = draft.published;
            post.category_id = draft.category_id;
            post.modified = Some(draft.stamped_at);
            post.clone()
        });
        Ok(updated)
    }

    async fn delete(&self, id: i32) -> RepoResult<Option<Post>> {
        let mut tables = self.0.tables()?;
        let removed = tables.posts.rows.remove(&id);
        if removed.is_some() {
            cascade_post(&mut tables, id);
        }
        Ok(removed)
    }

    async fn search(&self, keyword: &str) -> RepoResult<Vec<Post>> {
        let keyword = keyword.to_lowercase();
        Ok(self
            .0
            .tables()?
            .posts
            .rows
            .values()
            .filter(|post| {
                contains_ignore_case(&post.title, &keyword)
                    || contains_ignore_case(&post.short_description, &keyword)
                    || contains_ignore_case(&post.description, &keyword)
            })
            .cloned()
            .collect())
    }

    async fn url_slugs(&self) -> RepoResult<Vec<(i32, String)>> {
        Ok(self
            .0
            .tables()?
            .posts
            .rows
            .values()
            .map(|post| (post.id, post.url_slug.clone()))
            .collect())
    }
}

// --- Post/Tag Links ---

#[async_trait]
impl PostTagMapRepository for MemoryStore {
    async fn tags_for_post(&self, post_id: i32) -> RepoResult<Vec<PostTagLink>> {
        let tables = self.tables()?;
        Ok(tables
            .links
            .iter()
            .filter(|(linked, _)| *linked == post_id)
            .filter_map(|(_, tag_id)| {
                tables.tags.rows.get(tag_id).map(|tag| PostTagLink {
                    post_id,
                    tag_id: *tag_id,
                    tag_name: tag.name.clone(),
                })
            })
            .collect())
    }

    async fn add_links(&self, post_id: i32, tag_ids: &[i32]) -> RepoResult<u64> {
        let mut tables = self.tables()?;
        let mut added = 0;
        for tag_id in tag_ids {
            if tables.links.insert((post_id, *tag_id)) {
                added += 1;
            }
        }
        Ok(added)
    }

    async fn delete_link(&self, post_id: i32, tag_id: i32) -> RepoResult<bool> {
        Ok(self.tables()?.links.remove(&(post_id, tag_id)))
    }
}

// --- Users ---

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.tables()?.users.get(&id).cloned())
    }

    async fn find_by_user_name(&self, user_name: &str) -> RepoResult<Option<User>> {
        Ok(self
            .tables()?
            .users
            .values()
            .find(|user| user.user_name.eq_ignore_ascii_case(user_name))
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self
            .tables()?
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn insert(&self, user: &User) -> RepoResult<()> {
        let mut tables = self.tables()?;
        for existing in tables.users.values() {
            if existing.email == user.email {
                return Err(RepositoryError::Conflict(USERS_EMAIL_KEY.to_string()));
            }
            if existing.user_name.eq_ignore_ascii_case(&user.user_name) {
                return Err(RepositoryError::Conflict(USERS_USER_NAME_KEY.to_string()));
            }
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }
}

// --- Refresh Tokens ---

fn issue_token(table: &mut Table<UserRefreshToken>, token: &NewRefreshToken) -> UserRefreshToken {
    table.insert_with(|id| UserRefreshToken {
        id,
        user_id: token.user_id,
        access_token: token.access_token.clone(),
        refresh_token: token.refresh_token.clone(),
        expiry_time: token.expiry_time,
        is_used: false,
        is_revoked: false,
        created_on: Utc::now(),
        updated_on: None,
    })
}

#[async_trait]
impl RefreshTokenRepository for MemoryStore {
    async fn insert(&self, token: &NewRefreshToken) -> RepoResult<UserRefreshToken> {
        let mut tables = self.tables()?;
        Ok(issue_token(&mut tables.refresh_tokens, token))
    }

    async fn find(
        &self,
        user_id: Uuid,
        access_token: &str,
        refresh_token: &str,
    ) -> RepoResult<Option<UserRefreshToken>> {
        Ok(self
            .tables()?
            .refresh_tokens
            .rows
            .values()
            .find(|record| {
                record.user_id == user_id
                    && record.access_token == access_token
                    && record.refresh_token == refresh_token
            })
            .cloned())
    }

    async fn rotate(
        &self,
        consumed_id: i32,
        replacement: &NewRefreshToken,
    ) -> RepoResult<Option<UserRefreshToken>> {
        let mut tables = self.tables()?;
        let Some(consumed) = tables.refresh_tokens.rows.get_mut(&consumed_id) else {
            return Ok(None);
        };
        if consumed.is_used || consumed.is_revoked {
            return Ok(None);
        }
        consumed.is_used = true;
        consumed.updated_on = Some(Utc::now());

        Ok(Some(issue_token(&mut tables.refresh_tokens, replacement)))
    }

    async fn revoke(&self, id: i32) -> RepoResult<bool> {
        let mut tables = self.tables()?;
        Ok(match tables.refresh_tokens.rows.get_mut(&id) {
            Some(record) => {
                record.is_revoked = true;
                record.updated_on = Some(Utc::now());
                true
            }
            None => false,
        })
    }
}
