use axum::extract::FromRef;
use chrono::Utc;

use super::{ensure_unique_slug, load_page, search_keyword};
use crate::{
    AppState,
    crypto::SlugCipher,
    error::{AppError, AppResult},
    models::{PageList, PageQuery, Post, PostDto, PostRequest},
    repository::{PostDraft, UnitOfWork},
};

pub const MISSING_CATEGORY_MESSAGE: &str = "Category does not exist.";

/// PostService
///
/// CRUD over posts. Beyond slug uniqueness, every write must point at an
/// existing category. `posted_on` is stamped on create, `modified` on update.
#[derive(Clone)]
pub struct PostService {
    uow: UnitOfWork,
    cipher: SlugCipher,
}

impl FromRef<AppState> for PostService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.uow.clone(), state.cipher.clone())
    }
}

impl PostService {
    pub fn new(uow: UnitOfWork, cipher: SlugCipher) -> Self {
        Self { uow, cipher }
    }

    pub async fn list(&self, query: PageQuery) -> AppResult<PageList<PostDto>> {
        load_page(&*self.uow.posts, query)
            .await?
            .try_map(|row| self.to_dto(row))
    }

    pub async fn get(&self, id: i32) -> AppResult<Option<PostDto>> {
        self.uow
            .posts
            .get_by_id(id)
            .await?
            .map(|row| self.to_dto(row))
            .transpose()
    }

    /// Matches the title and both descriptions.
    pub async fn search(&self, keyword: Option<&str>) -> AppResult<Vec<PostDto>> {
        let Some(keyword) = search_keyword(keyword) else {
            return Ok(Vec::new());
        };
        self.uow
            .posts
            .search(keyword)
            .await?
            .into_iter()
            .map(|row| self.to_dto(row))
            .collect()
    }

    pub async fn create(&self, request: PostRequest) -> AppResult<PostDto> {
        let draft = self.draft(&request, None).await?;
        let row = self.uow.posts.insert(&draft).await?;
        tracing::info!(post_id = row.id, category_id = row.category_id, "post created");
        self.to_dto(row)
    }

    pub async fn update(&self, id: i32, request: PostRequest) -> AppResult<Option<PostDto>> {
        if self.uow.posts.get_by_id(id).await?.is_none() {
            return Ok(None);
        }
        let draft = self.draft(&request, Some(id)).await?;
        let Some(row) = self.uow.posts.update(id, &draft).await? else {
            return Ok(None);
        };
        tracing::info!(post_id = id, "post updated");
        self.to_dto(row).map(Some)
    }

    pub async fn delete(&self, id: i32) -> AppResult<Option<PostDto>> {
        let Some(row) = self.uow.posts.delete(id).await? else {
            return Ok(None);
        };
        tracing::info!(post_id = id, "post deleted");
        self.to_dto(row).map(Some)
    }

    async fn draft(&self, request: &PostRequest, owner: Option<i32>) -> AppResult<PostDraft> {
        if self.uow.categories.get_by_id(request.category_id).await?.is_none() {
            tracing::warn!(category_id = request.category_id, "post references unknown category");
            return Err(AppError::BadRequest(MISSING_CATEGORY_MESSAGE.to_string()));
        }

        let slug = request.url_slug.trim();
        let stored = self.uow.posts.url_slugs().await?;
        ensure_unique_slug(&self.cipher, &stored, slug, owner)?;

        Ok(PostDraft {
            title: request.title.trim().to_string(),
            short_description: request.short_description.clone(),
            description: request.description.clone(),
            meta: request.meta.clone(),
            url_slug: self.cipher.encrypt(slug)?,
            published: request.published,
            category_id: request.category_id,
            stamped_at: Utc::now(),
        })
    }

    fn to_dto(&self, row: Post) -> AppResult<PostDto> {
        Ok(PostDto {
            id: row.id,
            title: row.title,
            short_description: row.short_description,
            description: row.description,
            meta: row.meta,
            url_slug: self.cipher.decrypt(&row.url_slug)?,
            published: row.published,
            posted_on: row.posted_on,
            modified: row.modified,
            category_id: row.category_id,
        })
    }
}
