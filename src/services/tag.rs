use axum::extract::FromRef;

use super::{ensure_unique_slug, load_page, search_keyword};
use crate::{
    AppState,
    crypto::SlugCipher,
    error::AppResult,
    models::{PageList, PageQuery, Tag, TagDto, TagRequest},
    repository::{TaxonomyDraft, UnitOfWork},
};

// Tags mirror categories; deleting one only drops its post links.
#[derive(Clone)]
pub struct TagService {
    uow: UnitOfWork,
    cipher: SlugCipher,
}

impl FromRef<AppState> for TagService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.uow.clone(), state.cipher.clone())
    }
}

impl TagService {
    pub fn new(uow: UnitOfWork, cipher: SlugCipher) -> Self {
        Self { uow, cipher }
    }

    pub async fn list(&self, query: PageQuery) -> AppResult<PageList<TagDto>> {
        load_page(&*self.uow.tags, query)
            .await?
            .try_map(|row| self.to_dto(row))
    }

    pub async fn get(&self, id: i32) -> AppResult<Option<TagDto>> {
        self.uow
            .tags
            .get_by_id(id)
            .await?
            .map(|row| self.to_dto(row))
            .transpose()
    }

    pub async fn search(&self, keyword: Option<&str>) -> AppResult<Vec<TagDto>> {
        let Some(keyword) = search_keyword(keyword) else {
            return Ok(Vec::new());
        };
        self.uow
            .tags
            .search(keyword)
            .await?
            .into_iter()
            .map(|row| self.to_dto(row))
            .collect()
    }

    pub async fn create(&self, request: TagRequest) -> AppResult<TagDto> {
        let draft = self.draft(&request, None).await?;
        let row = self.uow.tags.insert(&draft).await?;
        tracing::info!(tag_id = row.id, "tag created");
        self.to_dto(row)
    }

    pub async fn update(&self, id: i32, request: TagRequest) -> AppResult<Option<TagDto>> {
        if self.uow.tags.get_by_id(id).await?.is_none() {
            return Ok(None);
        }
        let draft = self.draft(&request, Some(id)).await?;
        match self.uow.tags.update(id, &draft).await? {
            Some(row) => {
                tracing::info!(tag_id = id, "tag updated");
                self.to_dto(row).map(Some)
            }
            None => Ok(None),
        }
    }

    pub async fn delete(&self, id: i32) -> AppResult<Option<TagDto>> {
        match self.uow.tags.delete(id).await? {
            Some(row) => {
                tracing::info!(tag_id = id, "tag deleted");
                self.to_dto(row).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn draft(&self, request: &TagRequest, owner: Option<i32>) -> AppResult<TaxonomyDraft> {
        let slug = request.url_slug.trim();
        let stored = self.uow.tags.url_slugs().await?;
        ensure_unique_slug(&self.cipher, &stored, slug, owner)?;

        Ok(TaxonomyDraft {
            name: request.name.trim().to_string(),
            url_slug: self.cipher.encrypt(slug)?,
            description: request.description.clone(),
        })
    }

    fn to_dto(&self, row: Tag) -> AppResult<TagDto> {
        Ok(TagDto {
            id: row.id,
            name: row.name,
            url_slug: self.cipher.decrypt(&row.url_slug)?,
            description: row.description,
        })
    }
}
