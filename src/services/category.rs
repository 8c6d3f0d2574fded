use axum::extract::FromRef;

use super::{ensure_unique_slug, load_page, search_keyword};
use crate::{
    AppState,
    crypto::SlugCipher,
    error::AppResult,
    models::{Category, CategoryDto, CategoryRequest, PageList, PageQuery},
    repository::{TaxonomyDraft, UnitOfWork},
};

/// CategoryService
///
/// CRUD over categories with sealed slugs. Deleting a category also removes
/// its posts (and their tag links) through the schema's cascades.
#[derive(Clone)]
pub struct CategoryService {
    uow: UnitOfWork,
    cipher: SlugCipher,
}

impl FromRef<AppState> for CategoryService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.uow.clone(), state.cipher.clone())
    }
}

impl CategoryService {
    pub fn new(uow: UnitOfWork, cipher: SlugCipher) -> Self {
        Self { uow, cipher }
    }

    pub async fn list(&self, query: PageQuery) -> AppResult<PageList<CategoryDto>> {
        load_page(&*self.uow.categories, query)
            .await?
            .try_map(|row| self.to_dto(row))
    }

    pub async fn get(&self, id: i32) -> AppResult<Option<CategoryDto>> {
        self.uow
            .categories
            .get_by_id(id)
            .await?
            .map(|row| self.to_dto(row))
            .transpose()
    }

    pub async fn search(&self, keyword: Option<&str>) -> AppResult<Vec<CategoryDto>> {
        let Some(keyword) = search_keyword(keyword) else {
            return Ok(Vec::new());
        };
        let rows = self.uow.categories.search(keyword).await?;
        self.to_dtos(rows)
    }

    pub async fn create(&self, request: CategoryRequest) -> AppResult<CategoryDto> {
        let draft = self.draft(&request, None).await?;
        let row = self.uow.categories.insert(&draft).await?;
        tracing::info!(category_id = row.id, "category created");
        self.to_dto(row)
    }

    pub async fn update(&self, id: i32, request: CategoryRequest) -> AppResult<Option<CategoryDto>> {
        if self.uow.categories.get_by_id(id).await?.is_none() {
            return Ok(None);
        }
        let draft = self.draft(&request, Some(id)).await?;
        let Some(row) = self.uow.categories.update(id, &draft).await? else {
            return Ok(None);
        };
        tracing::info!(category_id = id, "category updated");
        self.to_dto(row).map(Some)
    }

    pub async fn delete(&self, id: i32) -> AppResult<Option<CategoryDto>> {
        let Some(row) = self.uow.categories.delete(id).await? else {
            return Ok(None);
        };
        tracing::info!(category_id = id, "category deleted");
        self.to_dto(row).map(Some)
    }

    async fn draft(&self, request: &CategoryRequest, owner: Option<i32>) -> AppResult<TaxonomyDraft> {
        let slug = request.url_slug.trim();
        let stored = self.uow.categories.url_slugs().await?;
        ensure_unique_slug(&self.cipher, &stored, slug, owner)?;

        Ok(TaxonomyDraft {
            name: request.name.trim().to_string(),
            url_slug: self.cipher.encrypt(slug)?,
            description: request.description.clone(),
        })
    }

    fn to_dto(&self, row: Category) -> AppResult<CategoryDto> {
        Ok(CategoryDto {
            id: row.id,
            name: row.name,
            url_slug: self.cipher.decrypt(&row.url_slug)?,
            description: row.description,
        })
    }

    fn to_dtos(&self, rows: Vec<Category>) -> AppResult<Vec<CategoryDto>> {
        rows.into_iter().map(|row| self.to_dto(row)).collect()
    }
}
