use axum::extract::FromRef;

use crate::{
    AppState,
    error::AppResult,
    models::{PostTagRequest, PostTagsDto},
    repository::UnitOfWork,
};

/// PostTagService
///
/// Manages the post/tag join. Linking is a lenient merge: ids naming tags that
/// do not exist, or tags already linked, are skipped without error, and the
/// remaining links are written in one transaction.
#[derive(Clone)]
pub struct PostTagService {
    uow: UnitOfWork,
}

impl FromRef<AppState> for PostTagService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.uow.clone())
    }
}

impl PostTagService {
    pub fn new(uow: UnitOfWork) -> Self {
        Self { uow }
    }

    /// `None` when the post does not exist. A post without tags yields an empty list.
    pub async fn get(&self, post_id: i32) -> AppResult<Option<PostTagsDto>> {
        if self.uow.posts.get_by_id(post_id).await?.is_none() {
            return Ok(None);
        }
        self.current_tags(post_id).await.map(Some)
    }

    /// Returns the post's full tag list after the merge, or `None` for an unknown post.
    pub async fn link(&self, request: PostTagRequest) -> AppResult<Option<PostTagsDto>> {
        let post_id = request.post_id;
        if self.uow.posts.get_by_id(post_id).await?.is_none() {
            return Ok(None);
        }

        let linked: Vec<i32> = self
            .uow
            .post_tags
            .tags_for_post(post_id)
            .await?
            .into_iter()
            .map(|link| link.tag_id)
            .collect();

        let mut to_link = Vec::new();
        for tag_id in request.tag_ids {
            if linked.contains(&tag_id) || to_link.contains(&tag_id) {
                continue;
            }
            if self.uow.tags.get_by_id(tag_id).await?.is_none() {
                tracing::debug!(post_id, tag_id, "skipping unknown tag");
                continue;
            }
            to_link.push(tag_id);
        }

        if !to_link.is_empty() {
            let added = self.uow.post_tags.add_links(post_id, &to_link).await?;
            tracing::info!(post_id, added, "tags linked to post");
        }

        self.current_tags(post_id).await.map(Some)
    }

    /// `None` when the post is unknown or the pair was never linked.
    pub async fn unlink(&self, post_id: i32, tag_id: i32) -> AppResult<Option<PostTagsDto>> {
        if self.uow.posts.get_by_id(post_id).await?.is_none() {
            return Ok(None);
        }
        if !self.uow.post_tags.delete_link(post_id, tag_id).await? {
            return Ok(None);
        }
        tracing::info!(post_id, tag_id, "tag unlinked from post");
        self.current_tags(post_id).await.map(Some)
    }

    async fn current_tags(&self, post_id: i32) -> AppResult<PostTagsDto> {
        let tag_names = self
            .uow
            .post_tags
            .tags_for_post(post_id)
            .await?
            .into_iter()
            .map(|link| link.tag_name)
            .collect();
        Ok(PostTagsDto { post_id, tag_names })
    }
}
