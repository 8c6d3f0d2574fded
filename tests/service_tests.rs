use async_trait::async_trait;
use axum::extract::FromRef;
use blog_api::{
    AppConfig, AppError, AppState, MockEmailService, UnitOfWork,
    repository::{
        NewRefreshToken, RepoResult, RepositoryError, USERS_USER_NAME_KEY, UserRepository,
    },
    models::{
        CategoryRequest, PageQuery, PostRequest, PostTagRequest, RefreshTokenRequest,
        SignInRequest, SignUpRequest, TagRequest, TokenResponse, User, VerifyOtpRequest,
    },
    services::{
        AuthService, CategoryService, DUPLICATE_SLUG_MESSAGE, PostService, PostTagService,
        TagService, TokenService,
    },
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

// --- Helpers ---

struct TestContext {
    state: AppState,
    mailer: MockEmailService,
}

fn context() -> TestContext {
    let mailer = MockEmailService::new();
    let state = AppState::new(
        AppConfig::default(),
        UnitOfWork::in_memory(),
        Arc::new(mailer.clone()),
    )
    .unwrap();
    TestContext { state, mailer }
}

fn category(slug: &str) -> CategoryRequest {
    CategoryRequest {
        name: format!("Category {slug}"),
        url_slug: slug.to_string(),
        description: String::new(),
    }
}

fn tag(slug: &str) -> TagRequest {
    TagRequest {
        name: format!("Tag {slug}"),
        url_slug: slug.to_string(),
        description: String::new(),
    }
}

fn post(slug: &str, category_id: i32) -> PostRequest {
    PostRequest {
        title: format!("Post {slug}"),
        short_description: "short".into(),
        description: "A post about ownership and borrowing".into(),
        meta: String::new(),
        url_slug: slug.to_string(),
        published: true,
        category_id,
    }
}

fn assert_duplicate_slug(err: AppError) {
    match err {
        AppError::BadRequest(message) => assert_eq!(message, DUPLICATE_SLUG_MESSAGE),
        other => panic!("expected duplicate slug rejection, got {other:?}"),
    }
}

async fn signed_up(ctx: &TestContext, user_name: &str) {
    let auth = AuthService::from_ref(&ctx.state);
    auth.sign_up(SignUpRequest {
        first_name: "Grace".into(),
        last_name: "Hopper".into(),
        email: format!("{user_name}@Example.com"),
        user_name: user_name.into(),
        password: "correct horse battery".into(),
        confirm_password: "correct horse battery".into(),
    })
    .await
    .unwrap();
}

/// Runs sign-in plus OTP verification and returns the issued pair.
async fn login(ctx: &TestContext, user_name: &str) -> TokenResponse {
    let auth = AuthService::from_ref(&ctx.state);
    let response = auth
        .sign_in(SignInRequest {
            user_name: user_name.into(),
            password: "correct horse battery".into(),
        })
        .await
        .unwrap();
    assert!(response.two_factor_required);
    assert!(response.token.is_none());

    let otp = last_otp(&ctx.mailer);
    auth.verify_otp(VerifyOtpRequest {
        user_name: user_name.into(),
        otp,
    })
    .await
    .unwrap()
}

fn last_otp(mailer: &MockEmailService) -> String {
    let message = mailer.sent().pop().expect("an OTP email");
    message
        .content
        .trim_start_matches("Your OTP code is: <b>")
        .trim_end_matches("</b>")
        .to_string()
}

// --- Slug uniqueness ---

#[tokio::test]
async fn test_duplicate_category_slug_is_rejected() {
    let ctx = context();
    let service = CategoryService::from_ref(&ctx.state);

    let created = service.create(category("rust")).await.unwrap();
    assert_eq!(created.url_slug, "rust");

    let err = service.create(category("rust")).await.unwrap_err();
    assert_duplicate_slug(err);

    // Keeping its own slug on update is not a conflict.
    let renamed = CategoryRequest {
        name: "Rust Lang".into(),
        ..category("rust")
    };
    let updated = service.update(created.id, renamed).await.unwrap().unwrap();
    assert_eq!(updated.name, "Rust Lang");
    assert_eq!(updated.url_slug, "rust");
}

#[tokio::test]
async fn test_duplicate_tag_slug_is_rejected_on_update() {
    let ctx = context();
    let service = TagService::from_ref(&ctx.state);

    service.create(tag("async")).await.unwrap();
    let other = service.create(tag("tokio")).await.unwrap();

    let err = service.update(other.id, tag("async")).await.unwrap_err();
    assert_duplicate_slug(err);
}

#[tokio::test]
async fn test_duplicate_post_slug_is_rejected() {
    let ctx = context();
    let categories = CategoryService::from_ref(&ctx.state);
    let posts = PostService::from_ref(&ctx.state);

    let parent = categories.create(category("rust")).await.unwrap();
    posts.create(post("hello-world", parent.id)).await.unwrap();

    let err = posts.create(post("hello-world", parent.id)).await.unwrap_err();
    assert_duplicate_slug(err);
}

// --- Posts ---

#[tokio::test]
async fn test_post_requires_existing_category() {
    let ctx = context();
    let posts = PostService::from_ref(&ctx.state);

    let err = posts.create(post("orphan", 42)).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_post_update_stamps_modified() {
    let ctx = context();
    let parent = CategoryService::from_ref(&ctx.state)
        .create(category("rust"))
        .await
        .unwrap();
    let posts = PostService::from_ref(&ctx.state);

    let created = posts.create(post("draft", parent.id)).await.unwrap();
    assert!(created.modified.is_none());

    let updated = posts
        .update(created.id, post("final", parent.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.url_slug, "final");
    assert!(updated.modified.is_some());
    assert_eq!(updated.posted_on, created.posted_on);
}

#[tokio::test]
async fn test_search_and_paging() {
    let ctx = context();
    let parent = CategoryService::from_ref(&ctx.state)
        .create(category("rust"))
        .await
        .unwrap();
    let posts = PostService::from_ref(&ctx.state);
    for slug in ["one", "two", "three"] {
        posts.create(post(slug, parent.id)).await.unwrap();
    }

    let hits = posts.search(Some("BORROWING")).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert!(posts.search(Some("   ")).await.unwrap().is_empty());

    let page = posts
        .list(PageQuery {
            page_index: 2,
            page_size: 2,
        })
        .await
        .unwrap();
    assert_eq!(page.total_count, 3);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items.len(), 1);
}

// --- Missing targets ---

#[tokio::test]
async fn test_missing_entities_yield_none() {
    let ctx = context();

    assert!(CategoryService::from_ref(&ctx.state).delete(99).await.unwrap().is_none());
    assert!(TagService::from_ref(&ctx.state).delete(99).await.unwrap().is_none());
    assert!(PostService::from_ref(&ctx.state).delete(99).await.unwrap().is_none());
    assert!(PostService::from_ref(&ctx.state).get(99).await.unwrap().is_none());
    assert!(
        TagService::from_ref(&ctx.state)
            .update(99, tag("nope"))
            .await
            .unwrap()
            .is_none()
    );
    assert!(PostTagService::from_ref(&ctx.state).get(99).await.unwrap().is_none());
}

#[tokio::test]
async fn test_deleting_category_removes_its_posts() {
    let ctx = context();
    let categories = CategoryService::from_ref(&ctx.state);
    let posts = PostService::from_ref(&ctx.state);

    let parent = categories.create(category("rust")).await.unwrap();
    let child = posts.create(post("child", parent.id)).await.unwrap();

    categories.delete(parent.id).await.unwrap().unwrap();
    assert!(posts.get(child.id).await.unwrap().is_none());
}

// --- Post/tag links ---

#[tokio::test]
async fn test_linking_skips_missing_tags() {
    let ctx = context();
    let parent = CategoryService::from_ref(&ctx.state)
        .create(category("rust"))
        .await
        .unwrap();
    let target = PostService::from_ref(&ctx.state)
        .create(post("linked", parent.id))
        .await
        .unwrap();
    let real = TagService::from_ref(&ctx.state).create(tag("serde")).await.unwrap();
    let links = PostTagService::from_ref(&ctx.state);

    let result = links
        .link(PostTagRequest {
            post_id: target.id,
            tag_ids: vec![real.id, 999, real.id],
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.tag_names, vec!["Tag serde".to_string()]);

    // Linking again is a no-op rather than an error.
    let again = links
        .link(PostTagRequest {
            post_id: target.id,
            tag_ids: vec![real.id],
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.tag_names.len(), 1);

    let after = links.unlink(target.id, real.id).await.unwrap().unwrap();
    assert!(after.tag_names.is_empty());
    assert!(links.unlink(target.id, real.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_linking_to_missing_post_yields_none() {
    let ctx = context();
    let real = TagService::from_ref(&ctx.state).create(tag("serde")).await.unwrap();

    let result = PostTagService::from_ref(&ctx.state)
        .link(PostTagRequest {
            post_id: 77,
            tag_ids: vec![real.id],
        })
        .await
        .unwrap();
    assert!(result.is_none());
}

// --- Sign-up, sign-in and OTP ---

/// Sees no existing accounts, then loses the insert to a concurrent sign-up.
struct RacingUserRepo {
    constraint: &'static str,
}

#[async_trait]
impl UserRepository for RacingUserRepo {
    async fn get_by_id(&self, _id: Uuid) -> RepoResult<Option<User>> {
        Ok(None)
    }
    async fn find_by_user_name(&self, _user_name: &str) -> RepoResult<Option<User>> {
        Ok(None)
    }
    async fn find_by_email(&self, _email: &str) -> RepoResult<Option<User>> {
        Ok(None)
    }
    async fn insert(&self, _user: &User) -> RepoResult<()> {
        Err(RepositoryError::Conflict(self.constraint.to_string()))
    }
}

fn racing_context(constraint: &'static str) -> TestContext {
    let mailer = MockEmailService::new();
    let mut uow = UnitOfWork::in_memory();
    uow.users = Arc::new(RacingUserRepo { constraint });
    let state = AppState::new(AppConfig::default(), uow, Arc::new(mailer.clone())).unwrap();
    TestContext { state, mailer }
}

fn sign_up_request(user_name: &str) -> SignUpRequest {
    SignUpRequest {
        first_name: "Grace".into(),
        last_name: "Hopper".into(),
        email: format!("{user_name}@example.com"),
        user_name: user_name.into(),
        password: "correct horse battery".into(),
        confirm_password: "correct horse battery".into(),
    }
}

#[tokio::test]
async fn test_sign_up_rejects_duplicates() {
    let ctx = context();
    signed_up(&ctx, "grace").await;
    let auth = AuthService::from_ref(&ctx.state);

    let same_email = SignUpRequest {
        first_name: "G".into(),
        last_name: "H".into(),
        email: " GRACE@example.com ".into(),
        user_name: "someone-else".into(),
        password: "correct horse battery".into(),
        confirm_password: "correct horse battery".into(),
    };
    assert!(matches!(
        auth.sign_up(same_email).await,
        Err(AppError::BadRequest(_))
    ));

    let same_name = SignUpRequest {
        first_name: "G".into(),
        last_name: "H".into(),
        email: "other@example.com".into(),
        user_name: "GRACE".into(),
        password: "correct horse battery".into(),
        confirm_password: "correct horse battery".into(),
    };
    assert!(matches!(
        auth.sign_up(same_name).await,
        Err(AppError::BadRequest(_))
    ));

    let mismatch = SignUpRequest {
        first_name: "G".into(),
        last_name: "H".into(),
        email: "third@example.com".into(),
        user_name: "third".into(),
        password: "correct horse battery".into(),
        confirm_password: "incorrect horse".into(),
    };
    assert!(matches!(
        auth.sign_up(mismatch).await,
        Err(AppError::BadRequest(_))
    ));
}

#[tokio::test]
async fn test_sign_up_losing_insert_race_is_bad_request() {
    let ctx = racing_context(USERS_USER_NAME_KEY);
    let result = AuthService::from_ref(&ctx.state)
        .sign_up(sign_up_request("grace"))
        .await;
    match result {
        Err(AppError::BadRequest(message)) => assert_eq!(message, "UserName is already taken."),
        other => panic!("expected a 400, got {other:?}"),
    }

    let ctx = racing_context("users_email_key");
    let result = AuthService::from_ref(&ctx.state)
        .sign_up(sign_up_request("grace"))
        .await;
    match result {
        Err(AppError::BadRequest(message)) => assert_eq!(message, "Email is already registered."),
        other => panic!("expected a 400, got {other:?}"),
    }
}

#[tokio::test]
async fn test_memory_store_rejects_duplicate_user_insert() {
    let ctx = context();
    signed_up(&ctx, "grace").await;
    let existing = ctx
        .state
        .uow
        .users
        .find_by_user_name("grace")
        .await
        .unwrap()
        .unwrap();

    let clash = User {
        id: Uuid::new_v4(),
        user_name: "GRACE".into(),
        email: "another@example.com".into(),
        ..existing
    };
    let result = ctx.state.uow.users.insert(&clash).await;
    assert!(matches!(result, Err(RepositoryError::Conflict(name)) if name == USERS_USER_NAME_KEY));
}

#[tokio::test]
async fn test_sign_in_with_unknown_login_is_unauthorized() {
    let ctx = context();
    signed_up(&ctx, "grace").await;

    let result = AuthService::from_ref(&ctx.state)
        .sign_in(SignInRequest {
            user_name: "nobody".into(),
            password: "correct horse battery".into(),
        })
        .await;

    match result {
        Err(AppError::Unauthorized(message)) => {
            assert_eq!(message, "Incorrect username or password.")
        }
        other => panic!("expected a 401, got {other:?}"),
    }
    assert!(ctx.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_sign_in_emails_otp_and_verification_issues_tokens() {
    let ctx = context();
    signed_up(&ctx, "grace").await;

    let tokens = login(&ctx, "grace").await;
    assert!(!tokens.access_token.is_empty());
    assert!(!tokens.refresh_token.is_empty());

    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "grace@example.com");
    assert_eq!(sent[0].subject, "Your OTP Login Code");
}

#[tokio::test]
async fn test_otp_is_single_use() {
    let ctx = context();
    signed_up(&ctx, "grace").await;
    login(&ctx, "grace").await;

    let otp = last_otp(&ctx.mailer);
    let replay = AuthService::from_ref(&ctx.state)
        .verify_otp(VerifyOtpRequest {
            user_name: "grace".into(),
            otp,
        })
        .await;
    assert!(matches!(replay, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn test_sign_in_with_wrong_password_sends_nothing() {
    let ctx = context();
    signed_up(&ctx, "grace").await;

    let result = AuthService::from_ref(&ctx.state)
        .sign_in(SignInRequest {
            user_name: "grace".into(),
            password: "wrong password".into(),
        })
        .await;

    assert!(matches!(result, Err(AppError::Unauthorized(_))));
    assert!(ctx.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_sign_in_accepts_email_as_login() {
    let ctx = context();
    signed_up(&ctx, "grace").await;

    let tokens = login(&ctx, "GRACE@example.com").await;
    assert!(!tokens.access_token.is_empty());
}

#[tokio::test]
async fn test_sign_in_fails_when_email_cannot_be_sent() {
    let state = AppState::new(
        AppConfig::default(),
        UnitOfWork::in_memory(),
        Arc::new(MockEmailService::new_failing()),
    )
    .unwrap();
    let ctx = TestContext {
        state,
        mailer: MockEmailService::new(),
    };
    signed_up(&ctx, "grace").await;

    let err = AuthService::from_ref(&ctx.state)
        .sign_in(SignInRequest {
            user_name: "grace".into(),
            password: "correct horse battery".into(),
        })
        .await
        .unwrap_err();
    assert!(err.status_code().is_server_error());
}

// --- Refresh tokens ---

#[tokio::test]
async fn test_refresh_token_is_single_use() {
    let ctx = context();
    signed_up(&ctx, "grace").await;
    let pair = login(&ctx, "grace").await;
    let tokens = TokenService::from_ref(&ctx.state);

    let request = RefreshTokenRequest {
        access_token: pair.access_token.clone(),
        refresh_token: pair.refresh_token.clone(),
    };

    let rotated = tokens.refresh(&request).await.unwrap();
    assert_ne!(rotated.refresh_token, pair.refresh_token);

    let second = tokens.refresh(&request).await;
    assert!(matches!(second, Err(AppError::Unauthorized(_))));

    // The successor pair still works.
    let next = tokens
        .refresh(&RefreshTokenRequest {
            access_token: rotated.access_token,
            refresh_token: rotated.refresh_token,
        })
        .await;
    assert!(next.is_ok());
}

#[tokio::test]
async fn test_revoked_token_cannot_refresh() {
    let ctx = context();
    signed_up(&ctx, "grace").await;
    let pair = login(&ctx, "grace").await;
    let tokens = TokenService::from_ref(&ctx.state);

    let request = RefreshTokenRequest {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };

    tokens.revoke(&request).await.unwrap();
    let result = tokens.refresh(&request).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn test_refresh_rejects_mismatched_pair() {
    let ctx = context();
    signed_up(&ctx, "grace").await;
    let first = login(&ctx, "grace").await;
    let second = login(&ctx, "grace").await;
    let tokens = TokenService::from_ref(&ctx.state);

    let crossed = RefreshTokenRequest {
        access_token: first.access_token,
        refresh_token: second.refresh_token,
    };
    assert!(tokens.refresh(&crossed).await.is_err());
}

#[tokio::test]
async fn test_revoke_with_garbage_access_token_is_unauthorized() {
    let ctx = context();
    let result = TokenService::from_ref(&ctx.state)
        .revoke(&RefreshTokenRequest {
            access_token: "not-a-jwt".into(),
            refresh_token: "whatever".into(),
        })
        .await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn test_expired_refresh_token_is_rejected_and_left_unused() {
    let ctx = context();
    signed_up(&ctx, "grace").await;
    let pair = login(&ctx, "grace").await;
    let user = ctx
        .state
        .uow
        .users
        .find_by_user_name("grace")
        .await
        .unwrap()
        .unwrap();

    let stale = ctx
        .state
        .uow
        .refresh_tokens
        .insert(&NewRefreshToken {
            user_id: user.id,
            access_token: pair.access_token.clone(),
            refresh_token: "expired-refresh-token".into(),
            expiry_time: Utc::now() - Duration::days(1),
        })
        .await
        .unwrap();

    let result = TokenService::from_ref(&ctx.state)
        .refresh(&RefreshTokenRequest {
            access_token: pair.access_token.clone(),
            refresh_token: "expired-refresh-token".into(),
        })
        .await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));

    let record = ctx
        .state
        .uow
        .refresh_tokens
        .find(user.id, &pair.access_token, "expired-refresh-token")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.id, stale.id);
    assert!(!record.is_used);
    assert!(!record.is_revoked);
}
