//! Personal centre endpoints
//!
//! GET routes render pages for the logged-in reader (anonymous visitors are
//! sent to `/`). POST routes answer with the JSON envelope.

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        rejection::JsonRejection,
        Multipart, Query, State,
    },
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tera::Context;

use crate::api::common::{render_page, PageQuery};
use crate::api::envelope::Envelope;
use crate::api::middleware::{AppState, CurrentUser, PageUser};
use crate::models::{ChangePasswordInput, UpdateBaseInfoInput};
use crate::services::{ImageUpload, NewsSubmission};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/info", get(info))
        .route("/user_info", get(user_info))
        .route("/followed_user", get(followed_user))
        .route("/base_info", get(base_info_page).post(update_base_info))
        .route("/pic_info", get(pic_info_page).post(update_avatar))
        .route("/pass_info", get(pass_info_page).post(change_password))
        .route("/collection", get(collection))
        .route("/news_release", get(news_release_page).post(publish_news))
        .route("/news_list", get(news_list))
}

/// Context holding the reader's public profile as `user`
async fn user_context(state: &AppState, current: &CurrentUser) -> Context {
    let mut context = Context::new();
    context.insert("user", &state.profile_service.profile_of(&current.user).await);
    context
}

async fn profile_page(state: &AppState, current: &CurrentUser, template: &str) -> Response {
    let context = user_context(state, current).await;
    render_page(&state.views, template, &context)
}

/// GET /info
async fn info(State(state): State<AppState>, PageUser(current): PageUser) -> Response {
    profile_page(&state, &current, "news/user.html").await
}

/// GET /user_info
async fn user_info(State(state): State<AppState>, PageUser(current): PageUser) -> Response {
    profile_page(&state, &current, "news/user_base_info.html").await
}

/// GET /followed_user?p=
async fn followed_user(
    State(state): State<AppState>,
    PageUser(current): PageUser,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = state.profile_service.followed_users(&current.user, query.page()).await;

    let mut context = user_context(&state, &current).await;
    context.insert("users", &page.items);
    context.insert("current_page", &page.current_page);
    context.insert("total_page", &page.total_page);
    render_page(&state.views, "news/user_follow.html", &context)
}

/// GET /base_info
async fn base_info_page(State(state): State<AppState>, PageUser(current): PageUser) -> Response {
    profile_page(&state, &current, "news/user_base_info.html").await
}

/// POST /base_info
async fn update_base_info(
    State(state): State<AppState>,
    current: CurrentUser,
    body: Result<Json<UpdateBaseInfoInput>, JsonRejection>,
) -> Envelope {
    let Ok(Json(input)) = body else {
        return Envelope::param("参数有误");
    };

    match state
        .profile_service
        .update_base_info(&current.user, &current.token, input)
        .await
    {
        Ok(_) => Envelope::ok("更新成功"),
        Err(e) => e.into(),
    }
}

/// GET /pic_info
async fn pic_info_page(State(state): State<AppState>, PageUser(current): PageUser) -> Response {
    profile_page(&state, &current, "news/user_pic_info.html").await
}

/// POST /pic_info, multipart field `avatar`
async fn update_avatar(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Envelope {
    let Ok(mut multipart) = multipart else {
        return Envelope::param("读取文件错误");
    };

    let mut avatar = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("avatar") => match read_file(field).await {
                Some(upload) => avatar = Some(upload),
                None => return Envelope::param("读取文件错误"),
            },
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Unreadable avatar form: {}", e);
                return Envelope::param("读取文件错误");
            }
        }
    }

    match state.profile_service.update_avatar(&current.user, avatar).await {
        Ok(avatar_url) => Envelope::ok("OK").with_data(json!({ "avatar_url": avatar_url })),
        Err(e) => e.into(),
    }
}

/// GET /pass_info
async fn pass_info_page(State(state): State<AppState>, PageUser(current): PageUser) -> Response {
    profile_page(&state, &current, "news/user_pass_info.html").await
}

/// POST /pass_info
async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    body: Result<Json<ChangePasswordInput>, JsonRejection>,
) -> Envelope {
    let Ok(Json(input)) = body else {
        return Envelope::param("参数错误");
    };

    match state.profile_service.change_password(&current.user, input).await {
        Ok(()) => Envelope::ok("保存成功"),
        Err(e) => e.into(),
    }
}

/// GET /collection?p=
async fn collection(
    State(state): State<AppState>,
    PageUser(current): PageUser,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = state.profile_service.collections(&current.user, query.page()).await;

    let mut context = user_context(&state, &current).await;
    context.insert("collections", &page.items);
    context.insert("current_page", &page.current_page);
    context.insert("total_page", &page.total_page);
    render_page(&state.views, "news/user_collection.html", &context)
}

/// GET /news_release
async fn news_release_page(State(state): State<AppState>, PageUser(current): PageUser) -> Response {
    let categories = state.profile_service.release_categories().await;

    let mut context = user_context(&state, &current).await;
    context.insert("categories", &categories);
    render_page(&state.views, "news/user_news_release.html", &context)
}

/// POST /news_release, multipart form
async fn publish_news(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Envelope {
    let Ok(mut multipart) = multipart else {
        return Envelope::param("参数有误");
    };

    let mut submission = NewsSubmission::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Unreadable news form: {}", e);
                return Envelope::param("参数有误");
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        if name == "index_image" {
            match read_file(field).await {
                Some(upload) => submission.index_image = Some(upload),
                None => return Envelope::param("图片错误"),
            }
            continue;
        }

        let slot = match name.as_str() {
            "title" => &mut submission.title,
            "digest" => &mut submission.digest,
            "content" => &mut submission.content,
            "category_id" => &mut submission.category_id,
            _ => continue,
        };
        match field.text().await {
            Ok(text) => *slot = Some(text),
            Err(_) => return Envelope::param("参数有误"),
        }
    }

    match state.profile_service.publish_news(&current.user, submission).await {
        Ok(_) => Envelope::ok("发布成功，等待审核"),
        Err(e) => e.into(),
    }
}

/// GET /news_list?p=
async fn news_list(
    State(state): State<AppState>,
    PageUser(current): PageUser,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = state.profile_service.authored_news(&current.user, query.page()).await;

    let mut context = user_context(&state, &current).await;
    context.insert("news_list", &page.items);
    context.insert("current_page", &page.current_page);
    context.insert("total_page", &page.total_page);
    render_page(&state.views, "news/user_news_list.html", &context)
}

/// Read an uploaded file field; `None` if the body could not be read
async fn read_file(field: Field<'_>) -> Option<ImageUpload> {
    let content_type = field.content_type().map(str::to_string);
    match field.bytes().await {
        Ok(data) => Some(ImageUpload {
            data: data.to_vec(),
            content_type,
        }),
        Err(e) => {
            tracing::debug!("Failed to read uploaded file: {}", e);
            None
        }
    }
}
