//! The two ExploreChinaNow servers.
//!
//! * The **db server** (`dbserver`, port 4000) fronts the identity provider, the
//!   document store and the blob store: login, registration, profiles, blog posts,
//!   travel plans and image uploads.
//! * The **chat server** (`chatserver`, port 3000) relays trip planner questions to
//!   the completion provider and serves video search and the city catalogue.
//!
//! Both serve the built frontend from a static directory for every other `GET`.
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod records;
mod routes;
pub mod runtime;
pub mod session;
pub mod state;

use salvo::affix_state;
use salvo::catcher::Catcher;
use salvo::cors::{AllowOrigin, Cors};
use salvo::http::{Method, StatusCode};
use salvo::prelude::*;
use salvo::serve_static::StaticDir;

pub use config::{ChatConfig, ConfigError, DbConfig, ListenConfig};
pub use error::{AppError, AppResult};
pub use routes::{JSON_LIMIT, UPLOAD_LIMIT};
pub use session::{Session, TOKEN_COOKIE};
pub use state::{ChatState, DbState, http_client};

use crate::error::Message;
use crate::routes::{auth, blogs, chat, map, plans, uploads, videos};
use crate::session::require_session;

const SERVER_ERROR: &str = "Something went wrong on the server.";

/// API routes of the db server.
pub fn db_router(state: DbState) -> Router {
    Router::new()
        .hoop(affix_state::inject(state))
        .push(
            Router::with_path("auth")
                .push(Router::with_path("check-connect").get(auth::check_connect))
                .push(Router::with_path("getUserData/{uid}").get(auth::user_data))
                .push(Router::with_path("login").post(auth::login))
                .push(Router::with_path("logout").post(auth::logout))
                .push(Router::with_path("register").post(auth::register))
                .push(
                    Router::with_path("avatar")
                        .hoop(max_size(UPLOAD_LIMIT))
                        .post(uploads::upload_avatar),
                )
                .push(Router::with_path("profile").hoop(require_session).get(auth::profile)),
        )
        .push(
            Router::with_path("api")
                .push(
                    Router::with_path("blogs")
                        .get(blogs::list_blogs)
                        .push(Router::with_path("author/{author}").get(blogs::author_blogs))
                        .push(
                            Router::new()
                                .hoop(require_session)
                                .post(blogs::create_blog)
                                .push(Router::with_path("{id}").put(blogs::update_blog).delete(blogs::delete_blog)),
                        ),
                )
                .push(
                    Router::with_path("images")
                        .hoop(max_size(UPLOAD_LIMIT))
                        .hoop(require_session)
                        .post(uploads::upload_images),
                )
                .push(
                    Router::with_path("plans")
                        .hoop(require_session)
                        .get(plans::list_plans)
                        .post(plans::create_plan)
                        .push(Router::with_path("{id}").delete(plans::delete_plan)),
                ),
        )
}

/// API routes of the chat server.
pub fn chat_router(state: ChatState) -> Router {
    Router::new().hoop(affix_state::inject(state)).push(
        Router::with_path("api")
            .push(Router::with_path("chat").post(chat::chat))
            .push(Router::with_path("homepage").get(chat::homepage))
            .push(Router::with_path("videos").get(videos::search_videos))
            .push(
                Router::with_path("map/cities")
                    .get(map::cities)
                    .push(Router::with_path("{city}").get(map::city)),
            ),
    )
}

/// Wrap an API router into a complete service: static frontend, CORS, request
/// logging, panic recovery and the generic error body.
pub fn service(api: Router, listen: &ListenConfig) -> Service {
    let frontend = StaticDir::new(listen.static_dir.clone())
        .defaults("index.html")
        .fallback("index.html");
    let router = Router::new()
        .hoop(CatchPanic::new())
        .push(api)
        .push(Router::with_path("{**path}").get(frontend));
    Service::new(router)
        .catcher(Catcher::default().hoop(server_error_body))
        .hoop(Logger::new())
        .hoop(cors(&listen.cors_origins).into_handler())
}

fn cors(origins: &[String]) -> Cors {
    let cors = Cors::new()
        .allow_methods(vec![Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(vec!["content-type", "authorization"]);
    if origins.is_empty() {
        cors.allow_origin(AllowOrigin::any())
    } else {
        let origins: Vec<&str> = origins.iter().map(String::as_str).collect();
        cors.allow_origin(origins).allow_credentials(true)
    }
}

/// Bodiless 500s, including recovered panics, get the JSON body the frontend expects.
#[handler]
async fn server_error_body(res: &mut Response, ctrl: &mut FlowCtrl) {
    if res.status_code == Some(StatusCode::INTERNAL_SERVER_ERROR) && (res.body.is_none() || res.body.is_error()) {
        res.render(Json(Message { message: SERVER_ERROR }));
        ctrl.skip_rest();
    }
}
