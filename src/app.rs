/*
 * Responsibility
 * - Config読み込み → 依存生成 (session / user store / Auth / Dispatcher)
 * - route 登録: built-in → app/routes の route ファイル (後勝ち)
 * - Router 組み立て (fallback で全 path を dispatcher へ) + middleware
 * - axum::serve() で起動
 */
use std::sync::Arc;
use std::{panic, process};

use anyhow::Result;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::dispatch::{ControllerRegistry, Dispatcher, FileTemplates};
use crate::finder::Finder;
use crate::http::entry;
use crate::middleware;
use crate::repos::user_repo::{FileUserStore, PgUserStore, UserStore};
use crate::routing::load_routes;
use crate::services::auth::{Auth, AuthPolicy};
use crate::services::session::{MemorySessionStore, SessionStore, ValkeySessionStore};
use crate::state::AppState;

fn init_tracing() {
    // RUST_LOG=info,appkit=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // Development: crash loudly. Production: default hook, keep serving.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!("starting appkit in {:?} mode on {}", config.app_env, config.addr);

    let state = build_state(&config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn build_sessions(config: &Config) -> Result<Arc<dyn SessionStore>> {
    let store: Arc<dyn SessionStore> = match &config.valkey_url {
        Some(url) => Arc::new(ValkeySessionStore::new(url).await?),
        None => {
            tracing::warn!("VALKEY_URL not set; sessions are kept in memory");
            Arc::new(MemorySessionStore::new())
        }
    };
    Ok(store)
}

async fn build_users(config: &Config, finder: &Finder) -> Result<Arc<dyn UserStore>> {
    let store: Arc<dyn UserStore> = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(5).connect(url).await?;
            Arc::new(PgUserStore::new(db))
        }
        None => {
            tracing::info!(dir = %finder.accounts.display(), "loading accounts from files");
            Arc::new(FileUserStore::new(finder.accounts.clone()))
        }
    };
    Ok(store)
}

async fn build_state(config: &Config) -> Result<AppState> {
    let finder = Finder::new(&config.app_root);
    tracing::info!(root = %finder.root.display(), app = %finder.app.display(), "application layout");

    let sessions = build_sessions(config).await?;
    let users = build_users(config, &finder).await?;
    tracing::info!(sessions = sessions.backend_name(), "auth backends ready");

    let auth = Arc::new(Auth::new(
        sessions,
        users,
        AuthPolicy {
            cookie_name: config.auth_cookie.clone(),
            expires: config.auth_expires,
        },
    ));

    let dispatcher = Dispatcher::new(
        Arc::new(FileTemplates::new(finder.views.clone())),
        Arc::new(ControllerRegistry::new()),
        api::actions(auth.clone()),
    )
    .with_auth(auth)
    .with_index_route(config.index_route())
    .with_error_route(config.error_route());

    api::register_routes(&dispatcher).await;
    for (pattern, definition) in load_routes(&finder).await? {
        dispatcher.register(&pattern, definition).await;
    }

    Ok(AppState::new(
        Arc::new(dispatcher),
        config.app_env.is_production(),
    ))
}

pub fn build_router(state: AppState) -> Router {
    let router = Router::new().fallback(entry::dispatch).with_state(state);

    let router = middleware::http::apply(router, middleware::http::Limits::default());
    middleware::security_headers::apply(router)
}
