/*
 * Responsibility
 * - built-in action の登録 (auth.login, auth.logout, health)
 * - built-in route の登録 (/login, /logout, /health)
 * - app/routes の route ファイルはこの後に登録されるので上書き可能
 */
use std::sync::Arc;

use crate::api::handlers::{
    auth::{Login, Logout},
    health::Health,
};
use crate::dispatch::{ActionRegistry, Dispatcher};
use crate::routing::RouteDefinition;
use crate::services::auth::Auth;

pub fn actions(auth: Arc<Auth>) -> ActionRegistry {
    let mut actions = ActionRegistry::new();
    actions
        .register("auth.login", Login::new(auth.clone(), "/"))
        .register("auth.logout", Logout::new(auth, "login"))
        .register("health", Health);
    actions
}

pub async fn register_routes(dispatcher: &Dispatcher) {
    dispatcher
        .register("/login", RouteDefinition::action("auth.login"))
        .await;
    dispatcher
        .register("/logout", RouteDefinition::action("auth.logout"))
        .await;
    dispatcher
        .register("/health", RouteDefinition::action("health"))
        .await;
}
