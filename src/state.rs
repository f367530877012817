/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - dispatcher: route table + action / controller / template の解決
 *   - secure_cookies: Set-Cookie に Secure を付けるか (production)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::dispatch::Dispatcher;

#[derive(Clone, Debug)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>, secure_cookies: bool) -> Self {
        Self {
            dispatcher,
            secure_cookies,
        }
    }
}
