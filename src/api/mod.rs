/*
 * Responsibility
 * - built-in action / route の公開ポイント
 */
pub mod handlers;
mod routes;

pub use routes::{actions, register_routes};
