/*
 * Responsibility
 * - HTTP 境界: cookie, リクエスト単位の context, Response, axum への入口
 */
pub mod context;
pub mod cookie;
pub mod entry;
pub mod response;
