/*
 * Responsibility
 * - middleware の公開インターフェース
 * - http: request id / trace / body limit / timeout
 * - security_headers: ブラウザ向けレスポンスヘッダ
 */
pub mod http;
pub mod security_headers;
