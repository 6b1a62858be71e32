/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: access gate (全ルート必須)
 * - http / cors / security_headers: 横断的な transport 層
 */
pub mod auth;
pub mod cors;
pub mod http;
pub mod security_headers;
