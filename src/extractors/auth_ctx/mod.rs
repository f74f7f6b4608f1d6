/*!
 * Authentication context
 *
 * Responsibility:
 * - 検証済み claims をリクエスト単位の状態 (extensions) に載せる / 取り出す
 * - HTTP / axum extractor は core に閉じ込め、型定義は types に分離する
 *
 * Public API:
 * - AuthContext, DefaultSink, get_claims, USER_ID_HEADER
 * - Authenticated
 */

mod core;
mod types;

pub use self::core::Authenticated;
pub use self::types::{AuthContext, DefaultSink, USER_ID_HEADER, get_claims};
