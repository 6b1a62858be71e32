/*!
 * Authenticated principal extractor
 *
 * Responsibility:
 * - access middleware が extensions に入れた Principal を handler に渡す
 * - Principal 自体の型は services::auth 側 (gate が生成する)
 *
 * Public API:
 * - CurrentPrincipal
 */

mod core;

pub use core::CurrentPrincipal;
