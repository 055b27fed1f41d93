/*!
 * Translation of subtitle documents through a `Translator` provider.
 *
 * - `core`: the translation service with retries and bounded concurrency
 * - `cache`: in-memory cache of already translated lines
 */

pub use self::cache::{CacheStats, TranslationCache};
pub use self::core::{build_translator, TranslationOptions, TranslationService};

pub mod cache;
pub mod core;
