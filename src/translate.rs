//! Pluggable query-name translation
//!
//! The site indexes trainers under English titles, so a non-English search
//! term must be resolved to the English game name first. That resolution goes
//! through a third-party search page and lives outside this crate; here it is
//! consumed as a trait object so embedders can plug in their own
//! implementation — or none at all.

use async_trait::async_trait;

/// Progress-message callback invoked while a translation is in flight
///
/// Translations can take many seconds (the original flow drives a rendered
/// third-party search page), so implementations report human-readable status
/// lines through this callback.
pub type TranslationProgress<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Trait for resolving a free-text query to the English game name
///
/// Implementations can drive a rendered search page, call a translation API,
/// or provide stub functionality for graceful degradation. Returning
/// `Ok(None)` means "no translation found" — the caller searches the raw
/// term instead.
#[async_trait]
pub trait NameTranslator: Send + Sync {
    /// Resolve a query term to an English game name, if one can be found
    async fn translate(
        &self,
        query: &str,
        on_progress: TranslationProgress<'_>,
    ) -> crate::Result<Option<String>>;

    /// Name of this translator implementation (for logging)
    fn name(&self) -> &str;
}

/// No-op translator used when no translation backend is available
///
/// Always reports that no translation was found, so searches proceed with
/// the raw term. This keeps the search flow uniform for embedders that only
/// ever search English titles.
pub struct NoOpTranslator;

#[async_trait]
impl NameTranslator for NoOpTranslator {
    async fn translate(
        &self,
        _query: &str,
        _on_progress: TranslationProgress<'_>,
    ) -> crate::Result<Option<String>> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "noop"
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_translator_finds_nothing() {
        let translator = NoOpTranslator;
        let resolved = translator.translate("艾尔登法环", &|_msg| {}).await.unwrap();
        assert!(resolved.is_none());
        assert_eq!(translator.name(), "noop");
    }
}
