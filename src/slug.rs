use crate::store::{DocumentStore, StoreError};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

/// Numeric suffixes tried (`-2` through `-99`) before giving up and
/// appending a timestamp to guarantee termination.
const MAX_NUMERIC_SUFFIX: u32 = 99;

#[derive(Debug, Error)]
pub enum SlugError {
    #[error("cannot build a slug from brand {brand:?} and model {model:?}")]
    EmptyInput { brand: String, model: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Generates a URL-safe slug from brand and model: lowercase, special
/// characters stripped, whitespace runs collapsed to single hyphens.
/// Symbol-only input yields an empty string, which callers must reject.
pub fn slugify(brand: &str, model: &str) -> String {
    let combined = format!("{brand} {model}");
    let mut slug = String::with_capacity(combined.len());
    let mut last_was_hyphen = false;
    for c in combined.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_was_hyphen = false;
        } else if c.is_whitespace() || c == '-' {
            if !last_was_hyphen && !slug.is_empty() {
                slug.push('-');
                last_was_hyphen = true;
            }
        }
        // anything else is stripped
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Returns a slug unique among all listings at the moment of the check.
/// `exclude_id` skips the listing being re-saved so an edit keeps its own
/// slug. The check-then-write is not transactional: two concurrent
/// allocations can both observe a candidate as free.
pub async fn allocate<D>(
    store: &D,
    brand: &str,
    model: &str,
    exclude_id: Option<&str>,
) -> Result<String, SlugError>
where
    D: DocumentStore + ?Sized,
{
    let base = slugify(brand, model);
    if base.is_empty() {
        return Err(SlugError::EmptyInput {
            brand: brand.to_string(),
            model: model.to_string(),
        });
    }

    if !is_taken(store, &base, exclude_id).await? {
        return Ok(base);
    }

    for suffix in 2..=MAX_NUMERIC_SUFFIX {
        let candidate = format!("{base}-{suffix}");
        if !is_taken(store, &candidate, exclude_id).await? {
            debug!(slug = %candidate, "base slug taken, using suffixed candidate");
            return Ok(candidate);
        }
    }

    // every numeric candidate is taken; a millisecond timestamp keeps the
    // slug unique without further queries
    let fallback = format!("{base}-{}", Utc::now().timestamp_millis());
    warn!(slug = %fallback, "exhausted numeric suffixes, falling back to timestamp");
    Ok(fallback)
}

async fn is_taken<D>(store: &D, slug: &str, exclude_id: Option<&str>) -> Result<bool, StoreError>
where
    D: DocumentStore + ?Sized,
{
    let holders = store.find_by_slug(slug).await?;
    let taken = match holders.as_slice() {
        [] => false,
        [only] => Some(only.id.as_str()) != exclude_id,
        _ => true,
    };
    Ok(taken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListingDoc, ListingDraft};
    use crate::store::MemoryStore;

    fn doc_with_slug(brand: &str, model: &str, slug: &str) -> ListingDoc {
        let draft = ListingDraft {
            brand: brand.to_string(),
            model: model.to_string(),
            ..Default::default()
        };
        ListingDoc::from_draft(&draft, slug.to_string(), vec![], None)
    }

    #[test]
    fn slugify_joins_and_lowercases() {
        assert_eq!(slugify("BMW", "M4"), "bmw-m4");
        assert_eq!(slugify("Mercedes-Benz", "C63 AMG"), "mercedes-benz-c63-amg");
        assert_eq!(slugify("  Toyota ", "GR Supra"), "toyota-gr-supra");
    }

    #[test]
    fn slugify_strips_special_characters() {
        assert_eq!(slugify("Rolls&Royce", "Phantom!"), "rollsroyce-phantom");
        assert_eq!(slugify("Citroën", "C4"), "citron-c4");
    }

    #[test]
    fn slugify_collapses_runs() {
        assert_eq!(slugify("Alfa   Romeo", "Giulia -- QV"), "alfa-romeo-giulia-qv");
    }

    #[test]
    fn slugify_output_alphabet() {
        for (brand, model) in [
            ("BMW", "M4"),
            ("Mercedes-Benz", "AMG GT 63 S"),
            ("Aston Martin!!", "DB11 (V12)"),
            ("-Porsche-", "911"),
        ] {
            let slug = slugify(brand, model);
            assert!(
                slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
                "unexpected character in {slug:?}"
            );
            assert!(!slug.starts_with('-'));
            assert!(!slug.ends_with('-'));
            assert!(!slug.contains("--"));
        }
    }

    #[test]
    fn slugify_symbol_only_input_is_empty() {
        assert_eq!(slugify("!!!", "???"), "");
        assert_eq!(slugify("", ""), "");
    }

    #[tokio::test]
    async fn allocate_returns_base_when_free() {
        let store = MemoryStore::new();
        let slug = allocate(&store, "BMW", "M4", None).await.unwrap();
        assert_eq!(slug, "bmw-m4");
    }

    #[tokio::test]
    async fn allocate_appends_incrementing_suffix() {
        let store = MemoryStore::new();
        store.insert(&doc_with_slug("BMW", "M4", "bmw-m4")).await.unwrap();
        assert_eq!(allocate(&store, "BMW", "M4", None).await.unwrap(), "bmw-m4-2");

        store.insert(&doc_with_slug("BMW", "M4", "bmw-m4-2")).await.unwrap();
        assert_eq!(allocate(&store, "BMW", "M4", None).await.unwrap(), "bmw-m4-3");
    }

    #[tokio::test]
    async fn allocate_is_idempotent_for_the_owning_listing() {
        let store = MemoryStore::new();
        let id = store.insert(&doc_with_slug("BMW", "M4", "bmw-m4")).await.unwrap();
        let slug = allocate(&store, "BMW", "M4", Some(&id)).await.unwrap();
        assert_eq!(slug, "bmw-m4");
    }

    #[tokio::test]
    async fn allocate_excludes_only_the_sole_holder() {
        let store = MemoryStore::new();
        store.insert(&doc_with_slug("BMW", "M4", "bmw-m4")).await.unwrap();
        let other = store.insert(&doc_with_slug("BMW", "M4", "bmw-m4-2")).await.unwrap();
        // the edited listing holds -2, so the base is still taken
        let slug = allocate(&store, "BMW", "M4", Some(&other)).await.unwrap();
        assert_eq!(slug, "bmw-m4-2");
    }

    #[tokio::test]
    async fn allocate_falls_back_to_timestamp_when_suffixes_exhaust() {
        let store = MemoryStore::new();
        store.insert(&doc_with_slug("BMW", "M4", "bmw-m4")).await.unwrap();
        for suffix in 2..=99 {
            store
                .insert(&doc_with_slug("BMW", "M4", &format!("bmw-m4-{suffix}")))
                .await
                .unwrap();
        }
        let slug = allocate(&store, "BMW", "M4", None).await.unwrap();
        let tail = slug.strip_prefix("bmw-m4-").unwrap();
        assert!(tail.parse::<i64>().unwrap() > 99, "expected timestamp tail, got {slug}");
    }

    #[tokio::test]
    async fn allocate_rejects_symbol_only_input() {
        let store = MemoryStore::new();
        let err = allocate(&store, "!!!", "???", None).await.unwrap_err();
        assert!(matches!(err, SlugError::EmptyInput { .. }));
    }
}
