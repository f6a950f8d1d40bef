use crate::models::Listing;
use crate::store::{DocumentStore, StoreError};
use std::collections::HashSet;

/// How many recommendations the detail view shows
pub const MAX_SIMILAR: usize = 3;

/// Parses a price-range string to a comparable number: the part before
/// the first `-` with every non-digit stripped. Unparsable input is 0.
pub fn parse_price(text: &str) -> i64 {
    let first_part = text.split('-').next().unwrap_or("");
    let digits: String = first_part.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Ranks other listings by relevance to the reference: same body type
/// first, ordered by absolute price distance, backfilled from the whole
/// inventory when fewer than three match. `current` is the route key of
/// the reference listing and may be its id or its slug.
///
/// Ties on price distance keep the store's order, which is unspecified;
/// fixtures should use distinct prices.
pub async fn select_similar<D>(
    store: &D,
    current: &str,
    body_type: &str,
    price_range: &str,
) -> Result<Vec<Listing>, StoreError>
where
    D: DocumentStore + ?Sized,
{
    let target_price = parse_price(price_range);
    let distance = |listing: &Listing| (parse_price(&listing.price_range) - target_price).abs();
    let is_reference =
        |listing: &Listing| listing.id == current || listing.slug.as_deref() == Some(current);

    let mut picks: Vec<Listing> = store
        .find_by_body_type(body_type)
        .await?
        .into_iter()
        .filter(|l| !is_reference(l))
        .collect();
    picks.sort_by_key(distance);

    if picks.len() < MAX_SIMILAR {
        let chosen: HashSet<String> = picks.iter().map(|l| l.id.clone()).collect();
        let mut rest: Vec<Listing> = store
            .list()
            .await?
            .into_iter()
            .filter(|l| !is_reference(l) && !chosen.contains(&l.id))
            .collect();
        rest.sort_by_key(distance);
        let needed = MAX_SIMILAR - picks.len();
        picks.extend(rest.into_iter().take(needed));
    }

    picks.truncate(MAX_SIMILAR);
    Ok(picks)
}
