//! Merging a classification record into a bid request's site.
//!
//! [`merge`] is total: absent code groups contribute empty results, and the
//! caller's site is never modified.

use contextual_shared::{ClassificationRecord, CodeGroup, Content, Data, PROVIDER_NAME, SEGTAX, Segment, Site};
use serde_json::json;

/// Build the enriched copy of `site`.
///
/// - `cat`, `sectioncat`, `pagecat`: `codes` (text, then images), replacing prior values
/// - `keywords`: `raw` (text, then images) joined with `,`, replacing prior value
/// - `content.data`: existing entries followed by one new provider entry
///   whose segments are the `newCodes` ids
/// - `name`: the provider name
pub fn merge(record: &ClassificationRecord, site: &Site) -> Site {
    let categories = group_entries(record.codes.as_ref());
    let keywords = group_entries(record.raw.as_ref()).join(",");
    let segments = group_entries(record.new_codes.as_ref())
        .into_iter()
        .map(Segment::with_id)
        .collect();

    let entry = Data {
        name: PROVIDER_NAME.into(),
        segment: segments,
        ext: Some(json!({ "segtax": SEGTAX })),
        ..Default::default()
    };

    let mut content = site.content.clone().unwrap_or_default();
    content.data.push(entry);

    Site {
        name: PROVIDER_NAME.into(),
        section_cat: categories.clone(),
        page_cat: categories.clone(),
        cat: categories,
        keywords,
        content: Some(content),
        ..site.clone()
    }
}

fn group_entries(group: Option<&CodeGroup>) -> Vec<String> {
    group
        .map(|g| g.entries().map(String::from).collect())
        .unwrap_or_default()
}

/// Whether `content` already carries an entry from this provider.
pub(crate) fn has_provider_data(content: Option<&Content>) -> bool {
    content.is_some_and(|c| c.data.iter().any(|d| d.name == PROVIDER_NAME))
}
