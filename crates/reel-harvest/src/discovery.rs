//! Catalogue discovery: creator index → creators → works.
//!
//! Both listing levels share the same mechanics: fetch, archive the raw
//! page, bail on the sentinel redirect, take the anchors of the content
//! table minus takedown notices, drop the fixed leading artifacts.

use crate::context::HarvestContext;
use crate::error::{HarvestError, HarvestResult};
use crate::html::{self, ContentTable};
use crate::layout;
use crate::types::{Creator, Work};
use std::sync::Arc;

/// Leading anchors of the creator index that are navigation, not creators.
pub const CREATOR_INDEX_SKIP: usize = 1;
/// Leading anchors of a creator page that are navigation and header.
pub const WORK_LISTING_SKIP: usize = 2;

/// A creator page: the creator enriched with what the page says about
/// them, and the works it lists.
#[derive(Debug)]
pub struct CreatorPage {
    pub creator: Arc<Creator>,
    pub works: Vec<Work>,
}

#[derive(Clone)]
pub struct Catalogue {
    ctx: HarvestContext,
}

impl Catalogue {
    pub fn new(ctx: HarvestContext) -> Self {
        Self { ctx }
    }

    /// List every creator on the index page, in document order.
    ///
    /// Positions listed in `known_broken_page_ids` are dropped.
    pub async fn list_creators(&self, index_url: &str) -> HarvestResult<Vec<Creator>> {
        let table = self.fetch_listing(index_url, None).await?;

        let creators: Vec<Creator> = self
            .entries(&table, CREATOR_INDEX_SKIP)
            .enumerate()
            .filter_map(|(position, (name, url))| {
                if self.ctx.config.known_broken_page_ids.contains(&position) {
                    tracing::info!(position, creator = %name, "skipping known broken page");
                    None
                } else {
                    Some(Creator::new(name, url))
                }
            })
            .collect();

        tracing::info!(url = index_url, creators = creators.len(), "creator index listed");
        Ok(creators)
    }

    /// List a creator's works. An empty list is not an error.
    pub async fn list_works(&self, creator: &Creator) -> HarvestResult<Vec<Work>> {
        Ok(self.creator_page(creator).await?.works)
    }

    /// Fetch a creator page once and extract its description and works.
    pub async fn creator_page(&self, creator: &Creator) -> HarvestResult<CreatorPage> {
        let slug = creator.slug();
        let table = self
            .fetch_listing(&creator.source_url, Some(&slug))
            .await?;

        let mut enriched = creator.clone();
        if enriched.description.is_none() {
            enriched.description = table.description.clone();
        }
        enriched.is_takedown = table.text.contains(&self.ctx.config.takedown_marker);
        let enriched = Arc::new(enriched);

        let works: Vec<Work> = self
            .entries(&table, WORK_LISTING_SKIP)
            .map(|(name, url)| Work::new(name, url, Arc::clone(&enriched)))
            .collect();

        if works.is_empty() {
            tracing::info!(
                creator = %creator.name,
                takedown = enriched.is_takedown,
                "no works listed for creator"
            );
        } else {
            tracing::debug!(creator = %creator.name, works = works.len(), "works listed");
        }

        Ok(CreatorPage {
            creator: enriched,
            works,
        })
    }

    /// Fetch a listing page, archive it, and extract its content table.
    async fn fetch_listing(
        &self,
        url: &str,
        creator_slug: Option<&str>,
    ) -> HarvestResult<ContentTable> {
        let page = self.ctx.fetcher.get(url).await?;

        // Archive before any parsing so broken pages are kept for diagnosis.
        self.ctx
            .archiver
            .save_html(url, &page.body, creator_slug, None)
            .await;

        if page.is_sentinel(&self.ctx.config.error_sentinel_url) {
            tracing::warn!(url, "server redirected to the error page");
            return Err(HarvestError::PageUnavailable {
                url: url.to_string(),
            });
        }
        if !page.is_success() {
            tracing::warn!(url, status = page.status, "listing page returned an error status");
            return Err(HarvestError::PageUnavailable {
                url: url.to_string(),
            });
        }

        html::extract_content_table(&page.body)
    }

    /// `(name, url)` for every non-takedown anchor after the first `skip`.
    /// Anchors without `href` count toward the skip but yield no entry.
    fn entries<'a>(
        &'a self,
        table: &'a ContentTable,
        skip: usize,
    ) -> impl Iterator<Item = (String, String)> + 'a {
        let marker = self.ctx.config.takedown_marker.as_str();
        let base = self.ctx.config.media_base_url.as_str();
        table
            .anchors
            .iter()
            .filter(move |a| !a.text.contains(marker))
            .skip(skip)
            .filter_map(move |a| {
                let href = a.href.as_deref()?;
                Some((a.text.clone(), layout::join_media_url(base, href)))
            })
    }
}
