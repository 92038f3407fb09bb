// src/services/sitemap.rs

//! Sitemap generation.
//!
//! Entries are split into consecutive chunks of at most `max_per_document`
//! URLs, in input order. A single chunk becomes `sitemap.xml`; several
//! chunks become `sitemap-1.xml`, `sitemap-2.xml`, ... plus a
//! `sitemap-index.xml` referencing each of them. `robots.txt` is rendered
//! separately and always points at whichever file is the entry point.

use chrono::NaiveDate;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{AppError, Result};
use crate::models::{CanonicalRecord, SitemapConfig, SitemapEntry};
use crate::utils::{join_site_url, slugify};

pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
pub const SINGLE_SITEMAP_FILE: &str = "sitemap.xml";
pub const SITEMAP_INDEX_FILE: &str = "sitemap-index.xml";
pub const ROBOTS_FILE: &str = "robots.txt";

/// A rendered XML document and the name it is published under.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapDocument {
    pub file_name: String,
    /// `<url>` entries, or referenced sitemaps for an index
    pub entry_count: usize,
    pub xml: String,
}

/// All sitemap documents of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapSet {
    pub documents: Vec<SitemapDocument>,
    /// Present only when the entries did not fit into one document
    pub index: Option<SitemapDocument>,
}

impl SitemapSet {
    pub fn url_count(&self) -> usize {
        self.documents.iter().map(|d| d.entry_count).sum()
    }

    pub fn is_sharded(&self) -> bool {
        self.index.is_some()
    }

    /// File crawlers should be pointed at.
    pub fn entry_point(&self) -> &str {
        match (&self.index, self.documents.first()) {
            (Some(index), _) => &index.file_name,
            (None, Some(document)) => &document.file_name,
            (None, None) => SINGLE_SITEMAP_FILE,
        }
    }

    /// Every file in publication order, index last.
    pub fn files(&self) -> impl Iterator<Item = &SitemapDocument> {
        self.documents.iter().chain(self.index.iter())
    }
}

/// Renders sitemaps, the sitemap index and robots.txt for one site.
pub struct SitemapBuilder {
    site_url: String,
    max_per_document: usize,
    run_date: NaiveDate,
}

impl SitemapBuilder {
    pub fn new(site_url: impl Into<String>, max_per_document: usize, run_date: NaiveDate) -> Self {
        Self {
            site_url: site_url.into(),
            max_per_document: max_per_document.max(1),
            run_date,
        }
    }

    pub fn from_config(config: &SitemapConfig, run_date: NaiveDate) -> Self {
        Self::new(&config.site_url, config.max_urls_per_file, run_date)
    }

    /// Partition `entries` and render every document.
    pub fn build(&self, entries: &[SitemapEntry]) -> Result<SitemapSet> {
        if entries.len() <= self.max_per_document {
            let document = SitemapDocument {
                file_name: SINGLE_SITEMAP_FILE.to_string(),
                entry_count: entries.len(),
                xml: render_urlset(entries)?,
            };
            return Ok(SitemapSet {
                documents: vec![document],
                index: None,
            });
        }

        let mut documents = Vec::new();
        let mut references = Vec::new();
        for (position, chunk) in entries.chunks(self.max_per_document).enumerate() {
            let file_name = format!("sitemap-{}.xml", position + 1);
            let last_modified = chunk
                .iter()
                .map(|e| e.last_modified)
                .max()
                .unwrap_or(self.run_date);
            references.push((join_site_url(&self.site_url, &file_name), last_modified));
            documents.push(SitemapDocument {
                file_name,
                entry_count: chunk.len(),
                xml: render_urlset(chunk)?,
            });
        }

        let index = SitemapDocument {
            file_name: SITEMAP_INDEX_FILE.to_string(),
            entry_count: references.len(),
            xml: render_index(&references)?,
        };

        Ok(SitemapSet {
            documents,
            index: Some(index),
        })
    }

    /// Allow-all crawl policy pointing at the set's entry point.
    pub fn robots(&self, set: &SitemapSet, crawl_delay_secs: u32) -> String {
        format!(
            "User-agent: *\nAllow: /\nCrawl-delay: {}\n\nSitemap: {}\n",
            crawl_delay_secs,
            join_site_url(&self.site_url, set.entry_point())
        )
    }

    /// Entries for configured static pages followed by one per record.
    ///
    /// Records without an id cannot be addressed and are skipped.
    pub fn entries(&self, config: &SitemapConfig, records: &[CanonicalRecord]) -> Vec<SitemapEntry> {
        let mut entries: Vec<SitemapEntry> = config
            .static_pages
            .iter()
            .map(|page| {
                SitemapEntry::new(join_site_url(&self.site_url, &page.path), self.run_date)
                    .with_change_frequency(page.change_frequency)
                    .with_priority(page.priority)
            })
            .collect();

        let mut skipped = 0usize;
        for record in records {
            if record.id.is_empty() {
                skipped += 1;
                continue;
            }
            let path = record_path(&config.record_path, record);
            entries.push(
                SitemapEntry::new(join_site_url(&self.site_url, &path), self.run_date)
                    .with_change_frequency(config.change_frequency)
                    .with_priority(config.priority),
            );
        }

        if skipped > 0 {
            log::warn!("Skipped {} record(s) without an id", skipped);
        }
        entries
    }
}

/// Fill `{id}`, `{state}` and `{slug}` in a path template.
pub fn record_path(template: &str, record: &CanonicalRecord) -> String {
    let state = match record.state.trim() {
        "" => "unknown".to_string(),
        state => slugify(state),
    };
    template
        .replace("{id}", &slugify(&record.id))
        .replace("{state}", &state)
        .replace("{slug}", &slugify(&record.name))
}

fn render_urlset(entries: &[SitemapEntry]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut urlset = BytesStart::new("urlset");
    urlset.push_attribute(("xmlns", SITEMAP_NAMESPACE));
    writer.write_event(Event::Start(urlset))?;

    for entry in entries {
        writer.write_event(Event::Start(BytesStart::new("url")))?;
        write_text_element(&mut writer, "loc", &entry.location)?;
        write_text_element(
            &mut writer,
            "lastmod",
            &entry.last_modified.format("%Y-%m-%d").to_string(),
        )?;
        write_text_element(&mut writer, "changefreq", entry.change_frequency.as_str())?;
        write_text_element(&mut writer, "priority", &format_priority(entry.priority))?;
        writer.write_event(Event::End(BytesEnd::new("url")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("urlset")))?;
    into_string(writer)
}

fn render_index(references: &[(String, NaiveDate)]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut index = BytesStart::new("sitemapindex");
    index.push_attribute(("xmlns", SITEMAP_NAMESPACE));
    writer.write_event(Event::Start(index))?;

    for (location, last_modified) in references {
        writer.write_event(Event::Start(BytesStart::new("sitemap")))?;
        write_text_element(&mut writer, "loc", location)?;
        write_text_element(
            &mut writer,
            "lastmod",
            &last_modified.format("%Y-%m-%d").to_string(),
        )?;
        writer.write_event(Event::End(BytesEnd::new("sitemap")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("sitemapindex")))?;
    into_string(writer)
}

/// Two decimals, trimmed to one when the second is zero (`0.5`, `0.25`, `1.0`).
fn format_priority(priority: f32) -> String {
    let mut text = format!("{priority:.2}");
    if text.ends_with('0') {
        text.pop();
    }
    text
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn into_string(writer: Writer<Vec<u8>>) -> Result<String> {
    let mut xml = String::from_utf8(writer.into_inner())
        .map_err(|e| AppError::validation(format!("sitemap is not UTF-8: {e}")))?;
    xml.push('\n');
    Ok(xml)
}
