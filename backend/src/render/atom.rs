//! Atom feed with OpenSearch response elements.

use common::search_const::MAX_RESULT_WINDOW;
use common::search_context::{SearchContext, SearchParam};
use common::search_result::{DataFile, RenderedResult, ResultRecord, SearchResults, value_to_string};
use url::form_urlencoded;

use crate::config::Settings;
use crate::render::links::{AccessProtocol, file_path, mime_type, urljoin_path};
use crate::render::xml::Element;
use crate::render::{RenderFormat, ResultRenderer, digest_page, feed_title, subtitle};

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";
const NAMESPACES: [(&str, &str); 8] = [
    ("os", "http://a9.com/-/spec/opensearch/1.1/"),
    ("dc", "http://purl.org/dc/terms/"),
    ("eo", "http://a9.com/-/opensearch/extensions/eo/1.0/"),
    ("geo", "http://a9.com/-/opensearch/extensions/geo/1.0/"),
    ("time", "http://a9.com/-/opensearch/extensions/time/1.0/"),
    ("ceda", "http://localhost/ceda/opensearch"),
    ("param", "http://a9.com/-/spec/opensearch/extensions/parameters/1.0/"),
    ("georss", "http://www.georss.org/georss"),
];

pub struct AtomRenderer<'a> {
    settings: &'a Settings,
}

impl<'a> AtomRenderer<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    fn search_url(&self, context: &SearchContext) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(context.iter().map(|(param, value)| (param.name(), value)))
            .finish();
        format!("{}/opensearch/atom?{}", self.settings.base_url, query)
    }

    fn uid_url(&self, format: &str, uid: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("uid", uid)
            .finish();
        format!("{}/{}?{}", self.settings.base_url, format, query)
    }

    /// Url of the same search starting at another 1-based record index.
    fn page_url(&self, context: &SearchContext, start_index: i64) -> String {
        let mut page = context.clone();
        page.remove(SearchParam::StartPage);
        page.set(SearchParam::StartRecord, start_index.to_string());
        self.search_url(&page)
    }

    fn navigation_links(&self, result: &RenderedResult) -> Vec<Element> {
        let link = |rel: &str, start_index: i64| {
            Element::new("link")
                .attr("rel", rel)
                .attr("href", self.page_url(&result.query, start_index))
                .attr("type", RenderFormat::Atom.content_type())
        };
        let mut links = vec![link("first", 1)];
        if result.count <= 0 {
            return links;
        }
        let count = result.count;
        let reachable = (result.total_results as i64).min(MAX_RESULT_WINDOW);

        if result.start_index > 1 {
            links.push(link("previous", result.start_index.saturating_sub(count).max(1)));
        }
        let next = result.start_index.saturating_add(count);
        if next <= reachable {
            links.push(link("next", next));
        }
        if reachable > 0 {
            links.push(link("last", ((reachable - 1) / count) * count + 1));
        }
        links
    }

    fn file_links(&self, rel: &str, directory: Option<&str>, file_name: &str) -> Vec<Element> {
        let path = file_path(directory, file_name);
        let mime = mime_type(file_name);
        AccessProtocol::ALL
            .iter()
            .map(|protocol| {
                let server = match protocol {
                    AccessProtocol::Ftp => &self.settings.ftp_server,
                    AccessProtocol::Pydap => &self.settings.pydap_server,
                };
                let mut link = Element::new("link")
                    .attr("href", urljoin_path(server, &path))
                    .attr("rel", rel);
                if let Some(mime) = mime {
                    link.set_attr("type", mime);
                }
                link.attr("title", protocol.title())
            })
            .collect()
    }

    fn entry(&self, record: &ResultRecord, updated: &str) -> Element {
        let document = &record.document;
        let title = document
            .misc
            .as_ref()
            .and_then(|misc| misc.product_info.get("Product Class Description"))
            .map(value_to_string)
            .unwrap_or_else(|| record.id.clone());

        let mut entry = Element::new("entry")
            .child(Element::with_text("id", self.uid_url("opensearch/atom", &record.id)))
            .child(Element::with_text("title", title).attr("type", "text"))
            .child(Element::with_text("updated", updated))
            .child(Element::with_text("published", updated))
            .child(Element::with_text("dc:identifier", record.id.as_str()));

        if let Some(temporal) = &document.temporal {
            let date = format!(
                "{}Z/{}Z",
                temporal.start_time.as_deref().unwrap_or_default(),
                temporal.end_time.as_deref().unwrap_or_default()
            );
            entry.push(Element::with_text("dc:date", date));
        }

        for (segment, format) in [("gml", RenderFormat::GeoMetadata), ("json", RenderFormat::Json)] {
            entry.push(
                Element::new("link")
                    .attr("href", self.uid_url(&format!("resource/{}", segment), &record.id))
                    .attr("rel", "alternate")
                    .attr("type", format.content_type().split(';').next().unwrap_or_default()),
            );
        }

        let Some(file) = &document.file else {
            tracing::debug!("record {} has no file section", record.id);
            return entry;
        };
        let directory = file.directory.as_deref();

        if file.is_online() {
            let rel = if file.is_multi_file() { "section" } else { "enclosure" };
            for DataFile { name, .. } in file.data_file_list() {
                for link in self.file_links(rel, directory, &name) {
                    entry.push(link);
                }
            }
        }
        if let Some(metadata_file) = file.metadata_file.as_deref().filter(|f| !f.is_empty()) {
            for link in self.file_links("via", directory, metadata_file) {
                entry.push(link);
            }
        }
        if let Some(quicklook_file) = file.quicklook_file.as_deref().filter(|f| !f.is_empty()) {
            for link in self.file_links("icon", directory, quicklook_file) {
                entry.push(link);
            }
        }
        entry
    }
}

impl ResultRenderer for AtomRenderer<'_> {
    fn digest(&self, results: SearchResults, context: &SearchContext) -> RenderedResult {
        let mut result = digest_page(feed_title(self.settings), results, context);
        result.subtitle = Some(subtitle(&result));
        result
    }

    fn render(&self, result: &RenderedResult) -> String {
        let updated = result.generated_at.to_rfc3339();

        let mut feed = Element::new("feed").attr("xmlns", ATOM_NAMESPACE);
        for (prefix, namespace) in NAMESPACES {
            feed.set_attr(format!("xmlns:{}", prefix), namespace);
        }

        let mut query = Element::new("os:Query").attr("role", "request");
        for (param, value) in result.query.iter() {
            query.set_attr(param.name(), value);
        }

        let mut feed = feed
            .child(Element::with_text("id", self.search_url(&result.query)))
            .child(Element::with_text("title", result.title.as_str()))
            .child(Element::with_text("subtitle", result.subtitle.clone().unwrap_or_default()).attr("type", "html"))
            .child(Element::with_text("updated", updated.as_str()))
            .child(Element::new("author").child(Element::with_text("name", self.settings.feed_author.as_str())))
            .child(Element::with_text("os:totalResults", result.total_results.to_string()))
            .child(Element::with_text("os:startIndex", result.start_index.to_string()))
            .child(Element::with_text("os:itemsPerPage", result.count.to_string()))
            .child(query)
            .child(
                Element::new("link")
                    .attr("rel", "self")
                    .attr("href", self.search_url(&result.query))
                    .attr("type", RenderFormat::Atom.content_type()),
            );
        for link in self.navigation_links(result) {
            feed.push(link);
        }
        for record in &result.records {
            feed.push(self.entry(record, &updated));
        }
        feed.to_document()
    }
}
