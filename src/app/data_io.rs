use std::io::{self, Write};

use serde::Serialize;

use super::types::{OutputFormatArg, PageAnalysis};

const CSV_HEADERS: [&str; 12] = [
    "id",
    "title",
    "html_version",
    "internal_links",
    "external_links",
    "broken_links",
    "login_form",
    "url",
    "meta",
    "headings",
    "broken_link_details",
    "total_headings",
];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(value: OutputFormatArg) -> Self {
        match value {
            OutputFormatArg::Csv => OutputFormat::Csv,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ExportRecord<'a> {
    id: i64,
    title: &'a str,
    html_version: &'a str,
    internal_links: u32,
    external_links: u32,
    broken_links: u32,
    login_form: &'static str,
    url: &'a str,
    meta: &'a str,
    headings: String,
    broken_link_details: String,
    total_headings: u32,
}

fn page_to_export_record(page: &PageAnalysis) -> ExportRecord<'_> {
    let headings = page.ordered_headings();
    ExportRecord {
        id: page.id,
        title: &page.title,
        html_version: &page.html_version,
        internal_links: page.internal_links,
        external_links: page.external_links,
        broken_links: page.broken_links,
        login_form: page.login_form_label(),
        url: &page.url,
        meta: &page.meta,
        total_headings: headings.iter().map(|(_, count)| *count).sum(),
        headings: headings
            .iter()
            .map(|(level, count)| format!("{level}={count}"))
            .collect::<Vec<_>>()
            .join("|"),
        broken_link_details: page
            .broken_link_details
            .iter()
            .map(|detail| format!("{} {}", detail.status, detail.href))
            .collect::<Vec<_>>()
            .join("|"),
    }
}

pub fn write_snapshot<W: Write>(
    mut out: W,
    pages: &[PageAnalysis],
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Csv => {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(out);
            writer.write_record(CSV_HEADERS)?;
            for page in pages {
                writer.serialize(page_to_export_record(page))?;
            }
            writer.flush()
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, pages).map_err(io::Error::other)?;
            out.write_all(b"\n")?;
            out.flush()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::tests::page;
    use crate::app::types::BrokenLinkDetail;

    fn render(pages: &[PageAnalysis], format: OutputFormat) -> String {
        let mut buf = Vec::new();
        write_snapshot(&mut buf, pages, format).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn csv_has_header_and_one_row_per_page() {
        let mut first = page(1, "Example");
        first.url = "http://example.com".into();
        first.broken_links = 1;
        first.broken_link_details.push(BrokenLinkDetail {
            href: "http://example.com/gone".into(),
            status: 404,
        });
        let pages = vec![first, page(2, "Second")];

        let out = render(&pages, OutputFormat::Csv);
        let lines = out.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADERS.join(","));
        assert_eq!(
            lines[1],
            "1,Example,HTML5,3,2,1,No,http://example.com,,h1=1,404 http://example.com/gone,1"
        );
        assert!(lines[2].starts_with("2,Second,"));
    }

    #[test]
    fn empty_csv_is_just_the_header() {
        let out = render(&[], OutputFormat::Csv);
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn json_keeps_wire_field_names() {
        let out = render(&[page(1, "Example")], OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["htmlVersion"], "HTML5");
        assert_eq!(value[0]["internalLinks"], 3);
        assert_eq!(value[0]["loginForm"], false);
    }
}
