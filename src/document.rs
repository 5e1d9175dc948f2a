use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::model::DocumentRecord;

/// Source of the document currently displayed, and the endpoint that saves edits to it.
pub trait DocumentRepository {
    fn fetch(&self, id: &str) -> Result<DocumentRecord, Error>;
    fn update(&mut self, id: &str, record: &DocumentRecord) -> Result<(), Error>;
}

/// One `<id>.xml` file per document:
///
/// ```xml
/// <document status="draft">
///   <title>Engagement letter</title>
///   <body>...</body>
/// </document>
/// ```
pub struct XmlDocumentStore {
    root: PathBuf,
}

impl XmlDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, Error> {
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\', '\0'])
            && !id.contains("..");
        if !valid {
            return Err(Error::InvalidDocument(format!("invalid document id '{id}'")));
        }
        Ok(self.root.join(format!("{id}.xml")))
    }
}

impl DocumentRepository for XmlDocumentStore {
    fn fetch(&self, id: &str) -> Result<DocumentRecord, Error> {
        let path = self.path_for(id)?;
        let xml = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::DocumentNotFound(id.to_string()),
            _ => Error::Io(e),
        })?;
        parse_record(&xml)
    }

    fn update(&mut self, id: &str, record: &DocumentRecord) -> Result<(), Error> {
        let path = self.path_for(id)?;
        std::fs::create_dir_all(&self.root)?;
        write_atomically(&path, serialize_record(record).as_bytes())?;
        log::debug!("Updated document '{id}' ({} bytes body)", record.body.len());
        Ok(())
    }
}

/// Read a record from a file path directly (used by the CLI).
pub fn load_record(path: &Path) -> Result<DocumentRecord, Error> {
    let xml = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => Error::Io(
            std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())),
        ),
        _ => Error::Io(e),
    })?;
    parse_record(&xml)
}

pub fn parse_record(xml: &str) -> Result<DocumentRecord, Error> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();
    if root.tag_name().name() != "document" {
        return Err(Error::InvalidDocument(format!(
            "expected <document> root, found <{}>",
            root.tag_name().name()
        )));
    }

    let child_text = |name: &str| -> String {
        root.children()
            .find(|n| n.is_element() && n.tag_name().name() == name)
            .map(|n| {
                n.descendants()
                    .filter(|d| d.is_text())
                    .filter_map(|d| d.text())
                    .collect::<String>()
            })
            .unwrap_or_default()
    };

    Ok(DocumentRecord {
        title: child_text("title").trim().to_string(),
        body: child_text("body"),
        status: root.attribute("status").unwrap_or_default().to_string(),
    })
}

pub fn serialize_record(record: &DocumentRecord) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(out, "<document status=\"{}\">", escape_xml(&record.status));
    let _ = writeln!(out, "  <title>{}</title>", escape_xml(&record.title));
    let _ = writeln!(out, "  <body>{}</body>", escape_xml(&record.body));
    out.push_str("</document>\n");
    out
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Write via a sibling temp file and rename, so readers never see a half-written file.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.part"));
    let result = std::fs::write(&tmp, bytes).and_then(|_| std::fs::rename(&tmp, path));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}
