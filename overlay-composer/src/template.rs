//! Template loading
//!
//! A template is reduced to its first page on load: inherited page
//! attributes are copied onto the page itself, the page tree is rebuilt
//! around that single page and everything no longer reachable is pruned.

use crate::error::{Error, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::{Path, PathBuf};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Maximum page tree depth walked when resolving inherited attributes.
const MAX_TREE_DEPTH: usize = 32;

/// US Letter, used when a page tree declares no MediaBox at all.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// The first page of a template document.
#[derive(Debug, Clone)]
pub struct TemplatePage {
    document: Document,
    page_id: ObjectId,
    media_box: [f32; 4],
    source: PathBuf,
}

impl TemplatePage {
    /// Load the first page of the PDF at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::TemplateNotFound(path.to_path_buf()));
        }

        let document = Document::load(path).map_err(|e| Error::TemplateUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_document(document, path.to_path_buf())
    }

    /// Load the first page of an in-memory PDF.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let source = PathBuf::from("<memory>");
        let document = Document::load_mem(bytes).map_err(|e| Error::TemplateUnreadable {
            path: source.clone(),
            reason: e.to_string(),
        })?;
        Self::from_document(document, source)
    }

    fn from_document(mut document: Document, source: PathBuf) -> Result<Self> {
        let unreadable = |reason: &str| Error::TemplateUnreadable {
            path: source.clone(),
            reason: reason.to_string(),
        };

        if document.is_encrypted() {
            return Err(unreadable("document is encrypted"));
        }

        let page_id = match document.page_iter().next() {
            Some(id) => id,
            None => return Err(unreadable("document has no pages")),
        };

        flatten_inherited_attributes(&mut document, page_id)
            .map_err(|e| unreadable(&format!("malformed first page: {}", e)))?;
        keep_single_page(&mut document, page_id)
            .map_err(|e| unreadable(&format!("malformed page tree: {}", e)))?;
        document.prune_objects();

        let media_box = read_media_box(&document, page_id).map_err(|e| unreadable(&e.to_string()))?;
        log::debug!(
            "Template {} first page media box {:?}",
            source.display(),
            media_box
        );

        Ok(Self {
            document,
            page_id,
            media_box,
            source,
        })
    }

    /// Page width in points.
    pub fn width(&self) -> f32 {
        (self.media_box[2] - self.media_box[0]).abs()
    }

    /// Page height in points.
    pub fn height(&self) -> f32 {
        (self.media_box[3] - self.media_box[1]).abs()
    }

    pub fn page_size(&self) -> (f32, f32) {
        (self.width(), self.height())
    }

    /// MediaBox as `[llx, lly, urx, ury]`.
    pub fn media_box(&self) -> [f32; 4] {
        self.media_box
    }

    /// Path the template was loaded from (`<memory>` for in-memory templates).
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub(crate) fn document(&self) -> &Document {
        &self.document
    }

    pub(crate) fn page_id(&self) -> ObjectId {
        self.page_id
    }
}

/// Copy inheritable attributes the page lacks from its nearest ancestor that has them.
fn flatten_inherited_attributes(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited: Vec<(&[u8], Object)> = Vec::new();
    {
        let page = doc.get_dictionary(page_id)?;
        for key in INHERITABLE {
            if page.has(key) {
                continue;
            }
            if let Some(value) = find_in_ancestors(doc, page, key) {
                inherited.push((key, value));
            }
        }
    }

    let page = doc.get_dictionary_mut(page_id)?;
    for (key, value) in inherited {
        page.set(key.to_vec(), value);
    }
    Ok(())
}

fn find_in_ancestors(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut node = page;
    for _ in 0..MAX_TREE_DEPTH {
        let parent_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        let parent = doc.get_dictionary(parent_id).ok()?;
        if let Ok(value) = parent.get(key) {
            return Some(value.clone());
        }
        node = parent;
    }
    None
}

/// Point the catalog at a fresh page tree whose only kid is `page_id`.
///
/// Catalog entries such as outlines and named destinations may reference the
/// dropped pages, so the catalog is rebuilt with just its page tree.
fn keep_single_page(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let catalog_id = doc.trailer.get(b"Root").and_then(Object::as_reference)?;

    let pages_id = doc.new_object_id();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
        ])),
    );

    let page = doc.get_dictionary_mut(page_id)?;
    page.set("Parent", Object::Reference(pages_id));

    doc.objects.insert(
        catalog_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ])),
    );
    Ok(())
}

fn read_media_box(doc: &Document, page_id: ObjectId) -> Result<[f32; 4]> {
    let page = doc.get_dictionary(page_id)?;
    let media_box = match page.get(b"MediaBox") {
        Ok(obj) => doc.dereference(obj)?.1,
        Err(_) => {
            log::warn!("Template page has no MediaBox, assuming US Letter");
            return Ok(DEFAULT_MEDIA_BOX);
        }
    };

    let values: Vec<f32> = media_box
        .as_array()?
        .iter()
        .filter_map(|o| doc.dereference(o).ok().and_then(|(_, v)| v.as_float().ok()))
        .collect();

    match values.as_slice() {
        [llx, lly, urx, ury] if (urx - llx).abs() > 0.0 && (ury - lly).abs() > 0.0 => {
            Ok([*llx, *lly, *urx, *ury])
        }
        _ => Err(Error::Pdf(format!("invalid MediaBox {:?}", values))),
    }
}
