//! Template and overlay merging
//!
//! Each overlay page becomes a Form XObject on the template page. The
//! template's own content is bracketed by `q`/`Q` so whatever graphics state
//! it leaves behind cannot leak into the overlays, which are then painted in
//! order: main text first, footer last.

use crate::error::{Error, Result};
use crate::fonts::RegisteredFont;
use crate::overlay::OverlayPage;
use crate::template::TemplatePage;
use lopdf::{
    content::{Content, Operation},
    Dictionary, Document, Object, ObjectId, Stream,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Size difference, in points, tolerated before an overlay counts as mismatched.
const SIZE_TOLERANCE: f32 = 0.01;

/// The template page with its overlays composited on top.
#[derive(Debug, Clone)]
pub struct MergedPage {
    document: Document,
    page_id: ObjectId,
    width: f32,
    height: f32,
}

impl MergedPage {
    pub fn page_size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Number of pages in the merged document, always 1.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn page_id(&self) -> ObjectId {
        self.page_id
    }

    /// Serialize to PDF bytes with stream compression applied.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut document = self.document.clone();
        document.compress();
        let mut output = Vec::new();
        document.save_to(&mut output)?;
        Ok(output)
    }

    /// Write the merged page to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        fs::write(path, bytes).map_err(|source| Error::OutputWrite {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Wrote merged page to {}", path.display());
        Ok(())
    }
}

/// Composite `main` and then `footer` onto a copy of the template page.
pub fn merge_template_with_overlays(
    template: &TemplatePage,
    main: &OverlayPage,
    footer: Option<&OverlayPage>,
) -> Result<MergedPage> {
    let mut document = template.document().clone();
    let page_id = template.page_id();
    let [x0, y0, _, _] = template.media_box();

    let mut names = Vec::new();
    let mut programs = Vec::new();
    for overlay in std::iter::once(main).chain(footer) {
        warn_on_size_mismatch(template, overlay);
        let form_id = import_overlay_as_form(&mut document, overlay, &mut programs)?;
        let name = add_xobject(&mut document, page_id, form_id)?;
        names.push(name);
    }

    let mut contents = existing_contents(&document, page_id)?;
    let open = document.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let close = document.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
    let draw = document.add_object(Stream::new(Dictionary::new(), draw_forms(&names, x0, y0)?));

    contents.insert(0, Object::Reference(open));
    contents.push(Object::Reference(close));
    contents.push(Object::Reference(draw));
    document
        .get_dictionary_mut(page_id)?
        .set("Contents", Object::Array(contents));

    Ok(MergedPage {
        document,
        page_id,
        width: template.width(),
        height: template.height(),
    })
}

fn warn_on_size_mismatch(template: &TemplatePage, overlay: &OverlayPage) {
    let (tw, th) = template.page_size();
    let (ow, oh) = overlay.page_size();
    if (tw - ow).abs() > SIZE_TOLERANCE || (th - oh).abs() > SIZE_TOLERANCE {
        log::warn!(
            "Overlay for {:?} is {}x{} but template {} is {}x{}, merging without scaling",
            overlay.text(),
            ow,
            oh,
            template.source().display(),
            tw,
            th
        );
    }
}

/// Copy the overlay page into `target` as a Form XObject and return its id.
///
/// `programs` holds the font programs already copied into `target`. An
/// overlay drawn with one of those fonts points at the existing FontFile2
/// stream instead of carrying a second copy.
fn import_overlay_as_form(
    target: &mut Document,
    overlay: &OverlayPage,
    programs: &mut Vec<(RegisteredFont, ObjectId)>,
) -> Result<ObjectId> {
    let source = overlay.document();
    let page = source.get_dictionary(overlay.page_id())?;
    let (width, height) = overlay.page_size();

    let mut importer = Importer::new(source);
    let program = overlay.font_program();
    if let Some((font, program_id)) = program {
        if let Some((_, shared)) = programs.iter().find(|(known, _)| known.same_font(font)) {
            importer.ids.insert(program_id, *shared);
        }
    }
    let resources = match page.get(b"Resources") {
        Ok(res) => importer.import_value(target, res.clone())?,
        Err(_) => Object::Dictionary(Dictionary::new()),
    };
    if let Some((font, program_id)) = program {
        if let Some(&imported) = importer.ids.get(&program_id) {
            if !programs.iter().any(|(known, _)| known.same_font(font)) {
                programs.push((font.clone(), imported));
            }
        }
    }
    let content = source.get_page_content(overlay.page_id())?;

    let dict = Dictionary::from_iter([
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Form".to_vec())),
        (
            "BBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width),
                Object::Real(height),
            ]),
        ),
        ("Resources", resources),
    ]);
    Ok(target.add_object(Stream::new(dict, content)))
}

/// Register `form_id` in the page's XObject resources under a fresh name.
fn add_xobject(doc: &mut Document, page_id: ObjectId, form_id: ObjectId) -> Result<String> {
    let mut resources = match doc.get_dictionary(page_id)?.get(b"Resources") {
        Ok(obj) => doc.dereference(obj)?.1.as_dict()?.clone(),
        Err(_) => Dictionary::new(),
    };
    let mut xobjects = match resources.get(b"XObject") {
        Ok(obj) => doc.dereference(obj)?.1.as_dict()?.clone(),
        Err(_) => Dictionary::new(),
    };

    let mut n = 1;
    while xobjects.has(format!("Overlay{}", n).as_bytes()) {
        n += 1;
    }
    let name = format!("Overlay{}", n);
    xobjects.set(name.as_bytes().to_vec(), Object::Reference(form_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    doc.get_dictionary_mut(page_id)?
        .set("Resources", Object::Dictionary(resources));
    Ok(name)
}

/// Content stream references of the page, flattened into a single list.
fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc.get_dictionary(page_id)?;
    let contents = match page.get(b"Contents") {
        Ok(obj) => obj,
        Err(_) => return Ok(Vec::new()),
    };

    match contents {
        Object::Reference(id) => match doc.get_object(*id)? {
            Object::Stream(_) => Ok(vec![Object::Reference(*id)]),
            Object::Array(items) => Ok(items.clone()),
            _ => Err(Error::Pdf("page Contents must be a stream or array".to_string())),
        },
        Object::Array(items) => Ok(items.clone()),
        _ => Err(Error::Pdf("page Contents must be a stream or array".to_string())),
    }
}

/// `q 1 0 0 1 x0 y0 cm /Name Do Q` for each overlay, in paint order.
fn draw_forms(names: &[String], x0: f32, y0: f32) -> Result<Vec<u8>> {
    let mut operations = Vec::with_capacity(names.len() * 4);
    for name in names {
        operations.push(Operation::new("q", vec![]));
        operations.push(Operation::new(
            "cm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Real(x0),
                Object::Real(y0),
            ],
        ));
        operations.push(Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]));
        operations.push(Operation::new("Q", vec![]));
    }
    Ok(Content { operations }.encode()?)
}

/// Deep copy of objects from one document into another with fresh ids.
struct Importer<'a> {
    source: &'a Document,
    ids: HashMap<ObjectId, ObjectId>,
}

impl<'a> Importer<'a> {
    fn new(source: &'a Document) -> Self {
        Self {
            source,
            ids: HashMap::new(),
        }
    }

    fn import_reference(&mut self, target: &mut Document, id: ObjectId) -> Result<ObjectId> {
        if let Some(&mapped) = self.ids.get(&id) {
            return Ok(mapped);
        }
        // Mapped before recursing so reference cycles terminate.
        let new_id = target.new_object_id();
        self.ids.insert(id, new_id);

        let object = self.source.get_object(id)?.clone();
        let object = self.import_value(target, object)?;
        target.objects.insert(new_id, object);
        Ok(new_id)
    }

    fn import_value(&mut self, target: &mut Document, object: Object) -> Result<Object> {
        Ok(match object {
            Object::Reference(id) => Object::Reference(self.import_reference(target, id)?),
            Object::Array(items) => {
                let mut imported = Vec::with_capacity(items.len());
                for item in items {
                    imported.push(self.import_value(target, item)?);
                }
                Object::Array(imported)
            }
            Object::Dictionary(dict) => Object::Dictionary(self.import_dictionary(target, dict)?),
            Object::Stream(mut stream) => {
                stream.dict = self.import_dictionary(target, stream.dict)?;
                Object::Stream(stream)
            }
            other => other,
        })
    }

    fn import_dictionary(&mut self, target: &mut Document, dict: Dictionary) -> Result<Dictionary> {
        let mut imported = Dictionary::new();
        for (key, value) in dict {
            imported.set(key, self.import_value(target, value)?);
        }
        Ok(imported)
    }
}
