use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use overlay_composer::{
    CertificateComposer, CompositionOptions, Error, FontRegistry, HorizontalAlignment, TemplatePage,
};
use std::path::Path;

const FONT_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/fonts/DejaVuSans.ttf");

fn create_test_pdf(path: &Path, width: i64, height: i64) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 36.into()]),
            Operation::new("Td", vec![150.into(), 650.into()]),
            Operation::new("Tj", vec![Object::string_literal("Certificate of Completion")]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
    let page_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        (
            "MediaBox",
            Object::Array(vec![0.into(), 0.into(), Object::Integer(width), Object::Integer(height)]),
        ),
        (
            "Resources",
            Object::Dictionary(Dictionary::from_iter([(
                "Font",
                Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
            )])),
        ),
        ("Contents", Object::Reference(content_id)),
    ]));
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.save(path).unwrap();
}

fn registry() -> FontRegistry {
    let mut registry = FontRegistry::new();
    registry.register("DejaVu", FONT_PATH).unwrap();
    registry
}

fn page_text(doc: &Document) -> String {
    let page_id = *doc.get_pages().get(&1).unwrap();
    String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned()
}

#[test]
fn test_compose_to_file_writes_single_page() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = dir.path().join("template.pdf");
    let output_path = dir.path().join("template_Jane_Doe.pdf");
    create_test_pdf(&template_path, 612, 792);

    let composer = CertificateComposer::new(&registry(), "DejaVu", CompositionOptions::default()).unwrap();
    let merged = composer
        .compose_to_file(&template_path, "Jane Doe", "2024.01.01", &output_path)
        .unwrap();
    assert_eq!(merged.page_size(), (612.0, 792.0));

    let written = Document::load(&output_path).unwrap();
    assert_eq!(written.get_pages().len(), 1);
    assert!(page_text(&written).contains("Certificate of Completion"));
}

#[test]
fn test_main_text_is_centered_on_template() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = dir.path().join("template.pdf");
    create_test_pdf(&template_path, 612, 792);

    let registry = registry();
    let font = registry.get("DejaVu").unwrap();
    let width = font.text_width("Jane Doe", 32.0);

    let template = TemplatePage::load(&template_path).unwrap();
    let overlay = overlay_composer::render_overlay_page(
        &font,
        template.width(),
        template.height(),
        &overlay_composer::OverlaySpec::new("Jane Doe", 32.0, 280.0),
    )
    .unwrap();
    let placement = overlay.placement();
    assert!((placement.x - (612.0 - width) / 2.0).abs() < 1e-3);
    assert_eq!(placement.y, 280.0);
}

#[test]
fn test_footer_with_date_is_stamped_on_top() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = dir.path().join("diploma.v2.pdf");
    create_test_pdf(&template_path, 842, 595);

    let options = CompositionOptions {
        add_footer: true,
        add_date_to_footer: true,
        footer_alignment: HorizontalAlignment::Right,
        ..CompositionOptions::default()
    };
    let composer = CertificateComposer::new(&registry(), "DejaVu", options).unwrap();
    let template = TemplatePage::load(&template_path).unwrap();
    let merged = composer.compose(&template, "Jan Kowalski", "2024.01.01").unwrap();

    assert_eq!(merged.page_size(), (842.0, 595.0));
    let content = page_text(merged.document());
    let main_at = content.find("/Overlay1 Do").unwrap();
    let footer_at = content.find("/Overlay2 Do").unwrap();
    assert!(main_at < footer_at);

    let bytes = merged.to_bytes().unwrap();
    let reloaded = Document::load_mem(&bytes).unwrap();
    assert_eq!(reloaded.get_pages().len(), 1);
}

#[test]
fn test_missing_template_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let composer = CertificateComposer::new(&registry(), "DejaVu", CompositionOptions::default()).unwrap();
    let err = composer
        .compose_to_file(
            dir.path().join("nope.pdf"),
            "Jane Doe",
            "2024.01.01",
            dir.path().join("out.pdf"),
        )
        .unwrap_err();
    assert!(matches!(err, Error::TemplateNotFound(_)));
    assert!(!err.is_batch_fatal());
}

#[test]
fn test_registration_twice_keeps_layout_stable() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = dir.path().join("template.pdf");
    create_test_pdf(&template_path, 612, 792);
    let template = TemplatePage::load(&template_path).unwrap();

    let mut registry = registry();
    let first = CertificateComposer::new(&registry, "DejaVu", CompositionOptions::default())
        .unwrap()
        .compose(&template, "Jane Doe", "2024.01.01")
        .unwrap();
    registry.register("DejaVu", FONT_PATH).unwrap();
    let second = CertificateComposer::new(&registry, "DejaVu", CompositionOptions::default())
        .unwrap()
        .compose(&template, "Jane Doe", "2024.01.01")
        .unwrap();

    assert_eq!(first.page_size(), second.page_size());
    assert_eq!(page_text(first.document()), page_text(second.document()));
}

#[test]
fn test_empty_text_still_produces_page() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = dir.path().join("template.pdf");
    create_test_pdf(&template_path, 612, 792);
    let template = TemplatePage::load(&template_path).unwrap();

    let composer = CertificateComposer::new(&registry(), "DejaVu", CompositionOptions::default()).unwrap();
    let merged = composer.compose(&template, "", "2024.01.01").unwrap();
    assert_eq!(merged.page_count(), 1);
}
