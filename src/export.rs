use anyhow::{Context, Result, anyhow};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiny_skia::Pixmap;
use usvg::{Options, Tree, fontdb};

use crate::model::Invoice;
use crate::render::{PAGE_HEIGHT, PAGE_WIDTH, render_svg};
use crate::settings::Settings;

/// Rasterization factor over the 72 dpi page, for crisp embedded output.
pub const RASTER_SCALE: f32 = 3.0;

const A4_WIDTH_MM: f32 = 210.0;
const A4_HEIGHT_MM: f32 = 297.0;

/// Renders, rasterizes and emits the invoice as a one-page A4 PDF in
/// `out_dir`. The bytes are assembled fully in memory first, so a failing
/// stage leaves no partial file behind.
pub fn export_pdf(invoice: &Invoice, settings: &Settings, out_dir: &Path) -> Result<PathBuf> {
    let bytes = pdf_bytes(invoice, settings)?;
    let path = out_dir.join(format!(
        "Invoice_{}.pdf",
        sanitize_filename_component(invoice.export_label())
    ));
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;
    fs::write(&path, bytes)
        .with_context(|| format!("failed to write pdf to {}", path.display()))?;
    Ok(path)
}

pub fn pdf_bytes(invoice: &Invoice, settings: &Settings) -> Result<Vec<u8>> {
    tracing::debug!(invoice = invoice.display_number(), "rendering page");
    let svg = render_svg(invoice, &invoice.totals());
    tracing::debug!(scale = RASTER_SCALE, "rasterizing page");
    let png = rasterize_svg(&svg, RASTER_SCALE, settings)?;
    tracing::debug!(bytes = png.len(), "emitting pdf");
    embed_page(&png)
}

/// Serializes the whole model next to the PDF as a re-importable document.
pub fn export_json(invoice: &Invoice, out_dir: &Path) -> Result<PathBuf> {
    let bytes = json_bytes(invoice)?;
    let path = out_dir.join(format!(
        "InvoiceData_{}.json",
        sanitize_filename_component(invoice.export_label())
    ));
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;
    fs::write(&path, bytes)
        .with_context(|| format!("failed to write json to {}", path.display()))?;
    Ok(path)
}

pub fn json_bytes(invoice: &Invoice) -> Result<Vec<u8>> {
    let mut bytes =
        serde_json::to_vec_pretty(invoice).with_context(|| "failed to serialize invoice")?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parses an exported document. Returns a fresh model only when the whole
/// payload is valid, so a caller can keep its current model on failure.
pub fn import_json(bytes: &[u8]) -> Result<Invoice> {
    let mut invoice: Invoice =
        serde_json::from_slice(bytes).with_context(|| "failed to parse invoice json")?;
    invoice.normalize();
    Ok(invoice)
}

pub fn load_invoice(path: &Path) -> Result<Invoice> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read invoice file {}", path.display()))?;
    import_json(&bytes)
}

fn rasterize_svg(svg: &str, scale: f32, settings: &Settings) -> Result<Vec<u8>> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    if let Some(path) = settings.font_path.as_deref() {
        db.load_font_file(path)
            .with_context(|| format!("failed to load font file {}", path.display()))?;
    }
    let mut options = Options {
        fontdb: Arc::new(db),
        ..Options::default()
    };
    if let Some(family) = settings.font_family.as_deref() {
        options.font_family = family.to_string();
    }
    let tree = Tree::from_str(svg, &options).with_context(|| "failed to parse rendered SVG")?;
    let width = (PAGE_WIDTH * scale).round() as u32;
    let height = (PAGE_HEIGHT * scale).round() as u32;
    let mut pixmap = Pixmap::new(width, height).ok_or_else(|| anyhow!("empty page size"))?;
    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap_mut,
    );
    let image = image::RgbaImage::from_raw(width, height, pixmap.data().to_vec())
        .ok_or_else(|| anyhow!("failed to build image buffer from rendered page"))?;
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .with_context(|| "failed to encode rasterized page")?;
    Ok(bytes)
}

fn embed_page(png: &[u8]) -> Result<Vec<u8>> {
    use printpdf::{Image, ImageTransform, Mm, PdfDocument};

    let image = printpdf::image_crate::load_from_memory(png)
        .with_context(|| "failed to decode rasterized page")?;
    let width = image.width();
    let height = image.height();

    let (doc, page, layer) =
        PdfDocument::new("Invoice", Mm(A4_WIDTH_MM), Mm(A4_HEIGHT_MM), "Layer 1");
    let current_layer = doc.get_page(page).get_layer(layer);
    let pdf_image = Image::from_dynamic_image(&image);
    // At 72 dpi the raster occupies px/72*25.4 mm; scale it to cover A4 exactly.
    let transform = ImageTransform {
        translate_x: Some(Mm(0.0)),
        translate_y: Some(Mm(0.0)),
        rotate: None,
        scale_x: Some(A4_WIDTH_MM / px_to_mm(width)),
        scale_y: Some(A4_HEIGHT_MM / px_to_mm(height)),
        dpi: Some(72.0),
    };
    pdf_image.add_to_layer(current_layer, transform);

    let mut buffer = Vec::new();
    {
        let mut writer = std::io::BufWriter::new(&mut buffer);
        doc.save(&mut writer)
            .with_context(|| "failed to write pdf")?;
    }
    Ok(buffer)
}

fn px_to_mm(px: u32) -> f32 {
    let inches = px as f32 / 72.0;
    inches * 25.4
}

fn sanitize_filename_component(value: &str) -> String {
    let mut out = String::new();
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        "Draft".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{ImageAsset, test_png};
    use crate::model::{AssetKind, Currency, ItemField, Template};

    #[test]
    fn json_round_trip_preserves_the_whole_model() {
        let mut invoice = Invoice::new();
        invoice.set_number("2024-007");
        invoice.set_issue_date("2024-06-15").unwrap();
        invoice.set_from_party("Studio North\n12 Canal St");
        invoice.set_to_party("Acme GmbH");
        invoice.set_tax_rate("19");
        invoice.set_currency(Currency::Eur);
        invoice.set_template(Template::Corporate);
        invoice.set_watermark(true);
        invoice.set_asset(
            AssetKind::Logo,
            Some(ImageAsset::from_bytes(test_png(8, 4)).unwrap()),
        );
        invoice.set_asset(
            AssetKind::Signature,
            Some(ImageAsset::from_bytes(test_png(6, 2)).unwrap()),
        );
        invoice.add_item();
        invoice.update_item(1, ItemField::Desc, "Support retainer").unwrap();
        invoice.update_item(1, ItemField::Price, "120").unwrap();

        let bytes = json_bytes(&invoice).unwrap();
        let restored = import_json(&bytes).unwrap();
        assert_eq!(restored, invoice);
    }

    #[test]
    fn wire_field_names_match_the_original_documents() {
        let invoice = Invoice::new();
        let value: serde_json::Value =
            serde_json::from_slice(&json_bytes(&invoice).unwrap()).unwrap();
        for key in [
            "num",
            "date",
            "from",
            "to",
            "items",
            "tax",
            "currency",
            "logo",
            "signature",
            "template",
            "useWatermark",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["currency"], "$");
        assert_eq!(value["template"], "minimal");
        assert!(value["logo"].is_null());
    }

    #[test]
    fn import_accepts_tax_as_string_and_missing_fields() {
        let invoice = import_json(
            br#"{"num":"X-1","items":[{"desc":"A","qty":2,"price":5}],"tax":"7.5"}"#,
        )
        .unwrap();
        assert_eq!(invoice.number(), "X-1");
        assert_eq!(invoice.tax_rate(), 7.5);
        assert_eq!(invoice.currency(), Currency::Usd);
        assert_eq!(invoice.template(), Template::Minimal);
        let totals = invoice.totals();
        assert_eq!(totals.subtotal, 10.0);
        assert_eq!(totals.total, 10.75);
    }

    #[test]
    fn import_normalizes_an_empty_ledger() {
        let invoice = import_json(br#"{"num":"X-2","items":[]}"#).unwrap();
        assert_eq!(invoice.items().len(), 1);
    }

    #[test]
    fn import_rejects_garbage_without_touching_anything() {
        assert!(import_json(b"not json").is_err());
        assert!(import_json(br#"{"items":[{"qty":"NaN"#).is_err());
        assert!(import_json(br#"{"currency":"YEN"}"#).is_err());
        assert!(import_json(br#"{"template":"fancy"}"#).is_err());
        assert!(import_json(br#"{"logo":"data:image/png;base64,AAAA"}"#).is_err());
    }

    #[test]
    fn export_filenames_fall_back_to_draft() {
        let dir = tempfile::tempdir().unwrap();
        let mut invoice = Invoice::new();
        invoice.set_number("  ");
        let path = export_json(&invoice, dir.path()).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "InvoiceData_Draft.json"
        );

        invoice.set_number("2024/06 draft");
        let path = export_json(&invoice, dir.path()).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "InvoiceData_2024_06_draft.json"
        );
    }

    #[test]
    fn sanitizer_never_emits_path_separators() {
        for raw in ["../../etc/passwd", "a/b\\c", "", "inv 01"] {
            let cleaned = sanitize_filename_component(raw);
            assert!(!cleaned.contains('/'));
            assert!(!cleaned.contains('\\'));
            assert!(!cleaned.is_empty());
        }
    }
}
