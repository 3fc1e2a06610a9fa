use invoice_studio::model::AssetKind;
use invoice_studio::settings::Settings;
use invoice_studio::{Currency, ImageAsset, Invoice, ItemField, Template, export};

fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    let buffer = image::RgbaImage::from_pixel(width, height, image::Rgba([20, 60, 180, 255]));
    image::DynamicImage::ImageRgba8(buffer)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .expect("encode png");
    bytes
}

fn sample_invoice() -> Invoice {
    let mut invoice = Invoice::new();
    invoice.set_number("2024-031");
    invoice.set_issue_date("2024-09-01").unwrap();
    invoice.set_from_party("Studio North\n12 Canal St\nOslo");
    invoice.set_to_party("Acme GmbH\nBerlin");
    invoice.set_tax_rate("19");
    invoice.set_currency(Currency::Eur);
    invoice.set_template(Template::Modern);
    invoice.set_watermark(true);
    invoice.set_asset(
        AssetKind::Logo,
        Some(ImageAsset::from_data_uri(&asset_uri(10, 10)).unwrap()),
    );
    invoice.set_asset(
        AssetKind::Signature,
        Some(ImageAsset::from_data_uri(&asset_uri(12, 4)).unwrap()),
    );
    invoice
        .update_item(0, ItemField::Desc, "Design sprint")
        .unwrap();
    invoice.update_item(0, ItemField::Qty, "3").unwrap();
    invoice.update_item(0, ItemField::Price, "400").unwrap();
    invoice.add_item();
    invoice
        .update_item(1, ItemField::Desc, "Hosting (yearly)")
        .unwrap();
    invoice.update_item(1, ItemField::Price, "96.5").unwrap();
    invoice
}

fn asset_uri(width: u32, height: u32) -> String {
    ImageAsset::from_bytes(sample_png(width, height))
        .unwrap()
        .data_uri()
}

#[test]
fn exported_json_loads_back_into_an_equal_model() {
    let dir = tempfile::tempdir().unwrap();
    let invoice = sample_invoice();

    let path = export::export_json(&invoice, dir.path()).unwrap();
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "InvoiceData_2024-031.json"
    );

    let restored = export::load_invoice(&path).unwrap();
    assert_eq!(restored, invoice);
    assert_eq!(restored.totals(), invoice.totals());
}

#[test]
fn pdf_export_writes_a_single_pdf_file() {
    let dir = tempfile::tempdir().unwrap();
    let invoice = sample_invoice();
    let settings = Settings::default();

    let path = export::export_pdf(&invoice, &settings, dir.path()).unwrap();
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "Invoice_2024-031.pdf"
    );

    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn failed_load_leaves_no_trace() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("broken.json");
    std::fs::write(&bad, b"{ definitely not json").unwrap();
    assert!(export::load_invoice(&bad).is_err());
    assert!(export::load_invoice(&dir.path().join("missing.json")).is_err());
}

#[test]
fn one_shot_run_exports_both_formats() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    let invoice = sample_invoice();
    let source = export::export_json(&invoice, data_dir.path()).unwrap();

    let output = invoice_studio::run(invoice_studio::Config {
        load: Some(source),
        pdf: true,
        save: true,
        out_dir: Some(dir.path().to_path_buf()),
        template: Some(Template::Corporate),
        watermark: Some(false),
        settings_path: None,
    })
    .unwrap();

    assert!(output.contains("Invoice_2024-031.pdf"));
    assert!(output.contains("InvoiceData_2024-031.json"));
    assert!(dir.path().join("Invoice_2024-031.pdf").exists());

    let reexported = export::load_invoice(&dir.path().join("InvoiceData_2024-031.json")).unwrap();
    assert_eq!(reexported.template(), Template::Corporate);
    assert!(!reexported.use_watermark());
}
