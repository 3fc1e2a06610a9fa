use crate::model::{FROM_PLACEHOLDER, Invoice, TO_PLACEHOLDER, Template, Totals};

/// A4 at 72 dpi.
pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;

const MARGIN: f32 = 48.0;
const RIGHT_EDGE: f32 = PAGE_WIDTH - MARGIN;

/// Watermark compositing: behind all content, fixed low opacity, 70% of
/// the page box, aspect ratio preserved.
const WATERMARK_OPACITY: f32 = 0.05;
const WATERMARK_BOX_RATIO: f32 = 0.7;

const ROW_HEIGHT: f32 = 26.0;
const DESC_X: f32 = MARGIN + 8.0;
const QTY_X: f32 = 402.0;
const PRICE_X: f32 = 474.0;
const TOTAL_X: f32 = RIGHT_EDGE - 8.0;

const SLATE_50: &str = "#f8fafc";
const SLATE_100: &str = "#f1f5f9";
const SLATE_200: &str = "#e2e8f0";
const SLATE_300: &str = "#cbd5e1";
const SLATE_400: &str = "#94a3b8";
const SLATE_500: &str = "#64748b";
const SLATE_600: &str = "#475569";
const SLATE_700: &str = "#334155";
const SLATE_800: &str = "#1e293b";
const SLATE_900: &str = "#0f172a";
const EMERALD_500: &str = "#10b981";
const EMERALD_600: &str = "#059669";
const TEAL_50: &str = "#f0fdfa";
const TEAL_200: &str = "#99f6e4";
const TEAL_500: &str = "#14b8a6";
const TEAL_600: &str = "#0d9488";
const TEAL_700: &str = "#0f766e";
const TEAL_800: &str = "#115e59";
const TEAL_900: &str = "#134e4a";

/// Pure function from the invoice document and its derived totals to a
/// complete SVG page. Every template variant renders the same ledger rows
/// and the same totals; only the visual arrangement differs.
pub fn render_svg(invoice: &Invoice, totals: &Totals) -> String {
    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = PAGE_WIDTH,
        h = PAGE_HEIGHT
    ));
    push_rect(&mut svg, 0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT, "#ffffff", None);
    push_watermark(&mut svg, invoice);
    match invoice.template() {
        Template::Minimal => render_minimal(&mut svg, invoice, totals),
        Template::Corporate => render_corporate(&mut svg, invoice, totals),
        Template::Modern => render_modern(&mut svg, invoice, totals),
    }
    svg.push_str("</svg>");
    svg
}

fn render_minimal(svg: &mut String, invoice: &Invoice, totals: &Totals) {
    let logo_bottom = push_logo(svg, invoice, MARGIN, 40.0, 48.0);
    push_text(
        svg,
        MARGIN,
        logo_bottom + 30.0,
        28.0,
        SLATE_900,
        Some("bold"),
        None,
        "INVOICE",
    );
    push_text(
        svg,
        MARGIN,
        logo_bottom + 50.0,
        14.0,
        EMERALD_600,
        Some("bold"),
        None,
        &format!("#{}", invoice.display_number()),
    );
    push_text(
        svg,
        RIGHT_EDGE,
        logo_bottom + 14.0,
        8.0,
        SLATE_400,
        Some("bold"),
        Some("end"),
        "DATE ISSUED",
    );
    push_text(
        svg,
        RIGHT_EDGE,
        logo_bottom + 32.0,
        14.0,
        SLATE_700,
        None,
        Some("end"),
        &invoice.issue_date_text(),
    );
    push_line(svg, MARGIN, 170.0, RIGHT_EDGE, 170.0, EMERALD_500, 2.0);

    push_party_block(svg, invoice, 198.0, SLATE_400, SLATE_700, SLATE_800);

    let header_y = 288.0;
    push_rect(svg, MARGIN, header_y, RIGHT_EDGE - MARGIN, ROW_HEIGHT, SLATE_50, None);
    push_line(svg, MARGIN, header_y, RIGHT_EDGE, header_y, SLATE_200, 1.0);
    push_line(
        svg,
        MARGIN,
        header_y + ROW_HEIGHT,
        RIGHT_EDGE,
        header_y + ROW_HEIGHT,
        SLATE_200,
        1.0,
    );
    push_table_header(svg, header_y + 17.0, 9.0, SLATE_500, "DESCRIPTION");
    let rows_end = push_item_rows(svg, invoice, header_y + ROW_HEIGHT + 18.0);

    let box_x = RIGHT_EDGE - 208.0;
    let mut y = rows_end + 24.0;
    push_amount_row(svg, box_x, RIGHT_EDGE, y, 12.0, SLATE_500, None, "Subtotal", &money(invoice, totals.subtotal));
    y += 22.0;
    push_amount_row(svg, box_x, RIGHT_EDGE, y, 12.0, SLATE_500, None, "Tax", &money(invoice, totals.tax));
    y += 16.0;
    push_line(svg, box_x, y, RIGHT_EDGE, y, SLATE_100, 2.0);
    y += 26.0;
    push_amount_row(svg, box_x, RIGHT_EDGE, y, 19.0, EMERALD_600, Some("bold"), "Total", &money(invoice, totals.total));

    push_signature_block(svg, invoice, RIGHT_EDGE, y + 60.0);
}

fn render_corporate(svg: &mut String, invoice: &Invoice, totals: &Totals) {
    let band_h = 140.0;
    push_rect(svg, 0.0, 0.0, PAGE_WIDTH, band_h, SLATE_800, None);
    let logo_bottom = push_logo(svg, invoice, MARGIN, 26.0, 40.0);
    push_text(
        svg,
        MARGIN,
        logo_bottom + 32.0,
        26.0,
        "#ffffff",
        Some("bold"),
        None,
        "INVOICE",
    );
    push_text(svg, RIGHT_EDGE, 42.0, 8.0, SLATE_400, Some("bold"), Some("end"), "INVOICE NUMBER");
    push_text(
        svg,
        RIGHT_EDGE,
        64.0,
        17.0,
        "#ffffff",
        Some("bold"),
        Some("end"),
        &format!("#{}", invoice.display_number()),
    );
    push_text(svg, RIGHT_EDGE, 90.0, 8.0, SLATE_400, Some("bold"), Some("end"), "DATE");
    push_text(
        svg,
        RIGHT_EDGE,
        110.0,
        14.0,
        "#ffffff",
        None,
        Some("end"),
        &invoice.issue_date_text(),
    );

    push_party_block(svg, invoice, band_h + 42.0, SLATE_400, SLATE_700, SLATE_900);

    let header_y = 286.0;
    push_rect(svg, MARGIN, header_y, RIGHT_EDGE - MARGIN, ROW_HEIGHT, SLATE_100, None);
    push_table_header(svg, header_y + 17.0, 9.0, SLATE_600, "DESCRIPTION");
    let rows_end = push_item_rows(svg, invoice, header_y + ROW_HEIGHT + 18.0);

    let box_x = RIGHT_EDGE - 208.0;
    let mut y = rows_end + 24.0;
    push_amount_row(svg, box_x, RIGHT_EDGE, y, 12.0, SLATE_500, None, "Subtotal", &money(invoice, totals.subtotal));
    y += 22.0;
    push_amount_row(
        svg,
        box_x,
        RIGHT_EDGE,
        y,
        12.0,
        SLATE_500,
        None,
        &format!("Tax ({}%)", invoice.tax_rate()),
        &money(invoice, totals.tax),
    );
    y += 16.0;
    push_line(svg, box_x, y, RIGHT_EDGE, y, SLATE_200, 1.0);
    y += 26.0;
    push_amount_row(svg, box_x, RIGHT_EDGE, y, 19.0, SLATE_900, Some("bold"), "Total", &money(invoice, totals.total));

    push_signature_block(svg, invoice, RIGHT_EDGE, y + 60.0);
}

fn render_modern(svg: &mut String, invoice: &Invoice, totals: &Totals) {
    push_rect(svg, 0.0, 0.0, PAGE_WIDTH, 12.0, TEAL_500, None);
    let logo_bottom = push_logo(svg, invoice, MARGIN, 44.0, 48.0);
    push_text(
        svg,
        MARGIN,
        logo_bottom + 18.0,
        12.0,
        SLATE_400,
        Some("bold"),
        None,
        &format!("INVOICE #{}", invoice.display_number()),
    );
    push_text(svg, RIGHT_EDGE, 72.0, 28.0, TEAL_600, Some("bold"), Some("end"), "INVOICE");
    push_text(
        svg,
        RIGHT_EDGE,
        94.0,
        13.0,
        SLATE_500,
        None,
        Some("end"),
        &invoice.issue_date_text(),
    );

    let party_y = 182.0;
    push_rect(svg, MARGIN, party_y - 14.0, 4.0, 78.0, SLATE_200, None);
    push_rect(svg, 305.0, party_y - 14.0, 4.0, 78.0, TEAL_500, None);
    push_text(svg, MARGIN + 16.0, party_y, 8.0, TEAL_600, Some("bold"), None, "FROM");
    push_text_lines(
        svg,
        MARGIN + 16.0,
        party_y + 18.0,
        12.0,
        16.0,
        SLATE_700,
        None,
        None,
        &party_lines(invoice.from_party(), FROM_PLACEHOLDER),
    );
    push_text(svg, 321.0, party_y, 8.0, TEAL_600, Some("bold"), None, "BILL TO");
    push_text_lines(
        svg,
        321.0,
        party_y + 18.0,
        12.0,
        16.0,
        SLATE_900,
        Some("bold"),
        None,
        &party_lines(invoice.to_party(), TO_PLACEHOLDER),
    );

    let header_y = 296.0;
    push_table_header(svg, header_y, 10.0, TEAL_700, "ITEM");
    push_line(svg, MARGIN, header_y + 9.0, RIGHT_EDGE, header_y + 9.0, TEAL_500, 2.0);
    let rows_end = push_item_rows(svg, invoice, header_y + 9.0 + 18.0);

    let box_x = 305.0;
    let box_y = rows_end + 24.0;
    let box_w = RIGHT_EDGE - box_x;
    push_rect(svg, box_x, box_y, box_w, 112.0, TEAL_50, Some(12.0));
    let inner_left = box_x + 20.0;
    let inner_right = RIGHT_EDGE - 20.0;
    let mut y = box_y + 30.0;
    push_amount_row(svg, inner_left, inner_right, y, 12.0, TEAL_800, None, "Subtotal", &money(invoice, totals.subtotal));
    y += 22.0;
    push_amount_row(svg, inner_left, inner_right, y, 12.0, TEAL_800, None, "Tax", &money(invoice, totals.tax));
    y += 14.0;
    push_line(svg, inner_left, y, inner_right, y, TEAL_200, 1.0);
    y += 28.0;
    push_amount_row(svg, inner_left, inner_right, y, 19.0, TEAL_900, Some("bold"), "Total", &money(invoice, totals.total));

    push_signature_block(svg, invoice, RIGHT_EDGE, box_y + 112.0 + 48.0);
}

fn push_party_block(
    svg: &mut String,
    invoice: &Invoice,
    y: f32,
    label_fill: &str,
    from_fill: &str,
    to_fill: &str,
) {
    push_text(svg, MARGIN, y, 8.0, label_fill, Some("bold"), None, "FROM");
    push_text_lines(
        svg,
        MARGIN,
        y + 18.0,
        12.0,
        16.0,
        from_fill,
        None,
        None,
        &party_lines(invoice.from_party(), FROM_PLACEHOLDER),
    );
    push_text(svg, RIGHT_EDGE, y, 8.0, label_fill, Some("bold"), Some("end"), "BILL TO");
    push_text_lines(
        svg,
        RIGHT_EDGE,
        y + 18.0,
        12.0,
        16.0,
        to_fill,
        Some("bold"),
        Some("end"),
        &party_lines(invoice.to_party(), TO_PLACEHOLDER),
    );
}

fn push_table_header(svg: &mut String, y: f32, size: f32, fill: &str, desc_label: &str) {
    push_text(svg, DESC_X, y, size, fill, Some("bold"), None, desc_label);
    push_text(svg, QTY_X, y, size, fill, Some("bold"), Some("end"), "QTY");
    push_text(svg, PRICE_X, y, size, fill, Some("bold"), Some("end"), "PRICE");
    push_text(svg, TOTAL_X, y, size, fill, Some("bold"), Some("end"), "TOTAL");
}

/// Rows are identical across all template variants, in ledger order.
fn push_item_rows(svg: &mut String, invoice: &Invoice, start_y: f32) -> f32 {
    let currency = invoice.currency();
    let mut y = start_y;
    let count = invoice.items().len();
    for (index, item) in invoice.items().iter().enumerate() {
        let desc = if item.desc.trim().is_empty() {
            "Item"
        } else {
            item.desc.as_str()
        };
        push_text(svg, DESC_X, y, 11.0, SLATE_600, None, None, desc);
        push_text(svg, QTY_X, y, 11.0, SLATE_600, None, Some("end"), &format!("{}", item.qty));
        push_text(
            svg,
            PRICE_X,
            y,
            11.0,
            SLATE_600,
            None,
            Some("end"),
            &currency.format(item.price),
        );
        push_text(
            svg,
            TOTAL_X,
            y,
            11.0,
            SLATE_800,
            Some("bold"),
            Some("end"),
            &currency.format(item.line_total()),
        );
        if index + 1 < count {
            push_line(svg, MARGIN, y + 8.0, RIGHT_EDGE, y + 8.0, SLATE_100, 1.0);
        }
        y += ROW_HEIGHT;
    }
    y
}

fn push_signature_block(svg: &mut String, invoice: &Invoice, right_x: f32, y: f32) {
    if let Some(signature) = invoice.signature() {
        let h = 40.0;
        let w = (h * signature.aspect()).clamp(40.0, 160.0);
        push_image(svg, &signature.data_uri(), right_x - w, y, w, h, None);
        push_line(svg, right_x - w, y + h + 4.0, right_x, y + h + 4.0, SLATE_300, 1.0);
        push_text(
            svg,
            right_x - w / 2.0,
            y + h + 18.0,
            8.0,
            SLATE_400,
            Some("bold"),
            Some("middle"),
            "AUTHORIZED SIGNATURE",
        );
    } else {
        push_line(svg, right_x - 150.0, y, right_x, y, SLATE_300, 1.0);
        push_text(
            svg,
            right_x - 75.0,
            y + 16.0,
            8.0,
            SLATE_400,
            Some("bold"),
            Some("middle"),
            "AUTHORIZED SIGNATURE",
        );
    }
}

fn push_watermark(svg: &mut String, invoice: &Invoice) {
    if !invoice.use_watermark() {
        return;
    }
    // Without a logo the watermark layer renders nothing at all.
    let Some(logo) = invoice.logo() else {
        return;
    };
    let w = PAGE_WIDTH * WATERMARK_BOX_RATIO;
    let h = PAGE_HEIGHT * WATERMARK_BOX_RATIO;
    let x = (PAGE_WIDTH - w) / 2.0;
    let y = (PAGE_HEIGHT - h) / 2.0;
    push_image(svg, &logo.data_uri(), x, y, w, h, Some(WATERMARK_OPACITY));
}

fn push_logo(svg: &mut String, invoice: &Invoice, x: f32, y: f32, h: f32) -> f32 {
    match invoice.logo() {
        Some(logo) => {
            let w = (h * logo.aspect()).clamp(h * 0.25, 160.0);
            push_image(svg, &logo.data_uri(), x, y, w, h, None);
            y + h + 12.0
        }
        None => y + 12.0,
    }
}

fn party_lines(text: &str, placeholder: &str) -> Vec<String> {
    if text.trim().is_empty() {
        vec![placeholder.to_string()]
    } else {
        text.lines().map(|line| line.to_string()).collect()
    }
}

fn money(invoice: &Invoice, value: f64) -> String {
    invoice.currency().format(value)
}

fn push_amount_row(
    svg: &mut String,
    left_x: f32,
    right_x: f32,
    y: f32,
    size: f32,
    fill: &str,
    weight: Option<&str>,
    label: &str,
    amount: &str,
) {
    push_text(svg, left_x, y, size, fill, weight, None, label);
    push_text(svg, right_x, y, size, fill, weight, Some("end"), amount);
}

fn push_text(
    svg: &mut String,
    x: f32,
    y: f32,
    size: f32,
    fill: &str,
    weight: Option<&str>,
    anchor: Option<&str>,
    content: &str,
) {
    svg.push_str(&format!(
        r#"<text x="{x}" y="{y}" font-size="{size}" fill="{fill}""#
    ));
    if let Some(weight) = weight {
        svg.push_str(&format!(r#" font-weight="{weight}""#));
    }
    if let Some(anchor) = anchor {
        svg.push_str(&format!(r#" text-anchor="{anchor}""#));
    }
    svg.push_str(&format!(">{}</text>", escape_xml(content)));
}

fn push_text_lines(
    svg: &mut String,
    x: f32,
    y: f32,
    size: f32,
    line_h: f32,
    fill: &str,
    weight: Option<&str>,
    anchor: Option<&str>,
    lines: &[String],
) {
    for (index, line) in lines.iter().enumerate() {
        push_text(svg, x, y + index as f32 * line_h, size, fill, weight, anchor, line);
    }
}

fn push_rect(svg: &mut String, x: f32, y: f32, w: f32, h: f32, fill: &str, rx: Option<f32>) {
    svg.push_str(&format!(
        r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="{fill}""#
    ));
    if let Some(rx) = rx {
        svg.push_str(&format!(r#" rx="{rx}""#));
    }
    svg.push_str("/>");
}

fn push_line(svg: &mut String, x1: f32, y1: f32, x2: f32, y2: f32, stroke: &str, width: f32) {
    svg.push_str(&format!(
        r#"<line x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}" stroke="{stroke}" stroke-width="{width}"/>"#
    ));
}

fn push_image(svg: &mut String, uri: &str, x: f32, y: f32, w: f32, h: f32, opacity: Option<f32>) {
    svg.push_str(&format!(
        r#"<image href="{uri}" xlink:href="{uri}" x="{x}" y="{y}" width="{w}" height="{h}" preserveAspectRatio="xMidYMid meet""#
    ));
    if let Some(opacity) = opacity {
        svg.push_str(&format!(r#" opacity="{opacity}""#));
    }
    svg.push_str("/>");
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
