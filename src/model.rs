use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::assets::ImageAsset;

pub const DEFAULT_NUMBER: &str = "Inv-001";
pub const FROM_PLACEHOLDER: &str = "Your Name";
pub const TO_PLACEHOLDER: &str = "Client Name";

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "$")]
    Usd,
    #[serde(rename = "€")]
    Eur,
    #[serde(rename = "£")]
    Gbp,
    #[serde(rename = "৳")]
    Bdt,
    #[serde(rename = "₹")]
    Inr,
}

impl Currency {
    pub const ALL: [Currency; 5] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Bdt,
        Currency::Inr,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
            Currency::Bdt => "৳",
            Currency::Inr => "₹",
        }
    }

    /// Two decimal places regardless of symbol.
    pub fn format(self, value: f64) -> String {
        format!("{}{:.2}", self.symbol(), value)
    }
}

impl FromStr for Currency {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "$" | "usd" | "USD" => Ok(Currency::Usd),
            "€" | "eur" | "EUR" => Ok(Currency::Eur),
            "£" | "gbp" | "GBP" => Ok(Currency::Gbp),
            "৳" | "bdt" | "BDT" => Ok(Currency::Bdt),
            "₹" | "inr" | "INR" => Ok(Currency::Inr),
            other => Err(anyhow!(
                "unknown currency '{}' (expected $, €, £, ৳ or ₹)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Minimal,
    Corporate,
    Modern,
}

impl Template {
    pub const ALL: [Template; 3] = [Template::Minimal, Template::Corporate, Template::Modern];

    pub fn as_str(self) -> &'static str {
        match self {
            Template::Minimal => "minimal",
            Template::Corporate => "corporate",
            Template::Modern => "modern",
        }
    }
}

impl FromStr for Template {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "minimal" => Ok(Template::Minimal),
            "corporate" => Ok(Template::Corporate),
            "modern" => Ok(Template::Modern),
            other => Err(anyhow!(
                "unknown template '{}' (expected minimal, corporate or modern)",
                other
            )),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Logo,
    Signature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Desc,
    Qty,
    Price,
}

impl FromStr for ItemField {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "desc" => Ok(ItemField::Desc),
            "qty" => Ok(ItemField::Qty),
            "price" => Ok(ItemField::Price),
            other => Err(anyhow!(
                "unknown item field '{}' (expected desc, qty or price)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub desc: String,
    #[serde(default = "default_qty")]
    pub qty: f64,
    #[serde(default)]
    pub price: f64,
}

impl LineItem {
    pub fn new(desc: &str, qty: f64, price: f64) -> Self {
        Self {
            desc: desc.to_string(),
            qty,
            price,
        }
    }

    fn blank() -> Self {
        Self {
            desc: String::new(),
            qty: 1.0,
            price: 0.0,
        }
    }

    pub fn line_total(&self) -> f64 {
        self.qty * self.price
    }
}

fn default_qty() -> f64 {
    1.0
}

/// Derived from the ledger and tax rate on every call, never cached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

/// The single editing-session model. Field names on the wire mirror the
/// portable invoice-data format: export then import reproduces an
/// equivalent model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "num", default)]
    number: String,
    #[serde(rename = "date", with = "iso_date", default = "today")]
    issue_date: Date,
    #[serde(rename = "from", default)]
    from_party: String,
    #[serde(rename = "to", default)]
    to_party: String,
    #[serde(default)]
    items: Vec<LineItem>,
    #[serde(rename = "tax", deserialize_with = "lenient_rate", default)]
    tax_rate: f64,
    #[serde(default)]
    currency: Currency,
    #[serde(default)]
    logo: Option<ImageAsset>,
    #[serde(default)]
    signature: Option<ImageAsset>,
    #[serde(default)]
    template: Template,
    #[serde(rename = "useWatermark", default)]
    use_watermark: bool,
}

impl Default for Invoice {
    fn default() -> Self {
        Self::new()
    }
}

impl Invoice {
    pub fn new() -> Self {
        Self {
            number: String::new(),
            issue_date: today(),
            from_party: String::new(),
            to_party: String::new(),
            items: vec![LineItem::new("Web Development Services", 1.0, 500.0)],
            tax_rate: 0.0,
            currency: Currency::default(),
            logo: None,
            signature: None,
            template: Template::default(),
            use_watermark: false,
        }
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    /// Invoice number as rendered on the document.
    pub fn display_number(&self) -> &str {
        if self.number.trim().is_empty() {
            DEFAULT_NUMBER
        } else {
            &self.number
        }
    }

    /// Invoice number as used in exported file names.
    pub fn export_label(&self) -> &str {
        if self.number.trim().is_empty() {
            "Draft"
        } else {
            &self.number
        }
    }

    pub fn issue_date(&self) -> Date {
        self.issue_date
    }

    pub fn issue_date_text(&self) -> String {
        self.issue_date
            .format(ISO_DATE)
            .unwrap_or_else(|_| self.issue_date.to_string())
    }

    pub fn from_party(&self) -> &str {
        &self.from_party
    }

    pub fn to_party(&self) -> &str {
        &self.to_party
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn tax_rate(&self) -> f64 {
        self.tax_rate
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn template(&self) -> Template {
        self.template
    }

    pub fn logo(&self) -> Option<&ImageAsset> {
        self.logo.as_ref()
    }

    pub fn signature(&self) -> Option<&ImageAsset> {
        self.signature.as_ref()
    }

    pub fn use_watermark(&self) -> bool {
        self.use_watermark
    }

    pub fn totals(&self) -> Totals {
        let subtotal: f64 = self.items.iter().map(LineItem::line_total).sum();
        let tax = subtotal * (self.tax_rate / 100.0);
        Totals {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }

    pub fn set_number(&mut self, value: &str) -> Totals {
        self.number = value.trim().to_string();
        self.totals()
    }

    pub fn set_issue_date(&mut self, value: &str) -> Result<Totals> {
        self.issue_date = Date::parse(value.trim(), ISO_DATE)
            .map_err(|_| anyhow!("invalid date '{}' (expected YYYY-MM-DD)", value.trim()))?;
        Ok(self.totals())
    }

    pub fn set_from_party(&mut self, value: &str) -> Totals {
        self.from_party = value.to_string();
        self.totals()
    }

    pub fn set_to_party(&mut self, value: &str) -> Totals {
        self.to_party = value.to_string();
        self.totals()
    }

    /// Non-numeric input normalizes to 0 rather than erroring. Inherited
    /// quirk of the original editor; a stricter validation mode would
    /// reject instead.
    pub fn set_tax_rate(&mut self, value: &str) -> Totals {
        self.tax_rate = coerce_number(value);
        self.totals()
    }

    pub fn set_currency(&mut self, currency: Currency) -> Totals {
        self.currency = currency;
        self.totals()
    }

    pub fn set_template(&mut self, template: Template) -> Totals {
        self.template = template;
        self.totals()
    }

    pub fn set_watermark(&mut self, enabled: bool) -> Totals {
        self.use_watermark = enabled;
        self.totals()
    }

    pub fn set_asset(&mut self, kind: AssetKind, asset: Option<ImageAsset>) -> Totals {
        match kind {
            AssetKind::Logo => self.logo = asset,
            AssetKind::Signature => self.signature = asset,
        }
        self.totals()
    }

    pub fn add_item(&mut self) -> Totals {
        self.items.push(LineItem::blank());
        self.totals()
    }

    /// No-op when the index is out of range or removal would empty the
    /// ledger.
    pub fn remove_item(&mut self, index: usize) -> Totals {
        if index < self.items.len() && self.items.len() > 1 {
            self.items.remove(index);
        }
        self.totals()
    }

    pub fn update_item(&mut self, index: usize, field: ItemField, value: &str) -> Result<Totals> {
        let item = self
            .items
            .get_mut(index)
            .ok_or_else(|| anyhow!("no line item at index {}", index))?;
        match field {
            ItemField::Desc => item.desc = value.to_string(),
            ItemField::Qty => item.qty = coerce_number(value),
            ItemField::Price => item.price = coerce_number(value),
        }
        Ok(self.totals())
    }

    /// Restores the ledger invariants after deserialization: at least one
    /// item, no negative quantities or prices.
    pub fn normalize(&mut self) {
        if self.items.is_empty() {
            self.items.push(LineItem::blank());
        }
        for item in &mut self.items {
            item.qty = item.qty.max(0.0);
            item.price = item.price.max(0.0);
        }
        self.tax_rate = self.tax_rate.max(0.0);
    }
}

fn coerce_number(value: &str) -> f64 {
    value.trim().parse::<f64>().unwrap_or(0.0).max(0.0)
}

fn today() -> Date {
    time::OffsetDateTime::now_utc().date()
}

mod iso_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let text = date
            .format(super::ISO_DATE)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Ok(super::today());
        }
        Date::parse(raw.trim(), super::ISO_DATE).map_err(serde::de::Error::custom)
    }
}

/// The original editor exported the tax field as the raw input string, so
/// imports accept either a number or a numeric string.
fn lenient_rate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Number(value) => value,
        Raw::Text(text) => text.trim().parse().unwrap_or(0.0),
    };
    Ok(value.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_seeds_one_item() {
        let invoice = Invoice::new();
        assert_eq!(invoice.items().len(), 1);
        assert_eq!(invoice.items()[0].desc, "Web Development Services");
        assert_eq!(invoice.items()[0].qty, 1.0);
        assert_eq!(invoice.items()[0].price, 500.0);
    }

    #[test]
    fn ledger_never_drops_below_one_item() {
        let mut invoice = Invoice::new();
        invoice.remove_item(0);
        assert_eq!(invoice.items().len(), 1);

        invoice.add_item();
        invoice.add_item();
        assert_eq!(invoice.items().len(), 3);
        invoice.remove_item(2);
        invoice.remove_item(0);
        assert_eq!(invoice.items().len(), 1);
        invoice.remove_item(0);
        assert_eq!(invoice.items().len(), 1);
    }

    #[test]
    fn remove_out_of_range_is_noop() {
        let mut invoice = Invoice::new();
        invoice.add_item();
        invoice.remove_item(7);
        assert_eq!(invoice.items().len(), 2);
    }

    #[test]
    fn add_appends_blank_item_at_end() {
        let mut invoice = Invoice::new();
        invoice.add_item();
        let last = invoice.items().last().unwrap();
        assert_eq!(last.desc, "");
        assert_eq!(last.qty, 1.0);
        assert_eq!(last.price, 0.0);
    }

    #[test]
    fn non_numeric_input_coerces_to_zero() {
        let mut invoice = Invoice::new();
        invoice.update_item(0, ItemField::Qty, "abc").unwrap();
        assert_eq!(invoice.items()[0].qty, 0.0);
        invoice.update_item(0, ItemField::Price, "").unwrap();
        assert_eq!(invoice.items()[0].price, 0.0);
        invoice.set_tax_rate("ten percent");
        assert_eq!(invoice.tax_rate(), 0.0);
    }

    #[test]
    fn negative_numeric_input_clamps_to_zero() {
        let mut invoice = Invoice::new();
        invoice.update_item(0, ItemField::Qty, "-4").unwrap();
        assert_eq!(invoice.items()[0].qty, 0.0);
        invoice.set_tax_rate("-10");
        assert_eq!(invoice.tax_rate(), 0.0);
    }

    #[test]
    fn update_out_of_range_errors() {
        let mut invoice = Invoice::new();
        assert!(invoice.update_item(5, ItemField::Desc, "x").is_err());
    }

    #[test]
    fn totals_follow_every_mutation() {
        let mut invoice = Invoice::new();
        invoice.update_item(0, ItemField::Desc, "Design").unwrap();
        invoice.update_item(0, ItemField::Qty, "2").unwrap();
        invoice.update_item(0, ItemField::Price, "150").unwrap();
        invoice.add_item();
        invoice.update_item(1, ItemField::Desc, "Hosting").unwrap();
        invoice.update_item(1, ItemField::Price, "20").unwrap();
        let totals = invoice.set_tax_rate("10");
        assert_eq!(totals.subtotal, 320.0);
        assert_eq!(totals.tax, 32.0);
        assert_eq!(totals.total, 352.0);
        assert_eq!(invoice.currency().format(totals.total), "$352.00");
    }

    #[test]
    fn template_switch_preserves_ledger_and_totals() {
        let mut invoice = Invoice::new();
        invoice.set_tax_rate("7.5");
        let before = invoice.totals();
        let items_before = invoice.items().to_vec();
        for template in Template::ALL {
            invoice.set_template(template);
            assert_eq!(invoice.totals(), before);
            assert_eq!(invoice.items(), items_before.as_slice());
        }
    }

    #[test]
    fn display_number_falls_back_to_default() {
        let mut invoice = Invoice::new();
        assert_eq!(invoice.display_number(), DEFAULT_NUMBER);
        assert_eq!(invoice.export_label(), "Draft");
        invoice.set_number("2024-17");
        assert_eq!(invoice.display_number(), "2024-17");
        assert_eq!(invoice.export_label(), "2024-17");
    }

    #[test]
    fn issue_date_parses_iso_only() {
        let mut invoice = Invoice::new();
        invoice.set_issue_date("2025-03-01").unwrap();
        assert_eq!(invoice.issue_date_text(), "2025-03-01");
        assert!(invoice.set_issue_date("03/01/2025").is_err());
        assert_eq!(invoice.issue_date_text(), "2025-03-01");
    }

    #[test]
    fn normalize_restores_minimum_ledger() {
        let mut invoice = Invoice::new();
        invoice.items.clear();
        invoice.normalize();
        assert_eq!(invoice.items().len(), 1);
    }

    #[test]
    fn currency_parses_symbols_and_codes() {
        assert_eq!("€".parse::<Currency>().unwrap(), Currency::Eur);
        assert_eq!("inr".parse::<Currency>().unwrap(), Currency::Inr);
        assert!("¥".parse::<Currency>().is_err());
    }
}
