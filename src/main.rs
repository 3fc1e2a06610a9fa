use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::Parser;

use invoice_studio::model::AssetKind;
use invoice_studio::settings::Settings;
use invoice_studio::{Invoice, ItemField, Template, Totals, export, settings};

#[derive(Parser, Debug)]
#[command(
    name = "invoice-studio",
    version,
    about = "Compose invoices and export them as PDF or JSON"
)]
struct Cli {
    /// Invoice JSON file to load
    #[arg(short = 'l', long = "load")]
    load: Option<PathBuf>,

    /// Export the invoice as a one-page A4 PDF
    #[arg(short = 'p', long = "pdf")]
    pdf: bool,

    /// Export the invoice data as JSON
    #[arg(short = 's', long = "save")]
    save: bool,

    /// Output directory for exported files
    #[arg(short = 'o', long = "out")]
    out: Option<PathBuf>,

    /// Template override (minimal, corporate, modern)
    #[arg(short = 't', long = "template")]
    template: Option<Template>,

    /// Watermark override (true/false)
    #[arg(short = 'w', long = "watermark")]
    watermark: Option<bool>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,

    /// Interactive editing session (default when no export flag is given)
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    invoice_studio::logging::init(cli.verbose)?;
    if cli.interactive || (!cli.pdf && !cli.save) {
        return run_interactive(cli);
    }

    let output = invoice_studio::run(invoice_studio::Config {
        load: cli.load,
        pdf: cli.pdf,
        save: cli.save,
        out_dir: cli.out,
        template: cli.template,
        watermark: cli.watermark,
        settings_path: cli.read_settings,
    })?;

    println!("{}", output);
    Ok(())
}

struct Session {
    invoice: Invoice,
    settings: Settings,
    out_dir: PathBuf,
}

impl Session {
    fn new(cli: &Cli) -> Result<Self> {
        let settings = settings::load_settings(cli.read_settings.as_deref())?;
        let mut invoice = match cli.load.as_deref() {
            Some(path) => export::load_invoice(path)?,
            None => invoice_studio::new_invoice(&settings),
        };
        if let Some(template) = cli.template {
            invoice.set_template(template);
        }
        if let Some(enabled) = cli.watermark {
            invoice.set_watermark(enabled);
        }
        let out_dir = cli.out.clone().unwrap_or_else(|| settings.output_dir.clone());
        Ok(Self {
            invoice,
            settings,
            out_dir,
        })
    }
}

fn run_interactive(cli: Cli) -> Result<()> {
    use std::io::Write;

    let mut session = Session::new(&cli)?;
    println!("Interactive mode. Use /quit or /exit to finish.");
    println!("Type /help to see available commands.");
    print_summary(&session.invoice);

    let mut line = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();
    loop {
        line.clear();
        print!("> ");
        io::stdout().flush()?;
        if stdin_lock.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if !input.starts_with('/') {
            eprintln!("commands start with '/' (try /help)");
            continue;
        }
        match handle_command(input, &mut session) {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => eprintln!("error: {:#}", err),
        }
    }
    Ok(())
}

fn handle_command(input: &str, session: &mut Session) -> Result<bool> {
    let trimmed = input.trim();
    if matches!(trimmed, "/quit" | "/exit") {
        return Ok(true);
    }
    if trimmed == "/help" {
        print_interactive_help();
        return Ok(false);
    }
    if trimmed == "/show" {
        print_summary(&session.invoice);
        return Ok(false);
    }
    if trimmed == "/totals" {
        print_totals(&session.invoice, &session.invoice.totals());
        return Ok(false);
    }
    if trimmed == "/add" {
        let totals = session.invoice.add_item();
        println!("item {} added", session.invoice.items().len());
        print_totals(&session.invoice, &totals);
        return Ok(false);
    }

    if let Some(arg) = command_arg(trimmed, "/num") {
        let value = arg.trim();
        if value.is_empty() {
            println!("num: {}", session.invoice.display_number());
        } else {
            let totals = session.invoice.set_number(value);
            println!("num set to {}", value);
            print_totals(&session.invoice, &totals);
        }
        return Ok(false);
    }
    if let Some(arg) = command_arg(trimmed, "/date") {
        let value = arg.trim();
        if value.is_empty() {
            println!("date: {}", session.invoice.issue_date_text());
        } else {
            let totals = session.invoice.set_issue_date(value)?;
            println!("date set to {}", session.invoice.issue_date_text());
            print_totals(&session.invoice, &totals);
        }
        return Ok(false);
    }
    if let Some(arg) = command_arg(trimmed, "/from") {
        let value = arg.trim();
        if value.is_empty() {
            println!("from: {}", first_line(session.invoice.from_party()));
        } else {
            let totals = session.invoice.set_from_party(&unescape_lines(value));
            println!("from set");
            print_totals(&session.invoice, &totals);
        }
        return Ok(false);
    }
    if let Some(arg) = command_arg(trimmed, "/tax") {
        let value = arg.trim();
        if value.is_empty() {
            println!("tax: {}%", session.invoice.tax_rate());
        } else {
            let totals = session.invoice.set_tax_rate(value);
            println!("tax set to {}%", session.invoice.tax_rate());
            print_totals(&session.invoice, &totals);
        }
        return Ok(false);
    }
    if let Some(arg) = command_arg(trimmed, "/template") {
        let value = arg.trim();
        if value.is_empty() {
            println!("template: {}", session.invoice.template());
        } else {
            let totals = session.invoice.set_template(value.parse()?);
            println!("template set to {}", session.invoice.template());
            print_totals(&session.invoice, &totals);
        }
        return Ok(false);
    }
    if let Some(arg) = command_arg(trimmed, "/to") {
        let value = arg.trim();
        if value.is_empty() {
            println!("to: {}", first_line(session.invoice.to_party()));
        } else {
            let totals = session.invoice.set_to_party(&unescape_lines(value));
            println!("to set");
            print_totals(&session.invoice, &totals);
        }
        return Ok(false);
    }
    if let Some(arg) = command_arg(trimmed, "/currency") {
        let value = arg.trim();
        if value.is_empty() {
            println!("currency: {}", session.invoice.currency().symbol());
        } else {
            let totals = session.invoice.set_currency(value.parse()?);
            println!("currency set to {}", session.invoice.currency().symbol());
            print_totals(&session.invoice, &totals);
        }
        return Ok(false);
    }
    if let Some(arg) = command_arg(trimmed, "/watermark") {
        let enabled = parse_toggle(arg, session.invoice.use_watermark())?;
        let totals = session.invoice.set_watermark(enabled);
        println!("watermark: {}", enabled);
        if enabled && session.invoice.logo().is_none() {
            println!("note: the watermark only renders once a logo is set");
        }
        print_totals(&session.invoice, &totals);
        return Ok(false);
    }
    if let Some(arg) = command_arg(trimmed, "/logo") {
        return handle_asset_command(session, AssetKind::Logo, "logo", arg);
    }
    if let Some(arg) = command_arg(trimmed, "/signature") {
        return handle_asset_command(session, AssetKind::Signature, "signature", arg);
    }
    if let Some(arg) = command_arg(trimmed, "/remove") {
        let count = session.invoice.items().len();
        let index = parse_item_index(arg.trim(), count)?;
        let totals = session.invoice.remove_item(index);
        if count == 1 {
            println!("the last item stays; edit it with /item instead");
        } else {
            println!("item {} removed", index + 1);
        }
        print_totals(&session.invoice, &totals);
        return Ok(false);
    }
    if let Some(arg) = command_arg(trimmed, "/item") {
        let mut parts = arg.trim().splitn(3, char::is_whitespace);
        let index = parts
            .next()
            .filter(|part| !part.is_empty())
            .ok_or_else(|| anyhow!("usage: /item <n> <desc|qty|price> <value>"))?;
        let field = parts
            .next()
            .ok_or_else(|| anyhow!("usage: /item <n> <desc|qty|price> <value>"))?;
        let value = parts.next().unwrap_or("").trim();
        let index = parse_item_index(index, session.invoice.items().len())?;
        let field: ItemField = field.parse()?;
        let totals = session.invoice.update_item(index, field, value)?;
        println!("item {} updated", index + 1);
        print_totals(&session.invoice, &totals);
        return Ok(false);
    }
    if let Some(arg) = command_arg(trimmed, "/save") {
        let dir = parse_out_dir(arg, &session.out_dir);
        let path = export::export_json(&session.invoice, &dir)?;
        println!("wrote {}", path.display());
        return Ok(false);
    }
    if let Some(arg) = command_arg(trimmed, "/load") {
        let value = arg.trim();
        if value.is_empty() {
            return Err(anyhow!("usage: /load <file.json>"));
        }
        session.invoice = export::load_invoice(Path::new(value))?;
        println!("loaded {}", value);
        print_summary(&session.invoice);
        return Ok(false);
    }
    if let Some(arg) = command_arg(trimmed, "/pdf") {
        let dir = parse_out_dir(arg, &session.out_dir);
        let path = export::export_pdf(&session.invoice, &session.settings, &dir)?;
        println!("wrote {}", path.display());
        return Ok(false);
    }

    eprintln!("unknown command: {}", trimmed);
    Ok(false)
}

fn handle_asset_command(
    session: &mut Session,
    kind: AssetKind,
    label: &str,
    arg: &str,
) -> Result<bool> {
    let value = arg.trim();
    let current = match kind {
        AssetKind::Logo => session.invoice.logo(),
        AssetKind::Signature => session.invoice.signature(),
    };
    if value.is_empty() {
        match current {
            Some(asset) => println!(
                "{}: {} {}x{}",
                label,
                asset.mime(),
                asset.width(),
                asset.height()
            ),
            None => println!("{}: (none)", label),
        }
    } else if value == "clear" {
        let totals = session.invoice.set_asset(kind, None);
        println!("{} cleared", label);
        print_totals(&session.invoice, &totals);
    } else {
        let asset = invoice_studio::ImageAsset::load(Path::new(value))?;
        println!(
            "{} set ({} {}x{})",
            label,
            asset.mime(),
            asset.width(),
            asset.height()
        );
        let totals = session.invoice.set_asset(kind, Some(asset));
        print_totals(&session.invoice, &totals);
    }
    Ok(false)
}

/// Matches a whole command word: the name must be followed by whitespace
/// or end-of-input, so `/totals x` cannot fall through to `/to`.
fn command_arg<'a>(input: &'a str, name: &str) -> Option<&'a str> {
    let rest = input.strip_prefix(name)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

fn parse_toggle(arg: &str, current: bool) -> Result<bool> {
    let value = arg.trim();
    if value.is_empty() {
        return Ok(!current);
    }
    match value.to_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(anyhow!("expected on/off/true/false/1/0")),
    }
}

fn parse_item_index(value: &str, count: usize) -> Result<usize> {
    let number: usize = value
        .parse()
        .map_err(|_| anyhow!("expected an item number (1-{})", count))?;
    if number == 0 || number > count {
        return Err(anyhow!("item {} does not exist (1-{})", number, count));
    }
    Ok(number - 1)
}

fn parse_out_dir(arg: &str, default: &Path) -> PathBuf {
    let value = arg.trim();
    if value.is_empty() {
        default.to_path_buf()
    } else {
        PathBuf::from(value)
    }
}

fn unescape_lines(value: &str) -> String {
    value.replace("\\n", "\n")
}

fn first_line(value: &str) -> &str {
    if value.trim().is_empty() {
        "(empty)"
    } else {
        value.lines().next().unwrap_or(value)
    }
}

fn print_summary(invoice: &Invoice) {
    println!(
        "invoice {} ({}) {} template, watermark {}",
        invoice.display_number(),
        invoice.issue_date_text(),
        invoice.template(),
        if invoice.use_watermark() { "on" } else { "off" }
    );
    println!("from: {}", first_line(invoice.from_party()));
    println!("to:   {}", first_line(invoice.to_party()));
    let currency = invoice.currency();
    for (index, item) in invoice.items().iter().enumerate() {
        let desc = if item.desc.trim().is_empty() {
            "Item"
        } else {
            item.desc.as_str()
        };
        println!(
            "  {}. {} x{} @ {} = {}",
            index + 1,
            desc,
            item.qty,
            currency.format(item.price),
            currency.format(item.line_total())
        );
    }
    print_totals(invoice, &invoice.totals());
}

fn print_totals(invoice: &Invoice, totals: &Totals) {
    let currency = invoice.currency();
    println!(
        "subtotal {}  tax {}  total {}",
        currency.format(totals.subtotal),
        currency.format(totals.tax),
        currency.format(totals.total)
    );
}

fn print_interactive_help() {
    println!("Commands:");
    println!("  /quit, /exit              Exit interactive mode");
    println!("  /show                     Show the whole invoice");
    println!("  /totals                   Show derived totals");
    println!("  /num <text>               Set invoice number (or show current)");
    println!("  /date <YYYY-MM-DD>        Set issue date");
    println!("  /from <text>              Set sender (use \\n for new lines)");
    println!("  /to <text>                Set recipient (use \\n for new lines)");
    println!("  /tax <percent>            Set tax rate");
    println!("  /currency <symbol|code>   Set currency ($, €, £, ৳, ₹)");
    println!("  /template <name>          Set template (minimal, corporate, modern)");
    println!("  /watermark [on|off]       Toggle the logo watermark");
    println!("  /logo <path|clear>        Set or clear the logo image");
    println!("  /signature <path|clear>   Set or clear the signature image");
    println!("  /add                      Append a blank line item");
    println!("  /remove <n>               Remove line item n");
    println!("  /item <n> <field> <value> Update desc/qty/price of item n");
    println!("  /save [dir]               Export invoice data as JSON");
    println!("  /load <file.json>         Replace the invoice from a JSON file");
    println!("  /pdf [dir]                Export the invoice as an A4 PDF");
    println!("  /help                     Show this help");
}
