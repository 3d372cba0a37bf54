//! Output formatting shared by `process` and `batch`.

use recibo_core::{ExtractedRecord, Extraction};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub const RECORD_COLUMNS: [&str; 7] = [
    "emitter",
    "recipient",
    "amount",
    "currency",
    "date",
    "operation_id",
    "provenance",
];

/// Record fields as CSV cells, in [`RECORD_COLUMNS`] order.
pub fn record_cells(record: &ExtractedRecord) -> [String; 7] {
    [
        record.emitter.clone().unwrap_or_default(),
        record.recipient.clone().unwrap_or_default(),
        record.amount.map(|a| a.normalize().to_string()).unwrap_or_default(),
        record.currency.map(|c| c.to_string()).unwrap_or_default(),
        record.date.map(|d| d.to_string()).unwrap_or_default(),
        record.operation_id.clone().unwrap_or_default(),
        record.provenance.to_string(),
    ]
}

pub fn format_extraction(extraction: &Extraction, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => format_json(extraction),
        OutputFormat::Csv => format_csv(&extraction.record),
        OutputFormat::Text => Ok(format_text(extraction)),
    }
}

fn format_json(extraction: &Extraction) -> anyhow::Result<String> {
    let mut value = extraction.record.summary_json();
    if let Some(object) = value.as_object_mut() {
        object.insert(
            "fingerprint".to_string(),
            serde_json::Value::String(extraction.fingerprint.to_string()),
        );
        object.insert(
            "raw_text".to_string(),
            serde_json::Value::String(extraction.record.raw_text.clone()),
        );
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

fn format_csv(record: &ExtractedRecord) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(RECORD_COLUMNS)?;
    wtr.write_record(record_cells(record))?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(extraction: &Extraction) -> String {
    let record = &extraction.record;
    let or_dash = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());

    let mut output = String::new();

    output.push_str(&format!("From:         {}\n", or_dash(record.emitter.clone())));
    output.push_str(&format!("To:           {}\n", or_dash(record.recipient.clone())));

    let amount = match (record.amount, record.currency) {
        (Some(amount), Some(currency)) => format!("{} {}", amount.normalize(), currency),
        (Some(amount), None) => amount.normalize().to_string(),
        (None, Some(currency)) => format!("- {}", currency),
        (None, None) => "-".to_string(),
    };
    output.push_str(&format!("Amount:       {}\n", amount));
    output.push_str(&format!("Date:         {}\n", or_dash(record.date.map(|d| d.to_string()))));
    output.push_str(&format!("Operation ID: {}\n", or_dash(record.operation_id.clone())));
    output.push('\n');
    output.push_str(&format!("Source:       {} (assist {})\n", record.provenance, extraction.assist));
    output.push_str(&format!("Fingerprint:  {}\n", extraction.fingerprint));

    output
}
