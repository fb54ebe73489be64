//! Dataset writers
//!
//! Two formats are supported:
//! - ARFF, with one `@attribute` line per schema field in schema order
//! - JSON lines, one object per row keyed by field name in schema order

use crate::error::OutputError;
use contackgen_schema::{Dataset, Domain, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Missing-value marker understood by ARFF consumers
const ARFF_MISSING: &str = "?";

/// Serialized dataset format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Weka attribute-relation file
    #[default]
    Arff,
    /// One JSON object per row
    #[serde(alias = "json-lines", alias = "jsonlines")]
    Jsonl,
}

impl FromStr for OutputFormat {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "arff" => Ok(Self::Arff),
            "jsonl" | "json-lines" | "jsonlines" => Ok(Self::Jsonl),
            other => Err(OutputError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Arff => "arff",
            Self::Jsonl => "jsonl",
        })
    }
}

fn arff_type(domain: Domain) -> &'static str {
    match domain {
        Domain::Integer => "numeric",
        Domain::CategoricalString => "string",
    }
}

fn arff_quote(text: &str) -> String {
    if text == ARFF_MISSING {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Write a dataset as ARFF
///
/// # Errors
/// `OutputError::Io` if the writer fails.
pub fn write_arff<W: Write>(
    dataset: &Dataset,
    relation: &str,
    mut out: W,
) -> Result<(), OutputError> {
    writeln!(out, "@relation {}", arff_quote(relation))?;
    writeln!(out)?;
    for field in dataset.schema().fields() {
        writeln!(out, "@attribute {} {}", field.name(), arff_type(field.domain()))?;
    }
    writeln!(out)?;
    writeln!(out, "@data")?;

    for row in dataset {
        let line = row
            .values()
            .iter()
            .map(|value| match value {
                Value::Integer(n) => n.to_string(),
                Value::Categorical(s) => arff_quote(s),
            })
            .collect::<Vec<_>>()
            .join(",");
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

/// Write a dataset as JSON lines
///
/// # Errors
/// `OutputError::Io` or `OutputError::Json` if writing fails.
pub fn write_json_lines<W: Write>(dataset: &Dataset, mut out: W) -> Result<(), OutputError> {
    let names: Vec<&str> = dataset.schema().names().collect();
    for row in dataset {
        let object: IndexMap<&str, &Value> = names.iter().copied().zip(row.values()).collect();
        serde_json::to_writer(&mut out, &object)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Write a dataset in the requested format
///
/// # Errors
/// See [`write_arff`] and [`write_json_lines`].
pub fn write_dataset<W: Write>(
    dataset: &Dataset,
    format: OutputFormat,
    relation: &str,
    out: W,
) -> Result<(), OutputError> {
    tracing::debug!(%format, rows = dataset.len(), "writing dataset");
    match format {
        OutputFormat::Arff => write_arff(dataset, relation, out),
        OutputFormat::Jsonl => write_json_lines(dataset, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contackgen_schema::{
        AddressEncoding, DatasetBuilder, Disposition, FeatureTuple, FieldKind, Schema, Slot,
    };
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn dataset() -> Dataset {
        let schema = Arc::new(
            Schema::from_kinds(
                [FieldKind::SrcIp, FieldKind::Protocol, FieldKind::Ttl],
                AddressEncoding::Text,
            )
            .unwrap(),
        );
        let mut builder = DatasetBuilder::new(Arc::clone(&schema));
        let rows = [
            vec![
                Slot::Present(Value::from("10.0.0.1")),
                Slot::Present(Value::from("17")),
                Slot::Present(Value::Integer(64)),
            ],
            vec![Slot::Absent, Slot::Present(Value::from("17")), Slot::Absent],
        ];
        for slots in rows {
            let tuple = FeatureTuple::from_slots(&schema, slots).unwrap();
            builder.push(Disposition::fill().resolve(&schema, &tuple).unwrap());
        }
        builder.finish()
    }

    #[test]
    fn arff_layout() {
        let mut buf = Vec::new();
        write_arff(&dataset(), "packets", &mut buf).unwrap();

        let expected = "\
@relation 'packets'

@attribute srcIp string
@attribute protocol string
@attribute TTL numeric

@data
'10.0.0.1','17',64
?,'17',-1
";
        assert_eq!(String::from_utf8(buf).unwrap(), expected);
    }

    #[test]
    fn arff_escapes_quotes() {
        assert_eq!(arff_quote("it's"), "'it\\'s'");
        assert_eq!(arff_quote("?"), "?");
    }

    #[test]
    fn json_lines_keep_schema_order() {
        let mut buf = Vec::new();
        write_json_lines(&dataset(), &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"srcIp":"10.0.0.1","protocol":"17","TTL":64}"#);
        assert_eq!(lines[1], r#"{"srcIp":"?","protocol":"17","TTL":-1}"#);
    }

    #[test]
    fn format_names() {
        assert_eq!("ARFF".parse::<OutputFormat>().unwrap(), OutputFormat::Arff);
        assert_eq!("json-lines".parse::<OutputFormat>().unwrap(), OutputFormat::Jsonl);
        assert!(matches!(
            "csv".parse::<OutputFormat>(),
            Err(OutputError::UnknownFormat(_))
        ));
    }
}
