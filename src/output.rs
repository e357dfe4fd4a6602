//! Reshaping of keyword-idea results.
//!
//! Every output shape is produced by [`transform`] from the same response;
//! nothing here talks to the network.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::ads::{GenerateKeywordIdeaResponse, GenerateKeywordIdeaResult};
use crate::{KeywordIdeasError, Result};

pub const COL_KEYWORD: &str = "Keyword";
pub const COL_AVG_MONTHLY_SEARCHES: &str = "Avg Monthly Searches";
pub const COL_COMPETITION_LEVEL: &str = "Competition Level";
pub const COL_COMPETITION_INDEX: &str = "Competition Index";
pub const COL_SEARCHES_PAST_MONTHS: &str = "Searches Past Months";
pub const COL_PAST_MONTHS: &str = "Past Months";
pub const COL_ANNOTATIONS: &str = "List Annotations";
pub const COL_LOW_TOP_BID: &str = "PBM Lo Top";
pub const COL_HIGH_TOP_BID: &str = "PBM Hi Top";

/// Columns of the full table, in order
pub const TABLE_COLUMNS: [&str; 9] = [
    COL_KEYWORD,
    COL_AVG_MONTHLY_SEARCHES,
    COL_COMPETITION_LEVEL,
    COL_COMPETITION_INDEX,
    COL_SEARCHES_PAST_MONTHS,
    COL_PAST_MONTHS,
    COL_ANNOTATIONS,
    COL_LOW_TOP_BID,
    COL_HIGH_TOP_BID,
];

/// Columns of the console summary
pub const SHORT_COLUMNS: [&str; 6] = [
    COL_KEYWORD,
    COL_AVG_MONTHLY_SEARCHES,
    COL_COMPETITION_LEVEL,
    COL_COMPETITION_INDEX,
    COL_LOW_TOP_BID,
    COL_HIGH_TOP_BID,
];

const LIST_SEPARATOR: &str = ", ";

/// Requested shape of the query result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Provider response as is
    Raw,
    /// Rows and named columns
    Table,
    /// One full record per idea
    #[default]
    Records,
    /// Keyword, searches and competition only
    Compact,
    /// One line of prose per idea
    Text,
}

impl FromStr for OutputFormat {
    type Err = KeywordIdeasError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "raw" => Ok(OutputFormat::Raw),
            "table" => Ok(OutputFormat::Table),
            "dict" | "list" | "records" => Ok(OutputFormat::Records),
            "compact" => Ok(OutputFormat::Compact),
            "text" => Ok(OutputFormat::Text),
            other => Err(KeywordIdeasError::Validation(format!(
                "Unknown output format '{}': expected raw, table, dict, compact or text",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Raw => "raw",
            OutputFormat::Table => "table",
            OutputFormat::Records => "dict",
            OutputFormat::Compact => "compact",
            OutputFormat::Text => "text",
        };
        f.write_str(name)
    }
}

/// Full per-keyword record with the monthly history kept as lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdeaRecord {
    pub keyword: String,
    pub avg_monthly_searches: Option<i64>,
    pub comp_level: String,
    pub comp_index: Option<i64>,
    pub searches: Vec<i64>,
    pub past_months: Vec<String>,
    pub annotations: Vec<String>,
    pub low_top_of_page_bid_micros: Option<i64>,
    pub high_top_of_page_bid_micros: Option<i64>,
}

impl From<&GenerateKeywordIdeaResult> for IdeaRecord {
    fn from(idea: &GenerateKeywordIdeaResult) -> Self {
        let metrics = &idea.keyword_idea_metrics;
        Self {
            keyword: idea.text.clone(),
            avg_monthly_searches: metrics.avg_monthly_searches,
            comp_level: metrics.competition.to_string(),
            comp_index: metrics.competition_index,
            searches: metrics
                .monthly_search_volumes
                .iter()
                .map(|volume| volume.monthly_searches.unwrap_or(0))
                .collect(),
            past_months: metrics
                .monthly_search_volumes
                .iter()
                .map(|volume| volume.label())
                .collect(),
            annotations: idea
                .keyword_annotations
                .concepts
                .iter()
                .map(|concept| concept.concept_group.name.clone())
                .collect(),
            low_top_of_page_bid_micros: metrics.low_top_of_page_bid_micros,
            high_top_of_page_bid_micros: metrics.high_top_of_page_bid_micros,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompactIdeaRecord {
    pub keyword: String,
    pub avg_monthly_searches: Option<i64>,
    pub comp_level: String,
    pub comp_index: Option<i64>,
}

impl From<&GenerateKeywordIdeaResult> for CompactIdeaRecord {
    fn from(idea: &GenerateKeywordIdeaResult) -> Self {
        let metrics = &idea.keyword_idea_metrics;
        Self {
            keyword: idea.text.clone(),
            avg_monthly_searches: metrics.avg_monthly_searches,
            comp_level: metrics.competition.to_string(),
            comp_index: metrics.competition_index,
        }
    }
}

/// Result in the requested shape
#[derive(Debug, Clone)]
pub enum IdeasOutput {
    Raw(GenerateKeywordIdeaResponse),
    Table(IdeasTable),
    /// `None` when the provider returned no ideas
    Records(Option<Vec<IdeaRecord>>),
    /// `None` when the provider returned no ideas
    Compact(Option<Vec<CompactIdeaRecord>>),
    /// Empty string when the provider returned no ideas
    Text(String),
}

impl IdeasOutput {
    pub fn is_empty(&self) -> bool {
        match self {
            IdeasOutput::Raw(response) => response.is_empty(),
            IdeasOutput::Table(table) => table.is_empty(),
            IdeasOutput::Records(records) => records.is_none(),
            IdeasOutput::Compact(records) => records.is_none(),
            IdeasOutput::Text(text) => text.is_empty(),
        }
    }

    pub fn as_table(&self) -> Option<&IdeasTable> {
        match self {
            IdeasOutput::Table(table) => Some(table),
            _ => None,
        }
    }
}

/// Project a keyword-ideas response into the requested shape
pub fn transform(response: &GenerateKeywordIdeaResponse, format: OutputFormat) -> IdeasOutput {
    let ideas = &response.results;
    match format {
        OutputFormat::Raw => IdeasOutput::Raw(response.clone()),
        OutputFormat::Table => IdeasOutput::Table(IdeasTable::from_ideas(ideas)),
        OutputFormat::Records => IdeasOutput::Records(
            (!ideas.is_empty()).then(|| ideas.iter().map(IdeaRecord::from).collect()),
        ),
        OutputFormat::Compact => IdeasOutput::Compact(
            (!ideas.is_empty()).then(|| ideas.iter().map(CompactIdeaRecord::from).collect()),
        ),
        OutputFormat::Text => IdeasOutput::Text(
            ideas
                .iter()
                .map(|idea| {
                    format!(
                        "- \"{}\" has \"{}\" avg monthly searches & \"{}\" competition.\n",
                        idea.text,
                        idea.keyword_idea_metrics.avg_monthly_searches.unwrap_or(0),
                        idea.keyword_idea_metrics.competition
                    )
                })
                .collect(),
        ),
    }
}

/// Keyword ideas as string cells under named columns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdeasTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl IdeasTable {
    /// Build the full table; list-valued fields are joined with `", "`
    pub fn from_ideas(ideas: &[GenerateKeywordIdeaResult]) -> Self {
        let rows = ideas
            .iter()
            .map(IdeaRecord::from)
            .map(|record| {
                vec![
                    record.keyword,
                    opt_cell(record.avg_monthly_searches),
                    record.comp_level,
                    opt_cell(record.comp_index),
                    join(&record.searches),
                    join(&record.past_months),
                    join(&record.annotations),
                    opt_cell(record.low_top_of_page_bid_micros),
                    opt_cell(record.high_top_of_page_bid_micros),
                ]
            })
            .collect();
        Self {
            columns: TABLE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Keep only the named columns, in the order given; unknown names are skipped
    pub fn select(&self, columns: &[&str]) -> Self {
        let indices: Vec<usize> = columns
            .iter()
            .filter_map(|name| self.columns.iter().position(|c| c == name))
            .collect();
        Self {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// Console summary without the monthly history and annotations
    pub fn shortly(&self) -> Self {
        self.select(&SHORT_COLUMNS)
    }

    /// Write the table as CSV with a header row
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv_to(file)
    }

    pub fn write_csv_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(&self.columns)?;
        for row in &self.rows {
            csv.write_record(row)?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn write_html(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_html())?;
        Ok(())
    }

    /// Render as a bare HTML `<table>`
    pub fn to_html(&self) -> String {
        let mut html = String::from("<table border=\"1\" class=\"dataframe\">\n  <thead>\n    <tr>\n");
        for column in &self.columns {
            html.push_str(&format!("      <th>{}</th>\n", escape_html(column)));
        }
        html.push_str("    </tr>\n  </thead>\n  <tbody>\n");
        for row in &self.rows {
            html.push_str("    <tr>\n");
            for cell in row {
                html.push_str(&format!("      <td>{}</td>\n", escape_html(cell)));
            }
            html.push_str("    </tr>\n");
        }
        html.push_str("  </tbody>\n</table>\n");
        html
    }
}

impl fmt::Display for IdeasTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return writeln!(f, "Empty table");
        }

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let line = |f: &mut fmt::Formatter<'_>, cells: &[String]| -> fmt::Result {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect();
            writeln!(f, "{}", padded.join("  ").trim_end())
        };

        line(f, &self.columns)?;
        for row in &self.rows {
            line(f, row)?;
        }
        Ok(())
    }
}

fn opt_cell(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

/// Escape text for use inside HTML elements and attribute values
pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::{
        CompetitionLevel, ConceptGroup, KeywordAnnotations, KeywordConcept,
        KeywordPlanHistoricalMetrics, MonthOfYear, MonthlySearchVolume,
    };

    fn idea(text: &str, avg: i64, competition: CompetitionLevel) -> GenerateKeywordIdeaResult {
        GenerateKeywordIdeaResult {
            text: text.to_string(),
            keyword_idea_metrics: KeywordPlanHistoricalMetrics {
                avg_monthly_searches: Some(avg),
                monthly_search_volumes: vec![
                    MonthlySearchVolume {
                        year: Some(2024),
                        month: MonthOfYear::November,
                        monthly_searches: Some(880),
                    },
                    MonthlySearchVolume {
                        year: Some(2024),
                        month: MonthOfYear::December,
                        monthly_searches: Some(720),
                    },
                ],
                competition,
                competition_index: Some(87),
                low_top_of_page_bid_micros: Some(1_500_000),
                high_top_of_page_bid_micros: Some(6_250_000),
            },
            keyword_annotations: KeywordAnnotations {
                concepts: vec![KeywordConcept {
                    name: "implant".to_string(),
                    concept_group: ConceptGroup {
                        name: "Dental".to_string(),
                        group_type: "NON_BRAND".to_string(),
                    },
                }],
            },
            close_variants: Vec::new(),
        }
    }

    fn response() -> GenerateKeywordIdeaResponse {
        GenerateKeywordIdeaResponse {
            results: vec![
                idea("dental implants", 74000, CompetitionLevel::High),
                idea("free dentist", 8100, CompetitionLevel::Low),
            ],
            total_size: Some(2),
            next_page_token: None,
        }
    }

    #[test]
    fn parses_format_tags() {
        assert_eq!("default".parse::<OutputFormat>().unwrap(), OutputFormat::Raw);
        assert_eq!("TABLE".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("list".parse::<OutputFormat>().unwrap(), OutputFormat::Records);
        assert_eq!("dict".parse::<OutputFormat>().unwrap(), OutputFormat::Records);
        assert_eq!("compact".parse::<OutputFormat>().unwrap(), OutputFormat::Compact);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!(matches!(
            "xml".parse::<OutputFormat>(),
            Err(KeywordIdeasError::Validation(_))
        ));
    }

    #[test]
    fn table_joins_lists_into_cells() {
        let IdeasOutput::Table(table) = transform(&response(), OutputFormat::Table) else {
            panic!("expected table");
        };
        assert_eq!(table.columns, TABLE_COLUMNS.to_vec());
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.rows[0],
            vec![
                "dental implants",
                "74000",
                "HIGH",
                "87",
                "880, 720",
                "2024-11, 2024-12",
                "Dental",
                "1500000",
                "6250000"
            ]
        );
    }

    #[test]
    fn records_keep_lists() {
        let IdeasOutput::Records(Some(records)) = transform(&response(), OutputFormat::Records)
        else {
            panic!("expected records");
        };
        assert_eq!(records[1].keyword, "free dentist");
        assert_eq!(records[1].comp_level, "LOW");
        assert_eq!(records[0].searches, vec![880, 720]);
        assert_eq!(records[0].past_months, vec!["2024-11", "2024-12"]);
        assert_eq!(records[0].annotations, vec!["Dental"]);

        let json = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(json["avg_monthly_searches"], 74000);
        assert_eq!(json["comp_index"], 87);
    }

    #[test]
    fn compact_records_have_four_fields() {
        let IdeasOutput::Compact(Some(records)) = transform(&response(), OutputFormat::Compact)
        else {
            panic!("expected compact records");
        };
        let json = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 4);
        assert_eq!(json["keyword"], "dental implants");
    }

    #[test]
    fn text_has_one_line_per_idea() {
        let IdeasOutput::Text(text) = transform(&response(), OutputFormat::Text) else {
            panic!("expected text");
        };
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with(
            "- \"dental implants\" has \"74000\" avg monthly searches & \"HIGH\" competition."
        ));
    }

    #[test]
    fn empty_results_are_not_errors() {
        let empty = GenerateKeywordIdeaResponse::default();

        match transform(&empty, OutputFormat::Table) {
            IdeasOutput::Table(table) => assert!(table.is_empty()),
            other => panic!("unexpected output: {other:?}"),
        }
        assert!(matches!(transform(&empty, OutputFormat::Records), IdeasOutput::Records(None)));
        assert!(matches!(transform(&empty, OutputFormat::Compact), IdeasOutput::Compact(None)));
        match transform(&empty, OutputFormat::Text) {
            IdeasOutput::Text(text) => assert_eq!(text, ""),
            other => panic!("unexpected output: {other:?}"),
        }
        for format in [
            OutputFormat::Raw,
            OutputFormat::Table,
            OutputFormat::Records,
            OutputFormat::Compact,
            OutputFormat::Text,
        ] {
            assert!(transform(&empty, format).is_empty(), "format {format}");
        }
    }

    #[test]
    fn shortly_drops_history_columns() {
        let table = IdeasTable::from_ideas(&response().results).shortly();
        assert_eq!(table.columns, SHORT_COLUMNS.to_vec());
        assert_eq!(table.rows[1], vec!["free dentist", "8100", "LOW", "87", "1500000", "6250000"]);
    }

    #[test]
    fn writes_csv_with_quoted_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_results.csv");
        IdeasTable::from_ideas(&response().results)
            .write_csv(&path)
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Keyword,Avg Monthly Searches,Competition Level,Competition Index,Searches Past Months,Past Months,List Annotations,PBM Lo Top,PBM Hi Top"
        );
        assert_eq!(
            lines.next().unwrap(),
            "dental implants,74000,HIGH,87,\"880, 720\",\"2024-11, 2024-12\",Dental,1500000,6250000"
        );
    }

    #[test]
    fn empty_table_csv_has_header_only() {
        let mut buf = Vec::new();
        IdeasTable::from_ideas(&[]).write_csv_to(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }

    #[test]
    fn escapes_html_metacharacters() {
        assert_eq!(escape_html(r#"<a href="x">&</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn html_escapes_cells() {
        let mut ideas = response().results;
        ideas[0].text = "<b>&</b>".to_string();
        let html = IdeasTable::from_ideas(&ideas).to_html();
        assert!(html.contains("<th>Keyword</th>"));
        assert!(html.contains("<td>&lt;b&gt;&amp;&lt;/b&gt;</td>"));
        assert_eq!(html.matches("<tr>").count(), 3);
    }

    #[test]
    fn display_aligns_columns() {
        let table = IdeasTable::from_ideas(&response().results).select(&[COL_KEYWORD, COL_COMPETITION_LEVEL]);
        let rendered = table.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Keyword          Competition Level");
        assert_eq!(lines[1], "dental implants  HIGH");
    }
}
