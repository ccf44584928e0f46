//! Output formatting for search results and evaluation reports.
//!
//! Supports both human-readable terminal output and JSON for scripting.

use saffron_core::evaluation::{EvaluationReport, QueryMetrics};
use saffron_core::search::SearchHit;
use serde::Serialize;

/// Maximum characters to show of a description
const SNIPPET_MAX_LEN: usize = 160;

/// Maximum ingredients listed per hit in human output
const INGREDIENTS_SHOWN: usize = 8;

/// JSON output structure for search results
#[derive(Serialize)]
pub struct JsonOutput<'a> {
    pub query: &'a str,
    pub mode: &'a str,
    pub results: &'a [SearchHit],
}

/// Formats search results as JSON.
pub fn format_json(query: &str, mode: &str, hits: &[SearchHit]) -> String {
    let output = JsonOutput {
        query,
        mode,
        results: hits,
    };
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

/// Formats search results for human-readable terminal output.
pub fn format_human(query: &str, mode: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No results found for \"{}\"", query);
    }

    let mut output = String::new();
    output.push_str(&format!(
        "Found {} recipe{} for \"{}\" ({} search):\n\n",
        hits.len(),
        if hits.len() == 1 { "" } else { "s" },
        query,
        mode
    ));

    for hit in hits {
        let name = if hit.display.name.is_empty() {
            "(untitled)"
        } else {
            hit.display.name.as_str()
        };
        output.push_str(&format!(
            "{}. {} [id {}] (score: {:.3})\n",
            hit.rank, name, hit.id, hit.score
        ));

        if !hit.display.description.trim().is_empty() {
            output.push_str(&format!(
                "   {}\n",
                truncate_text(&hit.display.description, SNIPPET_MAX_LEN)
            ));
        }
        if !hit.display.tags.is_empty() {
            output.push_str(&format!("   Tags: {}\n", hit.display.tags.join(", ")));
        }
        if !hit.display.ingredients.is_empty() {
            let shown: Vec<&str> = hit
                .display
                .ingredients
                .iter()
                .take(INGREDIENTS_SHOWN)
                .map(String::as_str)
                .collect();
            let more = hit.display.ingredients.len().saturating_sub(INGREDIENTS_SHOWN);
            output.push_str(&format!("   Ingredients: {}", shown.join(", ")));
            if more > 0 {
                output.push_str(&format!(" (+{} more)", more));
            }
            output.push('\n');
        }

        output.push('\n');
    }

    output.trim_end().to_string()
}

/// Formats an evaluation report as a table.
pub fn format_report_human(mode: &str, report: &EvaluationReport) -> String {
    let k = report.k;
    let mut output = format!(
        "Evaluation of {} search at k={} ({} queries)\n\n",
        mode,
        k,
        report.queries.len()
    );
    output.push_str(&format!(
        "{:>4}  {:<9} {:>5}  {:>6} {:>6} {:>6} {:>6} {:>6}  {}\n",
        "qid", "type", "rel", "P", "R", "RR", "AP", "NDCG", "query"
    ));

    for q in &report.queries {
        let kind = format!("{:?}", q.kind).to_lowercase();
        output.push_str(&format!(
            "{:>4}  {:<9} {:>5}  {}  {}\n",
            q.qid,
            kind,
            q.relevant,
            metric_cells(&q.metrics),
            q.query
        ));
    }

    output.push('\n');
    for (label, mean) in [
        ("mean", &report.mean),
        ("keyword", &report.keyword_mean),
        ("semantic", &report.semantic_mean),
    ] {
        output.push_str(&format!("{:>17}  {}\n", label, metric_cells(mean)));
    }

    if !report.skipped.is_empty() {
        let skipped: Vec<String> = report.skipped.iter().map(|q| q.to_string()).collect();
        output.push_str(&format!(
            "\nExcluded from means (no relevant recipes): {}\n",
            skipped.join(", ")
        ));
    }

    output.trim_end().to_string()
}

/// Formats an evaluation report as JSON.
pub fn format_report_json(report: &EvaluationReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}

fn metric_cells(m: &QueryMetrics) -> String {
    format!(
        "{:>6.3} {:>6.3} {:>6.3} {:>6.3} {:>6.3}",
        m.precision, m.recall, m.reciprocal_rank, m.average_precision, m.ndcg
    )
}

/// Truncates text to a maximum length, adding ellipsis if needed.
fn truncate_text(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.len() <= max_len {
        return text.to_string();
    }

    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = &text[..end];
    match truncated.rfind(' ') {
        Some(last_space) => format!("{}...", &truncated[..last_space]),
        None => format!("{}...", truncated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saffron_core::evaluation::{QueryEvaluation, QueryKind};
    use saffron_core::recipe::DisplayRecord;
    use saffron_core::search::RecipeId;

    fn make_hit(rank: usize, id: u64, name: &str, score: f32) -> SearchHit {
        SearchHit {
            rank,
            id: RecipeId::from_u64(id),
            score,
            display: DisplayRecord {
                name: name.to_string(),
                description: "classic chewy cookies".to_string(),
                tags: vec!["desserts".to_string()],
                ingredients: (0..10).map(|i| format!("item {}", i)).collect(),
            },
        }
    }

    #[test]
    fn test_format_human_empty() {
        let output = format_human("test query", "lexical", &[]);
        assert!(output.contains("No results found"));
    }

    #[test]
    fn test_format_human_single() {
        let hits = vec![make_hit(1, 42, "chocolate chip cookies", 0.857)];
        let output = format_human("cookies", "vector", &hits);
        assert!(output.contains("1 recipe for"));
        assert!(output.contains("1. chocolate chip cookies [id 42]"));
        assert!(output.contains("0.857"));
        assert!(output.contains("Tags: desserts"));
        assert!(output.contains("(+2 more)"));
    }

    #[test]
    fn test_format_human_untitled() {
        let mut hit = make_hit(1, 7, "", 1.0);
        hit.display = DisplayRecord::default();
        let output = format_human("bread", "lexical", &[hit]);
        assert!(output.contains("(untitled)"));
        assert!(!output.contains("Tags:"));
    }

    #[test]
    fn test_format_json() {
        let hits = vec![make_hit(1, 42, "chocolate chip cookies", 0.5)];
        let output = format_json("cookies", "lexical", &hits);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["query"], "cookies");
        assert_eq!(value["mode"], "lexical");
        assert_eq!(value["results"][0]["rank"], 1);
        assert_eq!(value["results"][0]["id"], 42);
        assert_eq!(value["results"][0]["name"], "chocolate chip cookies");
    }

    #[test]
    fn test_format_report_human() {
        let metrics = QueryMetrics {
            precision: 0.2,
            recall: 1.0,
            f1: 0.333,
            reciprocal_rank: 1.0,
            average_precision: 1.0,
            ndcg: 1.0,
        };
        let report = EvaluationReport {
            k: 5,
            queries: vec![QueryEvaluation {
                qid: 3,
                query: "banana bread".to_string(),
                kind: QueryKind::Keyword,
                relevant: 1,
                retrieved: vec![RecipeId::from_u64(7)],
                metrics,
            }],
            mean: metrics,
            keyword_mean: metrics,
            semantic_mean: QueryMetrics::default(),
            skipped: vec![11],
        };

        let output = format_report_human("lexical", &report);
        assert!(output.contains("k=5"));
        assert!(output.contains("banana bread"));
        assert!(output.contains("keyword"));
        assert!(output.contains("0.200"));
        assert!(output.contains("Excluded from means (no relevant recipes): 11"));

        let json: serde_json::Value = serde_json::from_str(&format_report_json(&report)).unwrap();
        assert_eq!(json["queries"][0]["qid"], 3);
        assert_eq!(json["queries"][0]["kind"], "keyword");
    }

    #[test]
    fn test_truncate_text() {
        let short = "Short text";
        assert_eq!(truncate_text(short, 50), short);

        let long = "This is a much longer text that should be truncated at a reasonable point";
        let truncated = truncate_text(long, 30);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 33);

        let accented = "crème brûlée crème brûlée";
        assert!(truncate_text(accented, 4).ends_with("..."));
    }
}
