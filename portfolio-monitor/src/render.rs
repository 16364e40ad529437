//! Plain-text rendering of a [`DigestReport`] for email bodies and files.

use crate::types::{CompanyDigestSection, DigestReport, FundingFact};

const HEAVY_RULE: &str = "================================================================================";
const LIGHT_RULE: &str = "--------------------------------------------------------------------------------";

pub fn render_text(report: &DigestReport) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(HEAVY_RULE.to_string());
    lines.push("PORTFOLIO WEEKLY DIGEST".to_string());
    lines.push(format!("Week of {}", report.generated_at.format("%B %d, %Y")));
    lines.push(HEAVY_RULE.to_string());
    lines.push(String::new());

    render_summary(report, &mut lines);
    lines.push(String::new());

    lines.push(HEAVY_RULE.to_string());
    lines.push("DETAILED COMPANY REPORTS".to_string());
    lines.push(HEAVY_RULE.to_string());
    lines.push(String::new());

    for section in &report.active_sections {
        render_section(section, &mut lines);
    }

    if !report.quiet_companies.is_empty() {
        lines.push(LIGHT_RULE.to_string());
        lines.push("NO NEWS THIS WEEK".to_string());
        lines.push(LIGHT_RULE.to_string());
        lines.push(String::new());
        for company in &report.quiet_companies {
            lines.push(format!("  • {}", company.name));
        }
        lines.push(String::new());
    }

    lines.push(HEAVY_RULE.to_string());
    lines.push(format!(
        "End of digest - Generated on {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.push(HEAVY_RULE.to_string());

    lines.join("\n")
}

fn render_summary(report: &DigestReport, lines: &mut Vec<String>) {
    lines.push(LIGHT_RULE.to_string());
    lines.push("EXECUTIVE SUMMARY".to_string());
    lines.push(LIGHT_RULE.to_string());
    lines.push(String::new());

    lines.push(format!("  Portfolio Companies: {}", report.totals.companies_checked));
    lines.push(format!("  Companies with News: {}", report.totals.companies_with_news));
    lines.push(format!("  Total Articles: {}", report.totals.total_items));
    lines.push(String::new());

    if report.active_sections.is_empty() {
        lines.push("  No companies had news this week.".to_string());
        return;
    }

    lines.push("  Companies in the news this week:".to_string());
    for section in &report.active_sections {
        lines.push(format!(
            "    • {} ({} {})",
            section.company.name,
            section.items.len(),
            plural(section.items.len(), "article", "articles")
        ));
    }
}

fn render_section(section: &CompanyDigestSection, lines: &mut Vec<String>) {
    lines.push(LIGHT_RULE.to_string());
    lines.push(section.company.name.to_uppercase());
    lines.push(LIGHT_RULE.to_string());
    lines.push(String::new());

    if let Some(funding) = &section.funding {
        lines.push(format!("Funding: {}", funding_summary(funding)));
        lines.push(String::new());
    }

    lines.push(format!(
        "LINKS ({} {}):",
        section.items.len(),
        plural(section.items.len(), "article", "articles")
    ));
    lines.push(String::new());

    for (i, item) in section.items.iter().enumerate() {
        lines.push(format!("  [{}] {}", i + 1, item.title));
        lines.push(format!("      {}", item.link));
        lines.push(format!(
            "      {} | {}",
            item.source,
            item.published_at.format("%Y-%m-%d %H:%M")
        ));
        if !item.summary.is_empty() {
            lines.push(format!("      {}", item.summary));
        }
        lines.push(String::new());
    }
}

pub fn funding_summary(funding: &FundingFact) -> String {
    match funding.as_of {
        Some(date) => format!(
            "{} (as of {}, {})",
            funding.amount_or_valuation,
            date.format("%Y-%m-%d"),
            funding.source_note
        ),
        None => format!("{} ({})", funding.amount_or_valuation, funding.source_note),
    }
}

/// Email subject summarising how much news the week had.
pub fn subject_line(report: &DigestReport) -> String {
    let week_of = report.generated_at.format("%m/%d/%Y");

    match report.totals.companies_with_news {
        0 => format!("Portfolio Digest - Week of {} - Quiet Week", week_of),
        1 => format!("Portfolio Digest - Week of {} - 1 Company Update", week_of),
        n => format!("Portfolio Digest - Week of {} - {} Companies with News", week_of, n),
    }
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        one
    } else {
        many
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::{CompanyResult, DigestCompiler};
    use crate::types::NewsItem;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn report(with_news: &[&str], quiet: &[&str]) -> DigestReport {
        let at = Utc.with_ymd_and_hms(2025, 10, 14, 8, 0, 0).unwrap();
        let mut results: Vec<CompanyResult> = with_news
            .iter()
            .map(|name| {
                CompanyResult::new(
                    (*name).into(),
                    vec![NewsItem {
                        title: format!("{} expands to Europe", name),
                        link: format!("https://news.example.com/{}", name.to_lowercase()),
                        published_at: at,
                        source: "Reuters".into(),
                        summary: String::new(),
                    }],
                )
            })
            .collect();
        results.extend(quiet.iter().map(|name| CompanyResult::new((*name).into(), Vec::new())));
        DigestCompiler::new().compile_at(at, 7, results)
    }

    #[test]
    fn subject_reflects_active_count() {
        assert!(subject_line(&report(&[], &["Acme"])).ends_with("Quiet Week"));
        assert!(subject_line(&report(&["Acme"], &[])).ends_with("1 Company Update"));
        assert!(subject_line(&report(&["Acme", "Bolt"], &["Cora"])).ends_with("2 Companies with News"));
    }

    #[test]
    fn body_lists_sections_and_quiet_companies() {
        let body = render_text(&report(&["Acme"], &["Bolt"]));
        assert!(body.contains("ACME"));
        assert!(body.contains("Acme expands to Europe"));
        assert!(body.contains("https://news.example.com/acme"));
        assert!(body.contains("NO NEWS THIS WEEK"));
        assert!(body.contains("  • Bolt"));
        assert!(!body.contains("Funding:"));
        assert!(body.contains("LINKS (1 article):"));
        assert!(body.contains("Acme (1 article)"));
    }

    #[test]
    fn funding_line_mentions_date_when_known() {
        let fact = FundingFact {
            amount_or_valuation: "raised $20 million".into(),
            as_of: NaiveDate::from_ymd_opt(2025, 3, 1),
            source_note: "search results".into(),
        };
        assert_eq!(
            funding_summary(&fact),
            "raised $20 million (as of 2025-03-01, search results)"
        );
    }
}
