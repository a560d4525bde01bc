// basketball-reference.com scraper for league-wide advanced totals.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use super::{PlayerSeasonRecord, SeasonSource, SourceError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Requests identify as a desktop browser; the site rejects library agents.
pub const BROWSER_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) ",
    "AppleWebKit/537.36 (KHTML, like Gecko) ",
    "Chrome/91.0.4472.124 Safari/537.36"
);

/// Table ids used by the advanced totals page, newest layout first.
const TABLE_SELECTORS: &[&str] = &["table#advanced_stats", "table#advanced"];

const NAME_STATS: &[&str] = &["name_display", "player"];
const TEAM_STATS: &[&str] = &["team_name_abbr", "team_abbr", "team_id"];
const BPM_STATS: &[&str] = &["bpm"];
const MINUTES_STATS: &[&str] = &["mp"];

// ---------------------------------------------------------------------------
// Transport configuration
// ---------------------------------------------------------------------------

/// Outbound HTTP settings, fixed at source construction.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: &'static str,
}

impl TransportConfig {
    /// Transport with the browser user agent and the given endpoint settings.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            user_agent: BROWSER_USER_AGENT,
        }
    }

    fn season_url(&self, season_end_year: i32) -> String {
        format!(
            "{}/leagues/NBA_{}_advanced.html",
            self.base_url.trim_end_matches('/'),
            season_end_year
        )
    }
}

// ---------------------------------------------------------------------------
// BasketballReference
// ---------------------------------------------------------------------------

/// Season source backed by the basketball-reference advanced totals pages.
pub struct BasketballReference {
    client: Client,
    transport: TransportConfig,
}

impl BasketballReference {
    pub fn new(transport: TransportConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(transport.timeout)
            .user_agent(transport.user_agent)
            .build()?;
        Ok(Self { client, transport })
    }
}

#[async_trait]
impl SeasonSource for BasketballReference {
    async fn fetch_season(
        &self,
        season_end_year: i32,
    ) -> Result<Vec<PlayerSeasonRecord>, SourceError> {
        let season = season_end_year;
        let url = self.transport.season_url(season);
        debug!(season, %url, "fetching advanced totals");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| SourceError::Transport { season, source })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited {
                season,
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(SourceError::Http {
                season,
                status: status.as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|source| SourceError::Transport { season, source })?;

        let records = parse_advanced_table(season, &html)?;
        info!(season, players = records.len(), "parsed advanced totals");
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// HTML parsing
// ---------------------------------------------------------------------------

/// Extract per-team player rows from an advanced totals page.
///
/// Repeated header rows and multi-team summary rows (`TOT`, `2TM`, ...) are
/// dropped, so a traded player contributes one record per team stint. Rows
/// with a blank BPM or minutes cell are skipped.
pub fn parse_advanced_table(
    season: i32,
    html: &str,
) -> Result<Vec<PlayerSeasonRecord>, SourceError> {
    let document = Html::parse_document(html);
    let parse_err = |message: String| SourceError::Parse { season, message };

    let row_selector = Selector::parse("tbody tr").map_err(|e| parse_err(e.to_string()))?;
    let cell_selector = Selector::parse("th, td").map_err(|e| parse_err(e.to_string()))?;
    let link_selector = Selector::parse("a").map_err(|e| parse_err(e.to_string()))?;

    let mut table = None;
    for css in TABLE_SELECTORS {
        let selector = Selector::parse(css).map_err(|e| parse_err(e.to_string()))?;
        if let Some(found) = document.select(&selector).next() {
            table = Some(found);
            break;
        }
    }
    let table = table.ok_or_else(|| parse_err("advanced stats table not found".into()))?;

    let mut records = Vec::new();
    for row in table.select(&row_selector) {
        if row
            .value()
            .attr("class")
            .is_some_and(|class| class.split_whitespace().any(|c| c == "thead"))
        {
            continue;
        }

        let Some(name) = stat_cell(&row, &cell_selector, NAME_STATS)
            .map(|cell| player_name(&cell, &link_selector))
        else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        let team = stat_cell(&row, &cell_selector, TEAM_STATS)
            .map(|cell| cell_text(&cell))
            .unwrap_or_default();
        if team.is_empty() || is_combined_team(&team) {
            continue;
        }

        let bpm = stat_cell(&row, &cell_selector, BPM_STATS).map(|cell| cell_text(&cell));
        let minutes = stat_cell(&row, &cell_selector, MINUTES_STATS).map(|cell| cell_text(&cell));
        let (Some(bpm), Some(minutes)) = (bpm, minutes) else {
            debug!(season, %name, "row missing bpm or minutes column");
            continue;
        };
        if bpm.is_empty() || minutes.is_empty() {
            debug!(season, %name, %team, "skipping row with blank bpm or minutes");
            continue;
        }

        let box_plus_minus = bpm
            .parse::<f64>()
            .map_err(|_| parse_err(format!("invalid bpm '{bpm}' for {name}")))?;
        let minutes_played = minutes
            .parse::<f64>()
            .map_err(|_| parse_err(format!("invalid minutes '{minutes}' for {name}")))?;

        records.push(PlayerSeasonRecord {
            name,
            team,
            box_plus_minus,
            minutes_played,
        });
    }

    Ok(records)
}

fn stat_cell<'a>(row: &ElementRef<'a>, cells: &Selector, stats: &[&str]) -> Option<ElementRef<'a>> {
    row.select(cells).find(|cell| {
        cell.value()
            .attr("data-stat")
            .is_some_and(|stat| stats.contains(&stat))
    })
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// The linked name when present; the Hall of Fame `*` marker sits outside it.
fn player_name(cell: &ElementRef, link: &Selector) -> String {
    let text = match cell.select(link).next() {
        Some(anchor) => cell_text(&anchor),
        None => cell_text(cell),
    };
    text.trim_end_matches('*').trim().to_string()
}

fn is_combined_team(team: &str) -> bool {
    team == "TOT"
        || team
            .strip_suffix("TM")
            .is_some_and(|count| !count.is_empty() && count.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(rows: &str) -> String {
        format!(
            r#"<html><body>
<table id="advanced_stats">
  <thead><tr><th data-stat="ranker">Rk</th><th data-stat="player">Player</th></tr></thead>
  <tbody>
{rows}
  </tbody>
</table>
</body></html>"#
        )
    }

    fn row(name: &str, team: &str, mp: &str, bpm: &str) -> String {
        format!(
            concat!(
                r#"<tr><th data-stat="ranker">1</th>"#,
                r#"<td data-stat="player"><a href="/players/x.html">{}</a></td>"#,
                r#"<td data-stat="team_id">{}</td>"#,
                r#"<td data-stat="mp">{}</td>"#,
                r#"<td data-stat="bpm">{}</td></tr>"#,
            ),
            name, team, mp, bpm
        )
    }

    #[test]
    fn parses_player_rows() {
        let rows = [
            row("Larry Bird", "BOS", "2955", "7.5"),
            row("Magic Johnson", "LAL", "2795", "5.9"),
        ];
        let html = page(&rows.join("\n"));
        let records = parse_advanced_table(1980, &html).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], PlayerSeasonRecord::new("Larry Bird", "BOS", 7.5, 2955.0));
        assert_eq!(records[1].team, "LAL");
        assert!((records[1].box_plus_minus - 5.9).abs() < 1e-12);
    }

    #[test]
    fn skips_header_and_combined_rows() {
        let rows = [
            row("Adrian Dantley", "TOT", "2200", "3.0"),
            concat!(
                r#"<tr class="thead"><th data-stat="ranker">Rk</th>"#,
                r#"<td data-stat="player">Player</td></tr>"#,
            )
            .to_string(),
            row("Adrian Dantley", "UTA", "1200", "3.5"),
            row("Adrian Dantley", "2TM", "2200", "3.0"),
            row("Adrian Dantley", "DET", "1000", "2.1"),
        ];
        let records = parse_advanced_table(1987, &page(&rows.join("\n"))).unwrap();

        let teams: Vec<&str> = records.iter().map(|r| r.team.as_str()).collect();
        assert_eq!(teams, vec!["UTA", "DET"]);
    }

    #[test]
    fn strips_hall_of_fame_marker() {
        let html = page(concat!(
            r#"<tr><td data-stat="name_display"><a href="/p.html">Kareem Abdul-Jabbar</a>*</td>"#,
            r#"<td data-stat="team_name_abbr">LAL</td>"#,
            r#"<td data-stat="mp">3143</td><td data-stat="bpm">6.9</td></tr>"#,
        ));
        let records = parse_advanced_table(1980, &html).unwrap();
        assert_eq!(records[0].name, "Kareem Abdul-Jabbar");
    }

    #[test]
    fn blank_stat_cells_are_skipped() {
        let rows = [
            row("Bench Guy", "SEA", "", ""),
            row("Starter", "SEA", "1800", "1.0"),
        ];
        let html = page(&rows.join("\n"));
        let records = parse_advanced_table(1980, &html).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Starter");
    }

    #[test]
    fn falls_back_to_legacy_table_id() {
        let html =
            page(&row("Moses Malone", "HOU", "3140", "4.2")).replace("advanced_stats", "advanced");
        let records = parse_advanced_table(1981, &html).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn missing_table_is_a_parse_error() {
        let err =
            parse_advanced_table(1980, "<html><body><p>blocked</p></body></html>").unwrap_err();
        assert!(matches!(err, SourceError::Parse { season: 1980, .. }));
    }

    #[test]
    fn malformed_number_is_a_parse_error() {
        let html = page(&row("Typo", "NYK", "12a", "1.0"));
        let err = parse_advanced_table(1980, &html).unwrap_err();
        match err {
            SourceError::Parse { message, .. } => assert!(message.contains("12a")),
            other => panic!("expected Parse error, got: {other}"),
        }
    }

    #[test]
    fn combined_team_detection() {
        assert!(is_combined_team("TOT"));
        assert!(is_combined_team("2TM"));
        assert!(is_combined_team("3TM"));
        assert!(!is_combined_team("TM"));
        assert!(!is_combined_team("OKC"));
    }

    #[test]
    fn season_url_uses_base_url() {
        let transport = TransportConfig::new("http://localhost:8080/", Duration::from_secs(5));
        assert_eq!(
            transport.season_url(1995),
            "http://localhost:8080/leagues/NBA_1995_advanced.html"
        );
        assert_eq!(transport.user_agent, BROWSER_USER_AGENT);
    }
}
