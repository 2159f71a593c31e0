//! Protocol probes for the metadata conventions of the common
//! streaming-server families.
//!
//! Each probe is an independent strategy: one endpoint, one extraction rule.
//! Extraction is kept in pure parser functions so server-dialect quirks can
//! be patched (and unit-tested against canned bodies) without touching the
//! orchestration in [`crate::resolver`]. A probe never errors outward —
//! every failure mode collapses to `None` after a debug log.

use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

/// One metadata endpoint convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Shoutcast v1 `7.html` status line.
    ShoutcastV1,
    /// Shoutcast v2 `stats?json=1`.
    ShoutcastV2,
    /// Icecast `status-json.xsl`.
    IcecastJson,
    /// Icecast legacy `status.xsl` HTML page.
    IcecastHtml,
}

/// Fixed confidence ranking used by the resolver when several probes
/// succeed. Shoutcast v1 is the most specific format (a bare status line
/// nothing else serves); the legacy HTML scrape is the most fragile and
/// ranks last. Position here, not completion order, decides the winner.
pub const PROBE_ORDER: [Probe; 4] = [
    Probe::ShoutcastV1,
    Probe::ShoutcastV2,
    Probe::IcecastJson,
    Probe::IcecastHtml,
];

/// Why a single probe produced nothing. Stays inside the probe layer:
/// logged at debug level, then collapsed to `None`.
#[derive(Debug, Error)]
enum ProbeFailure {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("endpoint returned {0}")]
    Status(reqwest::StatusCode),
    #[error("no recognisable metadata in response")]
    NoMatch,
}

impl Probe {
    /// The status endpoint this probe queries under a candidate base URL.
    pub fn endpoint(&self, base: &str) -> String {
        match self {
            Probe::ShoutcastV1 => format!("{}/7.html", base),
            Probe::ShoutcastV2 => format!("{}/stats?json=1", base),
            Probe::IcecastJson => format!("{}/status-json.xsl", base),
            Probe::IcecastHtml => format!("{}/status.xsl", base),
        }
    }

    /// Query `url` and extract a raw (unsanitized) title, or `None`.
    pub async fn run(&self, client: &reqwest::Client, url: &str) -> Option<String> {
        match self.fetch(client, url).await {
            Ok(title) => Some(title),
            Err(failure) => {
                debug!("probe {:?} missed at {}: {}", self, url, failure);
                None
            }
        }
    }

    async fn fetch(&self, client: &reqwest::Client, url: &str) -> Result<String, ProbeFailure> {
        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeFailure::Status(status));
        }
        let body = response.text().await?;
        self.extract(&body).ok_or(ProbeFailure::NoMatch)
    }

    /// Apply this probe's extraction rule to a response body.
    pub fn extract(&self, body: &str) -> Option<String> {
        match self {
            Probe::ShoutcastV1 => parse_seven_html(body),
            Probe::ShoutcastV2 => parse_stats_json(body),
            Probe::IcecastJson => parse_status_json(body),
            Probe::IcecastHtml => parse_status_html(body),
        }
    }
}

static SEVEN_HTML_RE: OnceLock<Regex> = OnceLock::new();

/// Shoutcast v1 `7.html`: `listeners,status,peak,max,unique,bitrate,<title>`.
/// Everything after the sixth comma is the title; the title itself may
/// contain commas. Servers often wrap the line in `<html><body>` — the
/// wrapper tags survive here and are removed by the sanitizer.
fn parse_seven_html(body: &str) -> Option<String> {
    let re = SEVEN_HTML_RE
        .get_or_init(|| Regex::new(r"(?s)^(?:[^,]*,){6}(.*)$").expect("7.html pattern is valid"));
    let caps = re.captures(body.trim())?;
    let title = caps.get(1)?.as_str().trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// Shoutcast v2 `stats?json=1` response. Single-stream servers report
/// `songtitle` at the top level; multi-stream servers nest it per stream.
#[derive(Debug, Deserialize)]
struct ShoutcastStats {
    songtitle: Option<String>,
    #[serde(default)]
    streams: Vec<ShoutcastStream>,
}

#[derive(Debug, Deserialize)]
struct ShoutcastStream {
    songtitle: Option<String>,
}

fn parse_stats_json(body: &str) -> Option<String> {
    let stats: ShoutcastStats = serde_json::from_str(body).ok()?;
    stats
        .songtitle
        .or_else(|| stats.streams.into_iter().next().and_then(|s| s.songtitle))
        .filter(|t| !t.trim().is_empty())
}

/// Icecast `status-json.xsl`. `icestats.source` is an object for a single
/// mount and a list for several; the first source carrying a `title` wins.
#[derive(Debug, Deserialize)]
struct IceStatsRoot {
    icestats: IceStats,
}

#[derive(Debug, Deserialize)]
struct IceStats {
    source: Option<IceSourceField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IceSourceField {
    One(IceSource),
    Many(Vec<IceSource>),
}

#[derive(Debug, Deserialize)]
struct IceSource {
    title: Option<String>,
}

fn parse_status_json(body: &str) -> Option<String> {
    let root: IceStatsRoot = serde_json::from_str(body).ok()?;
    let sources = match root.icestats.source? {
        IceSourceField::One(source) => vec![source],
        IceSourceField::Many(sources) => sources,
    };
    sources
        .into_iter()
        .find_map(|s| s.title)
        .filter(|t| !t.trim().is_empty())
}

/// Legacy Icecast `status.xsl`: a plain HTML table where a "Current Song"
/// cell is immediately followed by a cell holding the title. Cells are
/// scanned in document order; the pair is always adjacent.
fn parse_status_html(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let selector = Selector::parse("td").ok()?;
    let cells: Vec<String> = document
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect();

    let label_idx = cells
        .iter()
        .position(|c| c.to_lowercase().starts_with("current song"))?;
    cells
        .get(label_idx + 1)
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seven_html_plain() {
        assert_eq!(
            parse_seven_html("1,1,100,100,1,128,Artist - Title").as_deref(),
            Some("Artist - Title")
        );
    }

    #[test]
    fn test_seven_html_title_with_commas() {
        assert_eq!(
            parse_seven_html("1,1,2,3,4,128,Earth, Wind & Fire - September").as_deref(),
            Some("Earth, Wind & Fire - September")
        );
    }

    #[test]
    fn test_seven_html_wrapped_in_markup() {
        // The leading tag glues onto the first field; the trailing one stays
        // on the captured title for the sanitizer to remove.
        assert_eq!(
            parse_seven_html("<html><body>1,1,10,50,1,128,Song</body></html>").as_deref(),
            Some("Song</body></html>")
        );
    }

    #[test]
    fn test_seven_html_too_few_fields() {
        assert_eq!(parse_seven_html("1,2,3"), None);
        assert_eq!(parse_seven_html(""), None);
    }

    #[test]
    fn test_seven_html_empty_title() {
        assert_eq!(parse_seven_html("1,1,2,3,4,128,"), None);
    }

    #[test]
    fn test_stats_json_top_level() {
        let body = r#"{"songtitle": "Top Level Song", "streams": []}"#;
        assert_eq!(parse_stats_json(body).as_deref(), Some("Top Level Song"));
    }

    #[test]
    fn test_stats_json_first_stream() {
        let body = r#"{"streams": [{"songtitle": "Stream One"}, {"songtitle": "Stream Two"}]}"#;
        assert_eq!(parse_stats_json(body).as_deref(), Some("Stream One"));
    }

    #[test]
    fn test_stats_json_first_stream_only() {
        // Only the first stream is consulted; a titled second stream does
        // not rescue a bare first one.
        let body = r#"{"streams": [{}, {"songtitle": "Stream Two"}]}"#;
        assert_eq!(parse_stats_json(body), None);
    }

    #[test]
    fn test_stats_json_malformed() {
        assert_eq!(parse_stats_json("not json"), None);
        assert_eq!(parse_stats_json(r#"{"streams": {}}"#), None);
    }

    #[test]
    fn test_status_json_single_source() {
        let body = r#"{"icestats": {"source": {"title": "Single Source"}}}"#;
        assert_eq!(parse_status_json(body).as_deref(), Some("Single Source"));
    }

    #[test]
    fn test_status_json_first_titled_source_wins() {
        let body = r#"{"icestats": {"source": [
            {"listeners": 3},
            {"title": "Second Source"},
            {"title": "Third Source"}
        ]}}"#;
        assert_eq!(parse_status_json(body).as_deref(), Some("Second Source"));
    }

    #[test]
    fn test_status_json_no_source() {
        assert_eq!(parse_status_json(r#"{"icestats": {}}"#), None);
        assert_eq!(parse_status_json("{}"), None);
    }

    #[test]
    fn test_status_html_current_song_cell() {
        let body = r#"<html><body><table>
            <tr><td>Stream Title:</td><td class="streamdata">My Station</td></tr>
            <tr><td>Current Song:</td><td class="streamdata">Artist - Title</td></tr>
        </table></body></html>"#;
        assert_eq!(parse_status_html(body).as_deref(), Some("Artist - Title"));
    }

    #[test]
    fn test_status_html_no_current_song() {
        let body = "<html><body><table><tr><td>Listeners:</td><td>5</td></tr></table></body></html>";
        assert_eq!(parse_status_html(body), None);
    }

    #[test]
    fn test_endpoints() {
        let base = "http://host:8000/radio";
        assert_eq!(Probe::ShoutcastV1.endpoint(base), "http://host:8000/radio/7.html");
        assert_eq!(Probe::ShoutcastV2.endpoint(base), "http://host:8000/radio/stats?json=1");
        assert_eq!(Probe::IcecastJson.endpoint(base), "http://host:8000/radio/status-json.xsl");
        assert_eq!(Probe::IcecastHtml.endpoint(base), "http://host:8000/radio/status.xsl");
    }
}
