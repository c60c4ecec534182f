//! Read-through proxy over the HLTV-style match data API.
//!
//! No shared state with the chat core. Upstream failures degrade to empty
//! results rather than surfacing errors to the client.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

/// Upstream client plus the team filter, cloned into each handler call.
#[derive(Clone)]
pub struct MatchDataClient {
    client: reqwest::Client,
    base: String,
    team: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRef {
    pub name: Option<String>,
}

/// Upcoming match as returned upstream. Fields we do not inspect pass
/// through untouched in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingMatch {
    pub team1: Option<TeamRef>,
    pub team2: Option<TeamRef>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// Live score entry; the upstream flattens team names to plain strings here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveMatch {
    pub team1: Option<String>,
    pub team2: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl MatchDataClient {
    pub fn new(base: String, team: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
            team,
        }
    }

    /// Upcoming matches for the configured team; empty on upstream failure.
    pub async fn upcoming(&self) -> Vec<UpcomingMatch> {
        let url = format!("{}/matches", self.base.trim_end_matches('/'));
        match self.fetch::<Vec<UpcomingMatch>>(&url).await {
            Ok(matches) => matches
                .into_iter()
                .filter(|m| {
                    self.is_team(m.team1.as_ref().and_then(|t| t.name.as_deref()))
                        || self.is_team(m.team2.as_ref().and_then(|t| t.name.as_deref()))
                })
                .collect(),
            Err(err) => {
                error!(error = %err, "Upstream matches request failed");
                Vec::new()
            }
        }
    }

    /// The team's live match, if one is running; `None` covers both "no
    /// match" and upstream failure.
    pub async fn live(&self) -> Option<LiveMatch> {
        let url = format!("{}/livescore", self.base.trim_end_matches('/'));
        match self.fetch::<Vec<LiveMatch>>(&url).await {
            Ok(matches) => matches
                .into_iter()
                .find(|m| self.is_team(m.team1.as_deref()) || self.is_team(m.team2.as_deref())),
            Err(err) => {
                error!(error = %err, "Upstream livescore request failed");
                None
            }
        }
    }

    fn is_team(&self, name: Option<&str>) -> bool {
        name.is_some_and(|n| n.eq_ignore_ascii_case(&self.team))
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await
    }
}

/// GET /api/matches/upcoming
pub async fn upcoming_matches(State(matches): State<MatchDataClient>) -> Json<Vec<UpcomingMatch>> {
    Json(matches.upcoming().await)
}

/// GET /api/matches/live
pub async fn live_score(State(matches): State<MatchDataClient>) -> Json<serde_json::Value> {
    match matches.live().await {
        Some(live) => {
            Json(serde_json::to_value(&live).unwrap_or_else(|_| json!({ "status": "no live match" })))
        }
        None => Json(json!({ "status": "no live match" })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MatchDataClient {
        MatchDataClient::new("http://localhost:9/api".to_string(), "FURIA".to_string())
    }

    #[test]
    fn test_upcoming_match_parses_upstream_shape() {
        let raw = json!({
            "team1": { "name": "FURIA", "logo": "x.png" },
            "team2": { "name": "NAVI" },
            "event": { "name": "Major" },
            "date": "2026-08-10T18:00:00Z"
        });
        let parsed: UpcomingMatch = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.team1.as_ref().unwrap().name.as_deref(), Some("FURIA"));
        assert_eq!(parsed.extra["event"]["name"], "Major");
    }

    #[test]
    fn test_team_filter_matches_either_side() {
        let client = client();
        assert!(client.is_team(Some("FURIA")));
        assert!(client.is_team(Some("furia")));
        assert!(!client.is_team(Some("NAVI")));
        assert!(!client.is_team(None));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_degrades_to_empty() {
        let client = client();
        assert!(client.upcoming().await.is_empty());
        assert!(client.live().await.is_none());
    }
}
