//! Directory listings: filtered discovery queries, the legacy ranking,
//! the export feed, and per-instance ping history.

use fedidex_common::{AppError, AppResult, VocabEntry, vocab};
use fedidex_db::{
    entities::instance,
    repositories::{InstanceRepository, PingRepository},
};
use rand::seq::SliceRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How many pings the history endpoint returns.
const PING_HISTORY_LIMIT: u64 = 100;

/// Operator-declared metadata stored in the instance `infos` column.
///
/// `prohibited_content` stays an `Option` because its presence is what
/// qualifies an instance for fractional scoring; an empty declared list
/// and an absent one behave differently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstanceInfos {
    pub opt_out: bool,
    pub languages: Vec<String>,
    pub no_other_languages: bool,
    pub prohibited_content: Option<Vec<String>>,
    pub other_prohibited_content: Vec<String>,
    pub theme: Option<String>,
    pub categories: Vec<String>,
    pub short_description: Option<String>,
    pub full_description: Option<String>,
}

/// Filter criteria for a discovery query.
#[derive(Debug, Clone, Default)]
pub struct ListCriteria {
    /// Language codes the instance should declare.
    pub languages: Vec<String>,
    /// Content categories the instance should prohibit.
    pub prohibited: Vec<String>,
    /// Content categories the instance should not prohibit.
    pub allowed: Vec<String>,
    /// Inclusive lower bound on the user count.
    pub min_users: Option<i64>,
    /// Inclusive upper bound on the user count.
    pub max_users: Option<i64>,
    /// Raw, case-sensitive regular expression matched against names and
    /// declared descriptions.
    pub search: Option<String>,
    /// Exact filtering instead of relevance scoring.
    pub strict: bool,
}

/// One instance as returned by a discovery query.
#[derive(Debug, Clone, Serialize)]
pub struct ListedInstance {
    pub name: String,
    pub uptime: f64,
    pub uptime_str: String,
    pub up: bool,
    pub dead: bool,
    pub ipv6: bool,
    pub users: Option<i64>,
    pub statuses: Option<String>,
    pub connections: Option<i64>,
    #[serde(rename = "openRegistrations")]
    pub open_registrations: bool,
    pub version: Option<String>,
    pub https_score: i32,
    pub https_rank: Option<String>,
    pub obs_score: i32,
    pub obs_rank: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infos: Option<InstanceInfos>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_str: Option<String>,
}

/// Response of a discovery query: matches plus the vocabularies the
/// filter UI needs.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub instances: Vec<ListedInstance>,
    pub languages: &'static [VocabEntry],
    #[serde(rename = "prohibitedContent")]
    pub prohibited_content: &'static [VocabEntry],
}

/// One instance as ranked by the legacy listing.
#[derive(Debug, Clone, Serialize)]
pub struct RankedInstance {
    pub name: String,
    pub uptime_str: String,
    pub up: bool,
    pub ipv6: bool,
    pub users: Option<i64>,
    pub version: Option<String>,
    #[serde(rename = "openRegistrations")]
    pub open_registrations: bool,
    pub https_score: Option<i32>,
    pub https_rank: Option<String>,
    pub obs_score: Option<i32>,
    pub obs_rank: Option<String>,
    pub score: f64,
}

/// Response of the legacy ranking.
#[derive(Debug, Serialize)]
pub struct LegacyListResponse {
    pub instances: Vec<RankedInstance>,
    #[serde(rename = "totalUsers")]
    pub total_users: i64,
    #[serde(rename = "totalUpUsers")]
    pub total_up_users: i64,
    #[serde(rename = "totalUp")]
    pub total_up: i64,
}

/// One instance in the machine-readable export feed. Field set is fixed;
/// external consumers depend on it.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedInstance {
    pub name: String,
    pub title: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub uptime: f64,
    pub up: bool,
    pub https_score: Option<i32>,
    pub https_rank: Option<String>,
    pub ipv6: bool,
    #[serde(rename = "openRegistrations")]
    pub open_registrations: bool,
    pub users: Option<i64>,
    pub statuses: Option<String>,
    pub connections: Option<i64>,
}

/// Ping history for one instance.
#[derive(Debug, Serialize)]
pub struct PingHistory {
    pub instance: String,
    pub pings: Vec<PingEntry>,
}

/// One liveness sample with its measurements.
#[derive(Debug, Clone, Serialize)]
pub struct PingEntry {
    pub up: bool,
    pub latency_ms: Option<i32>,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
    pub probes: Vec<ProbeEntry>,
}

/// One measurement belonging to a ping.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeEntry {
    pub kind: String,
    pub success: bool,
    pub detail: Option<String>,
    pub latency_ms: Option<i32>,
}

/// Directory service: read-only queries over the instance registry.
#[derive(Clone)]
pub struct DirectoryService {
    instance_repo: InstanceRepository,
    ping_repo: PingRepository,
}

impl DirectoryService {
    /// Create a new directory service.
    #[must_use]
    pub const fn new(instance_repo: InstanceRepository, ping_repo: PingRepository) -> Self {
        Self {
            instance_repo,
            ping_repo,
        }
    }

    /// Run a discovery query.
    ///
    /// Strict mode applies every criterion as an exact filter and returns
    /// matches in registry order. Loose mode filters only on the base
    /// predicate plus language overlap, scores the survivors against the
    /// criteria, and returns them shuffled then sorted by descending
    /// score, so equally-scored instances rotate between requests.
    pub async fn list(&self, criteria: &ListCriteria) -> AppResult<ListResponse> {
        let search = match &criteria.search {
            Some(pattern) => Some(
                Regex::new(pattern)
                    .map_err(|e| AppError::Validation(format!("invalid search pattern: {e}")))?,
            ),
            None => None,
        };

        let rows = self.instance_repo.find_discoverable(!criteria.strict).await?;

        // Any info-dependent criterion excludes rows without declared infos.
        let info_needed = !criteria.languages.is_empty()
            || !criteria.prohibited.is_empty()
            || !criteria.allowed.is_empty();

        let mut listed = Vec::new();
        for model in rows {
            let infos = parse_infos(&model);

            if infos.as_ref().is_some_and(|i| i.opt_out) {
                continue;
            }
            if info_needed && infos.is_none() {
                continue;
            }
            if !matches_languages(criteria, infos.as_ref()) {
                continue;
            }
            if criteria.strict && !matches_strict(criteria, &model, infos.as_ref()) {
                continue;
            }
            if let Some(re) = &search {
                if !matches_search(re, &model, infos.as_ref()) {
                    continue;
                }
            }

            let score = if criteria.strict {
                None
            } else {
                Some(loose_score(criteria, model.users, infos.as_ref()))
            };

            listed.push(to_listed(&model, infos, score));
        }

        if !criteria.strict {
            listed.shuffle(&mut rand::thread_rng());
            listed.sort_by(|a, b| {
                b.score
                    .unwrap_or(0.0)
                    .total_cmp(&a.score.unwrap_or(0.0))
            });
        }

        Ok(ListResponse {
            instances: listed,
            languages: vocab::LANGUAGES,
            prohibited_content: vocab::PROHIBITED_CONTENT,
        })
    }

    /// The legacy ranked listing, scored on lifetime uptime, security
    /// grades, and IPv6 support.
    pub async fn legacy_list(&self) -> AppResult<LegacyListResponse> {
        let rows = self.instance_repo.find_established().await?;

        let mut total_users = 0;
        let mut total_up_users = 0;
        let mut total_up = 0;

        let mut instances: Vec<RankedInstance> = rows
            .into_iter()
            .map(|model| {
                let mut score = 50.0 * model.uptime_all;
                score += f64::from(model.https_score.unwrap_or(0)) / 5.0;
                score += f64::from(model.obs_score.unwrap_or(0)) / 5.0;
                if model.ipv6 {
                    score += 10.0;
                }

                if model.up {
                    total_up += 1;
                }
                if let Some(users) = model.users {
                    total_users += users;
                    if model.up {
                        total_up_users += users;
                    }
                }

                RankedInstance {
                    name: model.name,
                    uptime_str: format!("{:.3}", model.uptime_all * 100.0),
                    up: model.up,
                    ipv6: model.ipv6,
                    users: model.users,
                    version: model.version,
                    open_registrations: model.open_registrations,
                    https_score: model.https_score,
                    https_rank: model.https_rank,
                    obs_score: model.obs_score,
                    obs_rank: model.obs_rank,
                    score,
                }
            })
            .collect();

        instances.sort_by(|a, b| b.score.total_cmp(&a.score));

        Ok(LegacyListResponse {
            instances,
            total_users,
            total_up_users,
            total_up,
        })
    }

    /// The machine-readable export feed over all active instances.
    pub async fn export(&self) -> AppResult<Vec<ExportedInstance>> {
        let rows = self.instance_repo.find_active().await?;

        Ok(rows
            .into_iter()
            .map(|model| ExportedInstance {
                name: model.name,
                title: model.title,
                short_description: model.short_description,
                description: model.description,
                uptime: model.uptime_all,
                up: model.up,
                https_score: model.https_score,
                https_rank: model.https_rank,
                ipv6: model.ipv6,
                open_registrations: model.open_registrations,
                users: model.users,
                statuses: model.statuses,
                connections: model.connections,
            })
            .collect())
    }

    /// The latest pings for one instance, newest first.
    pub async fn recent_pings(&self, name: &str) -> AppResult<PingHistory> {
        let instance = self.instance_repo.get_by_name(name).await?;
        let pings = self
            .ping_repo
            .find_recent_with_probes(&instance.id, PING_HISTORY_LIMIT)
            .await?;

        Ok(PingHistory {
            instance: instance.name,
            pings: pings
                .into_iter()
                .map(|(ping, probes)| PingEntry {
                    up: ping.up,
                    latency_ms: ping.latency_ms,
                    created_at: ping.created_at,
                    probes: probes
                        .into_iter()
                        .map(|p| ProbeEntry {
                            kind: p.kind,
                            success: p.success,
                            detail: p.detail,
                            latency_ms: p.latency_ms,
                        })
                        .collect(),
                })
                .collect(),
        })
    }
}

fn parse_infos(model: &instance::Model) -> Option<InstanceInfos> {
    model
        .infos
        .as_ref()
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

fn contains(list: &[String], value: &str) -> bool {
    list.iter().any(|v| v == value)
}

/// Language criterion. Loose mode wants any overlap, strict mode wants
/// every requested language declared.
fn matches_languages(criteria: &ListCriteria, infos: Option<&InstanceInfos>) -> bool {
    if criteria.languages.is_empty() {
        return true;
    }
    let Some(infos) = infos else {
        return false;
    };

    if criteria.strict {
        criteria
            .languages
            .iter()
            .all(|l| contains(&infos.languages, l))
    } else {
        criteria
            .languages
            .iter()
            .any(|l| contains(&infos.languages, l))
    }
}

/// Strict-mode containment filters beyond languages.
fn matches_strict(
    criteria: &ListCriteria,
    model: &instance::Model,
    infos: Option<&InstanceInfos>,
) -> bool {
    let declared: &[String] = infos
        .and_then(|i| i.prohibited_content.as_deref())
        .unwrap_or(&[]);

    if !criteria.prohibited.is_empty() && !criteria.prohibited.iter().all(|c| contains(declared, c))
    {
        return false;
    }
    if criteria.allowed.iter().any(|c| contains(declared, c)) {
        return false;
    }

    if let Some(min) = criteria.min_users {
        if !model.users.is_some_and(|u| u >= min) {
            return false;
        }
    }
    if let Some(max) = criteria.max_users {
        if !model.users.is_some_and(|u| u <= max) {
            return false;
        }
    }

    true
}

/// Search pattern applied over the name and the declared descriptions,
/// case-sensitively.
fn matches_search(re: &Regex, model: &instance::Model, infos: Option<&InstanceInfos>) -> bool {
    if re.is_match(&model.name) {
        return true;
    }
    let Some(infos) = infos else {
        return false;
    };

    infos
        .short_description
        .as_deref()
        .is_some_and(|s| re.is_match(s))
        || infos
            .full_description
            .as_deref()
            .is_some_and(|s| re.is_match(s))
        || infos.theme.as_deref().is_some_and(|s| re.is_match(s))
        || infos.categories.iter().any(|c| re.is_match(c))
}

/// Loose-mode relevance score: ten times the raw sum of per-criterion
/// fractions. The sum is deliberately not normalized by the number of
/// criteria, so more criteria can only raise a score.
fn loose_score(criteria: &ListCriteria, users: Option<i64>, infos: Option<&InstanceInfos>) -> f64 {
    let mut score = 0.0;

    // Fractional criteria only count for instances that declare a
    // prohibited-content list, even the language fraction. User bounds
    // below count for every instance.
    if let Some(infos) = infos {
        if let Some(declared) = &infos.prohibited_content {
            if !criteria.languages.is_empty() {
                let hits = criteria
                    .languages
                    .iter()
                    .filter(|l| contains(&infos.languages, l))
                    .count();
                score += hits as f64 / criteria.languages.len() as f64;
            }

            if !criteria.allowed.is_empty() {
                let hits = criteria
                    .allowed
                    .iter()
                    .filter(|c| !contains(declared, c))
                    .count();
                score += hits as f64 / criteria.allowed.len() as f64;
            }

            if !criteria.prohibited.is_empty() {
                let hits = criteria
                    .prohibited
                    .iter()
                    .filter(|c| contains(declared, c))
                    .count();
                score += hits as f64 / criteria.prohibited.len() as f64;
            }
        }
    }

    if let Some(min) = criteria.min_users {
        if users.is_some_and(|u| u >= min) {
            score += 1.0;
        }
    }
    if let Some(max) = criteria.max_users {
        if users.is_some_and(|u| u <= max) {
            score += 1.0;
        }
    }

    10.0 * score
}

fn to_listed(
    model: &instance::Model,
    infos: Option<InstanceInfos>,
    score: Option<f64>,
) -> ListedInstance {
    ListedInstance {
        name: model.name.clone(),
        uptime: model.uptime,
        uptime_str: format!("{:.3}", model.uptime * 100.0),
        up: model.up,
        dead: model.dead,
        ipv6: model.ipv6,
        users: model.users,
        statuses: model.statuses.clone(),
        connections: model.connections,
        open_registrations: model.open_registrations,
        version: model.version.clone(),
        https_score: model.https_score.unwrap_or(0),
        https_rank: model.https_rank.clone(),
        obs_score: model.obs_score.unwrap_or(0),
        obs_rank: model.obs_rank.clone(),
        infos,
        score,
        score_str: score.map(|s| format!("{:.1}", s.floor())),
    }
}
