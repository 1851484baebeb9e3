//! Snapshot types and their JSON / URL-query codecs.
//!
//! Every manager exposes `capture_state()` → one of the types below and
//! `restore_state(&snapshot)` (which notifies once). The types themselves
//! carry the serialisation surface:
//!
//! - `to_json` / `from_json` — canonical JSON shapes,
//! - `to_query_string` / `from_query_string` — URL forms,
//! - `from_*` is **infallible**: malformed or unknown input yields the
//!   empty snapshot, and unrecognised query keys are ignored (so one
//!   combined query string can feed every manager).
//!
//! Canonical shapes:
//!
//! ```text
//! filter      [{"id":"cat","values":["A","B"]}]        filter.cat=A,B
//! sort        [{"id":"prio","order":"asc"}]            sort=prio:asc,title:desc
//! group       {"activeIds":["a","b"],"orders":{...}}   group=a,b
//! pagination  {"offsets":{"trailing":20}}              page.trailing=20
//! ```
//!
//! All query values are percent-encoded. [`ViewState`] bundles the four
//! per-manager snapshots into one capture with the same four surfaces plus
//! file helpers.

use crate::sort::SortDirection;
use crate::utils::{decode_query_component, encode_query_component, parse_query_pairs};
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

fn lenient_from_json<S: Default + DeserializeOwned>(json: &str) -> S {
    serde_json::from_str(json).unwrap_or_default()
}

/// Active values of one filter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// The filter's id.
    pub id: String,
    /// Active values in activation order, string-encoded.
    pub values: Vec<String>,
}

/// Captured state of a [`FilterManager`](crate::FilterManager): the active
/// criteria of every codec-bearing filter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSnapshot {
    /// One entry per filter with active values.
    pub criteria: Vec<FilterCriteria>,
}

impl FilterSnapshot {
    /// True if no criteria are captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Serialise to canonical JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }

    /// Parse from JSON; malformed input yields the empty snapshot.
    #[must_use]
    pub fn from_json(json: &str) -> Self {
        lenient_from_json(json)
    }

    /// Encode as `filter.<id>=v1,v2` pairs joined with `&`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.criteria
            .iter()
            .map(|c| {
                let values = c
                    .values
                    .iter()
                    .map(|v| encode_query_component(v))
                    .collect::<Vec<_>>()
                    .join(",");
                format!("filter.{}={values}", encode_query_component(&c.id))
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parse every `filter.*` pair out of a query string; other keys are
    /// ignored.
    #[must_use]
    pub fn from_query_string(query: &str) -> Self {
        let criteria = parse_query_pairs(query)
            .into_iter()
            .filter_map(|(key, raw)| {
                let id = key.strip_prefix("filter.")?;
                let values: Vec<String> = raw
                    .split(',')
                    .filter(|v| !v.is_empty())
                    .map(decode_query_component)
                    .collect();
                if values.is_empty() {
                    return None;
                }
                Some(FilterCriteria {
                    id: id.to_string(),
                    values,
                })
            })
            .collect();
        Self { criteria }
    }
}

/// Id and direction of one sort option.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCriteria {
    /// The option's id.
    pub id: String,
    /// The option's direction.
    pub order: SortDirection,
}

/// Captured state of a [`SortManager`](crate::SortManager): the active
/// options primary-first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSnapshot {
    /// One entry per registered option, primary first.
    pub criteria: Vec<SortCriteria>,
}

impl SortSnapshot {
    /// True if no criteria are captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Serialise to canonical JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }

    /// Parse from JSON; malformed input yields the empty snapshot.
    #[must_use]
    pub fn from_json(json: &str) -> Self {
        lenient_from_json(json)
    }

    /// Encode as `sort=<id>:asc[,<id2>:desc]`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        if self.criteria.is_empty() {
            return String::new();
        }
        let entries = self
            .criteria
            .iter()
            .map(|c| {
                let dir = match c.order {
                    SortDirection::Asc => "asc",
                    SortDirection::Desc => "desc",
                };
                format!("{}:{dir}", encode_query_component(&c.id))
            })
            .collect::<Vec<_>>()
            .join(",");
        format!("sort={entries}")
    }

    /// Parse the `sort` pair out of a query string; entries with an
    /// unrecognised direction are skipped.
    #[must_use]
    pub fn from_query_string(query: &str) -> Self {
        let criteria = parse_query_pairs(query)
            .into_iter()
            .filter(|(key, _)| key == "sort")
            .flat_map(|(_, raw)| {
                raw.split(',')
                    .filter_map(|entry| {
                        let (id, dir) = entry.rsplit_once(':')?;
                        let order = match dir {
                            "asc" => SortDirection::Asc,
                            "desc" => SortDirection::Desc,
                            _ => return None,
                        };
                        Some(SortCriteria {
                            id: decode_query_component(id),
                            order,
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { criteria }
    }
}

/// Captured state of a [`GroupManager`](crate::GroupManager).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupSnapshot {
    /// Enabled option ids in level order.
    pub active_ids: Vec<String>,
    /// `order` value per registered option id (enabled or not).
    pub orders: BTreeMap<String, i64>,
}

impl GroupSnapshot {
    /// True if nothing is captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active_ids.is_empty() && self.orders.is_empty()
    }

    /// Serialise to canonical JSON (`{"activeIds":[...],"orders":{...}}`).
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Parse from JSON; malformed input yields the empty snapshot.
    #[must_use]
    pub fn from_json(json: &str) -> Self {
        lenient_from_json(json)
    }

    /// Encode as `group=<id1>,<id2>`; positions carry the ordering, so the
    /// `orders` map is not part of the URL form (documented loss: explicit
    /// order values are reconstructed from positions on parse).
    #[must_use]
    pub fn to_query_string(&self) -> String {
        if self.active_ids.is_empty() {
            return String::new();
        }
        let ids = self
            .active_ids
            .iter()
            .map(|id| encode_query_component(id))
            .collect::<Vec<_>>()
            .join(",");
        format!("group={ids}")
    }

    /// Parse the `group` pair out of a query string; orders are assigned
    /// from positions.
    #[must_use]
    pub fn from_query_string(query: &str) -> Self {
        let active_ids: Vec<String> = parse_query_pairs(query)
            .into_iter()
            .filter(|(key, _)| key == "group")
            .flat_map(|(_, raw)| {
                raw.split(',')
                    .filter(|id| !id.is_empty())
                    .map(decode_query_component)
                    .collect::<Vec<_>>()
            })
            .collect();
        let orders = active_ids
            .iter()
            .enumerate()
            .map(|(position, id)| (id.clone(), position as i64))
            .collect();
        Self { active_ids, orders }
    }
}

/// Captured state of a [`PaginationState`](crate::PaginationState): offset
/// tokens only (cursor tokens are session-bound and skipped).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationSnapshot {
    /// Offset per edge id.
    pub offsets: BTreeMap<String, u64>,
}

impl PaginationSnapshot {
    /// True if no offsets are captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Serialise to canonical JSON (`{"offsets":{...}}`).
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Parse from JSON; malformed input yields the empty snapshot.
    #[must_use]
    pub fn from_json(json: &str) -> Self {
        lenient_from_json(json)
    }

    /// Encode as `page.<id>=<offset>` pairs joined with `&`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.offsets
            .iter()
            .map(|(id, offset)| format!("page.{}={offset}", encode_query_component(id)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parse every `page.*` pair out of a query string; non-numeric offsets
    /// are skipped.
    #[must_use]
    pub fn from_query_string(query: &str) -> Self {
        let offsets = parse_query_pairs(query)
            .into_iter()
            .filter_map(|(key, raw)| {
                let id = key.strip_prefix("page.")?;
                let offset = decode_query_component(&raw).parse().ok()?;
                Some((id.to_string(), offset))
            })
            .collect();
        Self { offsets }
    }
}

/// Combined capture of all four managers: one struct, one query string, one
/// file.
///
/// The query form is the `&`-joined concatenation of the per-manager forms;
/// since every `from_query_string` ignores foreign keys, the same string can
/// also be fed to the managers piecemeal.
///
/// # Example
/// ```
/// use slotline::snapshot::ViewState;
///
/// let q = "filter.cat=A&sort=prio:asc&group=cat,prio&page.trailing=20";
/// let view = ViewState::from_query_string(q);
/// assert_eq!(view.filters.criteria[0].values, vec!["A".to_string()]);
/// assert_eq!(view.groups.active_ids, vec!["cat".to_string(), "prio".to_string()]);
/// assert_eq!(view.to_query_string(), q);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    /// Filter criteria.
    pub filters: FilterSnapshot,
    /// Sort criteria.
    pub sorts: SortSnapshot,
    /// Grouping state.
    pub groups: GroupSnapshot,
    /// Pagination offsets.
    pub pagination: PaginationSnapshot,
}

impl ViewState {
    /// True if every component snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
            && self.sorts.is_empty()
            && self.groups.is_empty()
            && self.pagination.is_empty()
    }

    /// Serialise to JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Parse from JSON; malformed input yields the empty state.
    #[must_use]
    pub fn from_json(json: &str) -> Self {
        lenient_from_json(json)
    }

    /// Concatenate the non-empty per-manager query forms.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        [
            self.filters.to_query_string(),
            self.sorts.to_query_string(),
            self.groups.to_query_string(),
            self.pagination.to_query_string(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("&")
    }

    /// Parse a combined query string.
    #[must_use]
    pub fn from_query_string(query: &str) -> Self {
        Self {
            filters: FilterSnapshot::from_query_string(query),
            sorts: SortSnapshot::from_query_string(query),
            groups: GroupSnapshot::from_query_string(query),
            pagination: PaginationSnapshot::from_query_string(query),
        }
    }

    /// Write the state to a file as pretty-printed JSON.
    ///
    /// # Errors
    /// Any I/O or serialisation failure, with path context attached.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing view state")?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("writing view state to {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Read a state back from a file written by
    /// [`save_to_file`](Self::save_to_file). The file must exist and be
    /// readable; malformed *content* still yields the empty state.
    ///
    /// # Errors
    /// Any I/O failure, with path context attached.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading view state from {}", path.as_ref().display()))?;
        Ok(Self::from_json(&json))
    }
}
