//! Manual refinement contract.
//!
//! Interactive refinement (menus, prompts) lives outside this crate. It
//! plugs in through [`ManualRefiner`], receiving the current pairing as a
//! seed and returning a pairing of the same shape. Two implementations ship
//! here: [`KeepSeed`] and [`ScriptedRefiner`], which replays a recorded list
//! of manual decisions without prompting.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::models::{Direction, LocalTrack, Link, Pair, RemoteTrack};

/// A user-driven refinement step. May block for as long as it likes; the
/// engine holds no state while it runs.
pub trait ManualRefiner {
    fn refine<'a>(
        &mut self,
        local: &'a [LocalTrack],
        remote: &'a [RemoteTrack],
        seed: Vec<Pair<'a>>,
        direction: Direction,
    ) -> Result<Vec<Pair<'a>>>;
}

/// Accepts the seed as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeepSeed;

impl ManualRefiner for KeepSeed {
    fn refine<'a>(
        &mut self,
        _local: &'a [LocalTrack],
        _remote: &'a [RemoteTrack],
        seed: Vec<Pair<'a>>,
        _direction: Direction,
    ) -> Result<Vec<Pair<'a>>> {
        Ok(seed)
    }
}

/// One recorded decision: pair `file_path` with `remote_id`, or leave the
/// file unmatched when `remote_id` is absent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ManualOverride {
    pub file_path: String,
    #[serde(default)]
    pub remote_id: Option<String>,
}

/// Applies overrides on top of the seed, in order; later overrides win.
///
/// Whatever a moved element leaves behind becomes one-sided, and any track
/// missing from the seed is added as one-sided, so the result always covers
/// every element exactly once.
#[derive(Debug, Default, Clone)]
pub struct ScriptedRefiner {
    overrides: Vec<ManualOverride>,
}

impl ScriptedRefiner {
    pub fn new(overrides: Vec<ManualOverride>) -> Self {
        Self { overrides }
    }

    /// Load overrides from a JSON array file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let overrides: Vec<ManualOverride> = serde_json::from_str(&text)?;
        Ok(Self::new(overrides))
    }

    pub fn overrides(&self) -> &[ManualOverride] {
        &self.overrides
    }
}

impl ManualRefiner for ScriptedRefiner {
    fn refine<'a>(
        &mut self,
        local: &'a [LocalTrack],
        remote: &'a [RemoteTrack],
        seed: Vec<Pair<'a>>,
        _direction: Direction,
    ) -> Result<Vec<Pair<'a>>> {
        let local_index: FxHashMap<&str, usize> = local
            .iter()
            .enumerate()
            .map(|(i, t)| (t.file_path.as_str(), i))
            .collect();
        let remote_index: FxHashMap<&str, usize> = remote
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();

        let mut links: Vec<Link> = seed
            .iter()
            .map(|p| Link {
                local: p.local.and_then(|t| local_index.get(t.file_path.as_str()).copied()),
                remote: p.remote.and_then(|t| remote_index.get(t.id.as_str()).copied()),
            })
            .filter(|link| link.local.is_some() || link.remote.is_some())
            .collect();

        for o in &self.overrides {
            let l = *local_index
                .get(o.file_path.as_str())
                .ok_or_else(|| ConfigError::UnknownLocalFile(o.file_path.clone()))?;
            let r = match &o.remote_id {
                Some(id) => Some(
                    *remote_index
                        .get(id.as_str())
                        .ok_or_else(|| ConfigError::UnknownRemoteTrack(id.clone()))?,
                ),
                None => None,
            };

            detach_local(&mut links, l);
            if let Some(r) = r {
                detach_remote(&mut links, r);
            }
            links.push(Link { local: Some(l), remote: r });
        }

        fill_missing(&mut links, local.len(), remote.len());

        Ok(links
            .into_iter()
            .filter_map(|link| match (link.local, link.remote) {
                (Some(l), Some(r)) => Some(Pair::matched(&local[l], &remote[r])),
                (Some(l), None) => Some(Pair::local_only(&local[l])),
                (None, Some(r)) => Some(Pair::remote_only(&remote[r])),
                (None, None) => None,
            })
            .collect())
    }
}

/// Remove local `l` from whatever link holds it, keeping its partner as a
/// one-sided link.
fn detach_local(links: &mut Vec<Link>, l: usize) {
    for link in links.iter_mut() {
        if link.local == Some(l) {
            link.local = None;
        }
    }
    links.retain(|link| link.local.is_some() || link.remote.is_some());
}

fn detach_remote(links: &mut Vec<Link>, r: usize) {
    for link in links.iter_mut() {
        if link.remote == Some(r) {
            link.remote = None;
        }
    }
    links.retain(|link| link.local.is_some() || link.remote.is_some());
}

/// Append one-sided links for elements the seed never mentioned.
fn fill_missing(links: &mut Vec<Link>, local_len: usize, remote_len: usize) {
    let mut local_seen = vec![false; local_len];
    let mut remote_seen = vec![false; remote_len];
    for link in links.iter() {
        if let Some(l) = link.local {
            local_seen[l] = true;
        }
        if let Some(r) = link.remote {
            remote_seen[r] = true;
        }
    }
    links.extend(
        remote_seen
            .iter()
            .enumerate()
            .filter(|(_, seen)| !**seen)
            .map(|(r, _)| Link::remote(r)),
    );
    links.extend(
        local_seen
            .iter()
            .enumerate()
            .filter(|(_, seen)| !**seen)
            .map(|(l, _)| Link::local(l)),
    );
}
