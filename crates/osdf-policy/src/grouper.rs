//! Deduplication and prioritisation of policies by (type, resource).
//!
//! Every policy competes in one bucket per scope member (a default policy
//! competes in the type's default bucket). The highest priority wins a bucket,
//! ties go to the policy seen first. Each winning identity is kept once, under
//! the first bucket of its own scope that it won.

use crate::parse::parse_policies;
use crate::PolicyError;
use osdf_types::{Policy, PolicyKind, RawPolicy};
use std::collections::{HashMap, HashSet};

/// Bucket key inside one policy kind. `None` is the default bucket.
type BucketKey = Option<String>;

/// A surviving policy and the resource it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedPolicy {
	/// Resource spelling taken from the policy scope; `None` for a default policy.
	pub resource: Option<String>,
	pub policy: Policy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyGroup {
	pub kind: PolicyKind,
	pub entries: Vec<GroupedPolicy>,
}

/// Result of grouping: kinds in first-encounter order, each with its
/// surviving policies in the order they were supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyGroups {
	groups: Vec<PolicyGroup>,
}

impl PolicyGroups {
	pub fn groups(&self) -> &[PolicyGroup] {
		&self.groups
	}

	pub fn group(&self, kind: PolicyKind) -> Option<&PolicyGroup> {
		self.groups.iter().find(|group| group.kind == kind)
	}

	/// Surviving policies of one kind.
	pub fn policies_of(&self, kind: PolicyKind) -> Vec<&Policy> {
		self.group(kind)
			.map(|group| group.entries.iter().map(|entry| &entry.policy).collect())
			.unwrap_or_default()
	}

	/// The surviving policy stored under `(kind, resource)`, compared
	/// case-insensitively. `None` as resource looks up the default bucket.
	pub fn get(&self, kind: PolicyKind, resource: Option<&str>) -> Option<&Policy> {
		let group = self.group(kind)?;
		group
			.entries
			.iter()
			.find(|entry| match (&entry.resource, resource) {
				(Some(stored), Some(wanted)) => stored.eq_ignore_ascii_case(wanted),
				(None, None) => true,
				_ => false,
			})
			.map(|entry| &entry.policy)
	}

	/// All surviving policies, kind by kind.
	pub fn flatten(&self) -> Vec<Policy> {
		self.groups
			.iter()
			.flat_map(|group| group.entries.iter().map(|entry| entry.policy.clone()))
			.collect()
	}

	pub fn len(&self) -> usize {
		self.groups.iter().map(|group| group.entries.len()).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PolicyGrouper;

impl PolicyGrouper {
	pub fn new() -> Self {
		Self
	}

	/// Parses raw records, then groups them.
	pub fn group_raw(&self, raw_policies: &[RawPolicy]) -> Result<PolicyGroups, PolicyError> {
		let policies = parse_policies(raw_policies)?;
		Ok(self.group(&policies))
	}

	pub fn group(&self, policies: &[Policy]) -> PolicyGroups {
		let mut kinds: Vec<PolicyKind> = Vec::new();
		// Bucket to the input index of its current winner.
		let mut buckets: HashMap<(PolicyKind, BucketKey), usize> = HashMap::new();

		for (index, policy) in policies.iter().enumerate() {
			let Some(kind) = policy.kind() else {
				tracing::debug!(
					policy = %policy.identity,
					policy_type = %policy.policy_type,
					"Dropping policy with unrecognised type"
				);
				continue;
			};
			if !kinds.contains(&kind) {
				kinds.push(kind);
			}

			for key in bucket_keys(policy) {
				let winner = buckets.entry((kind, key)).or_insert(index);
				if policy.priority > policies[*winner].priority {
					*winner = index;
				}
			}
		}

		// For every winner, the buckets it won.
		let mut won: HashMap<usize, Vec<BucketKey>> = HashMap::new();
		for ((_, key), winner) in &buckets {
			won.entry(*winner).or_default().push(key.clone());
		}

		let mut groups: Vec<PolicyGroup> = kinds
			.iter()
			.map(|kind| PolicyGroup {
				kind: *kind,
				entries: Vec::new(),
			})
			.collect();
		let mut emitted: HashSet<&str> = HashSet::new();

		for (index, policy) in policies.iter().enumerate() {
			let Some(wins) = won.get(&index) else {
				continue;
			};
			if !emitted.insert(policy.identity.as_str()) {
				tracing::debug!(policy = %policy.identity, "Skipping duplicate policy identity");
				continue;
			}
			let Some(kind) = policy.kind() else {
				continue;
			};
			let resource = first_won_resource(policy, wins);
			if let Some(group) = groups.iter_mut().find(|group| group.kind == kind) {
				group.entries.push(GroupedPolicy {
					resource,
					policy: policy.clone(),
				});
			}
		}

		groups.retain(|group| !group.entries.is_empty());
		PolicyGroups { groups }
	}
}

fn bucket_keys(policy: &Policy) -> Vec<BucketKey> {
	if policy.is_default() {
		return vec![None];
	}
	let mut keys: Vec<BucketKey> = Vec::with_capacity(policy.resources.len());
	for resource in &policy.resources {
		let key = Some(resource.to_ascii_lowercase());
		if !keys.contains(&key) {
			keys.push(key);
		}
	}
	keys
}

fn first_won_resource(policy: &Policy, wins: &[BucketKey]) -> Option<String> {
	if policy.is_default() {
		return None;
	}
	policy
		.resources
		.iter()
		.find(|resource| {
			wins.iter().any(|key| {
				key.as_deref()
					.is_some_and(|key| key.eq_ignore_ascii_case(resource))
			})
		})
		.cloned()
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn policy(identity: &str, policy_type: &str, priority: i64, resources: &[&str]) -> Policy {
		Policy {
			identity: identity.to_string(),
			policy_type: policy_type.to_string(),
			priority,
			resources: resources.iter().map(|r| r.to_string()).collect(),
			content: json!({}),
		}
	}

	fn identities(groups: &PolicyGroups) -> Vec<String> {
		groups.flatten().into_iter().map(|p| p.identity).collect()
	}

	#[test]
	fn test_highest_priority_wins_bucket() {
		let groups = PolicyGrouper::new().group(&[
			policy("low", "attribute", 1, &["vG"]),
			policy("high", "attribute", 5, &["vg"]),
		]);
		assert_eq!(identities(&groups), vec!["high"]);
		assert_eq!(groups.get(PolicyKind::Attribute, Some("VG")).unwrap().identity, "high");
	}

	#[test]
	fn test_ties_keep_first_encountered() {
		let groups = PolicyGrouper::new().group(&[
			policy("first", "zone", 3, &["vGMux"]),
			policy("second", "zone", 3, &["vGMux"]),
		]);
		assert_eq!(identities(&groups), vec!["first"]);
	}

	#[test]
	fn test_unrecognised_types_are_dropped() {
		let groups = PolicyGrouper::new().group(&[
			policy("license", "licensing", 1, &["vG"]),
			policy("", "", 1, &["vG"]),
		]);
		assert!(groups.is_empty());
	}

	#[test]
	fn test_identity_kept_once_under_first_won_bucket() {
		let groups = PolicyGrouper::new().group(&[
			policy("loser", "attribute", 0, &["vGMux"]),
			policy("wide", "attribute", 9, &["vG", "vGMux"]),
		]);
		let group = groups.group(PolicyKind::Attribute).unwrap();
		assert_eq!(group.entries.len(), 1);
		assert_eq!(group.entries[0].resource.as_deref(), Some("vG"));
	}

	#[test]
	fn test_partial_winner_survives() {
		let groups = PolicyGrouper::new().group(&[
			policy("a", "distance", 10, &["vG", "vGMux"]),
			policy("b", "distance", 5, &["vGMux", "vFW"]),
		]);
		assert_eq!(identities(&groups), vec!["a", "b"]);
		assert_eq!(
			groups.group(PolicyKind::Distance).unwrap().entries[1].resource.as_deref(),
			Some("vFW")
		);
	}

	#[test]
	fn test_default_policies_have_their_own_bucket() {
		let groups = PolicyGrouper::new().group(&[
			policy("default_low", "hpa", 1, &[]),
			policy("specific", "hpa", 0, &["vG"]),
			policy("default_high", "hpa", 2, &[]),
		]);
		assert_eq!(identities(&groups), vec!["specific", "default_high"]);
		assert_eq!(groups.get(PolicyKind::Hpa, None).unwrap().identity, "default_high");
	}

	#[test]
	fn test_kinds_keep_first_encounter_order() {
		let groups = PolicyGrouper::new().group(&[
			policy("z", "zone", 0, &["vG"]),
			policy("a", "attribute", 0, &["vG"]),
			policy("z2", "affinity", 0, &["vFW"]),
		]);
		let kinds: Vec<PolicyKind> = groups.groups().iter().map(|g| g.kind).collect();
		assert_eq!(kinds, vec![PolicyKind::Zone, PolicyKind::Attribute]);
		assert_eq!(groups.policies_of(PolicyKind::Zone).len(), 2);
	}

	#[test]
	fn test_grouping_is_idempotent() {
		let input = vec![
			policy("l", "attribute", 0, &["b"]),
			policy("w", "attribute", 9, &["a", "b"]),
			policy("t1", "zone", 1, &["x"]),
			policy("t2", "zone", 1, &["x", "y"]),
			policy("d1", "zone", 1, &[]),
			policy("d2", "zone", 4, &[]),
			policy("c", "attribute", 3, &["c", "A"]),
			policy("w", "distance", 1, &["a"]),
		];
		let grouper = PolicyGrouper::new();
		let once = grouper.group(&input);
		let twice = grouper.group(&once.flatten());
		assert_eq!(once, twice);
	}

	#[test]
	fn test_group_raw_reports_configuration_errors() {
		let raw = vec![RawPolicy {
			policy_name: "bad".to_string(),
			config: "[".to_string(),
			priority: None,
		}];
		assert!(matches!(
			PolicyGrouper::new().group_raw(&raw),
			Err(PolicyError::Configuration(names)) if names == vec!["bad".to_string()]
		));
	}
}
