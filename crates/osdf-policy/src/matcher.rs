//! Matching of demands against grouped policies.

use crate::payload::PolicyPayload;
use crate::PolicyError;
use osdf_types::{MatchedPolicyEntry, Policy};
use std::collections::{HashMap, HashSet};

/// How a policy scope is compared with the demand names of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchType {
	/// Scope members that are also demands.
	#[default]
	Intersection,
	/// The whole scope, only when every member is a demand.
	All,
	/// The whole scope, when at least one member is a demand.
	Any,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultShape {
	/// Entries carry the type-specific properties.
	#[default]
	Decorated,
	/// Entries carry only type and demands.
	DemandsOnly,
}

/// Demand names a policy scope resolves to, or `None` when nothing matches.
///
/// Names present in the request are returned with the request's spelling.
/// An empty scope resolves to every demand.
pub fn resolve_demands(
	scope: &[String],
	demand_names: &[String],
	match_type: MatchType,
) -> Option<Vec<String>> {
	if scope.is_empty() {
		return (!demand_names.is_empty()).then(|| demand_names.to_vec());
	}

	let lookup = |member: &str| {
		demand_names
			.iter()
			.find(|name| name.eq_ignore_ascii_case(member))
	};

	let mut resolved: Vec<String> = Vec::with_capacity(scope.len());
	let mut push = |name: &str| {
		if !resolved.iter().any(|seen| seen.eq_ignore_ascii_case(name)) {
			resolved.push(name.to_string());
		}
	};

	match match_type {
		MatchType::Intersection => {
			for member in scope {
				if let Some(name) = lookup(member) {
					push(name.as_str());
				}
			}
		}
		MatchType::All => {
			if !scope.iter().all(|member| lookup(member).is_some()) {
				return None;
			}
			for member in scope {
				if let Some(name) = lookup(member) {
					push(name.as_str());
				}
			}
		}
		MatchType::Any => {
			if !scope.iter().any(|member| lookup(member).is_some()) {
				return None;
			}
			for member in scope {
				match lookup(member) {
					Some(name) => push(name.as_str()),
					None => push(member.as_str()),
				}
			}
		}
	}

	(!resolved.is_empty()).then_some(resolved)
}

/// Pairs policies with the demands they govern.
#[derive(Debug, Clone, Default)]
pub struct PolicyMatcher {
	/// Attribute-policy key renames for `evaluate`.
	evaluate_table: Vec<(String, String)>,
}

impl PolicyMatcher {
	pub fn new(evaluate_table: Vec<(String, String)>) -> Self {
		Self { evaluate_table }
	}

	/// Matches `policies` (all of one kind, in priority order from grouping)
	/// against `demand_names`.
	///
	/// A default policy yields one entry per demand. Specific policies displace
	/// default entries for every demand they cover, and a default policy never
	/// displaces a specific one. Between defaults, the last one wins the demand.
	pub fn match_policies<'a, I>(
		&self,
		demand_names: &[String],
		policies: I,
		match_type: MatchType,
		shape: ResultShape,
	) -> Result<Vec<MatchedPolicyEntry>, PolicyError>
	where
		I: IntoIterator<Item = &'a Policy>,
	{
		let mut slots: Vec<Option<MatchedPolicyEntry>> = Vec::new();
		let mut default_slots: HashMap<String, usize> = HashMap::new();
		let mut covered: HashSet<String> = HashSet::new();

		for policy in policies {
			let Some(kind) = policy.kind() else {
				tracing::debug!(policy = %policy.identity, "Skipping policy with unrecognised type");
				continue;
			};
			let Some(demands) = resolve_demands(&policy.resources, demand_names, match_type)
			else {
				continue;
			};
			let properties = match shape {
				ResultShape::Decorated => PolicyPayload::decode(policy)?
					.constraint_properties(&policy.identity, &self.evaluate_table)?,
				ResultShape::DemandsOnly => None,
			};
			let entry = |demand_names: Vec<String>, from_default: bool| MatchedPolicyEntry {
				resource_identity: policy.identity.clone(),
				constraint_type: kind.as_str().to_string(),
				demand_names,
				properties: properties.clone(),
				from_default,
			};

			if policy.is_default() {
				for demand in demands {
					let key = demand.to_ascii_lowercase();
					if covered.contains(&key) {
						continue;
					}
					let slot = Some(entry(vec![demand], true));
					match default_slots.get(&key) {
						Some(&index) => slots[index] = slot,
						None => {
							default_slots.insert(key, slots.len());
							slots.push(slot);
						}
					}
				}
			} else {
				for demand in &demands {
					let key = demand.to_ascii_lowercase();
					if let Some(index) = default_slots.remove(&key) {
						slots[index] = None;
					}
					covered.insert(key);
				}
				slots.push(Some(entry(demands, false)));
			}
		}

		Ok(slots.into_iter().flatten().collect())
	}
}
