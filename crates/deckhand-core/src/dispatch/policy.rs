//! Capability policy for fragment execution: first-match-wins, default-deny.

use serde::{Deserialize, Serialize};

use super::capability::DocumentCapability;
use super::error::DispatchError;

/// A single rule that matches a capability and yields a verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyRule {
    Allow {
        capability: DocumentCapability,
    },
    Deny {
        capability: DocumentCapability,
        reason: String,
    },
}

impl PolicyRule {
    pub fn matches(&self, capability: DocumentCapability) -> bool {
        match self {
            PolicyRule::Allow { capability: c } | PolicyRule::Deny { capability: c, .. } => {
                *c == capability
            }
        }
    }

    pub fn verdict(&self) -> PolicyVerdict {
        match self {
            PolicyRule::Allow { .. } => PolicyVerdict::Allowed,
            PolicyRule::Deny { reason, .. } => PolicyVerdict::Denied {
                reason: reason.clone(),
            },
        }
    }
}

/// Outcome of evaluating a capability against a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyVerdict {
    Allowed,
    Denied { reason: String },
}

impl PolicyVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyVerdict::Allowed)
    }
}

/// An ordered rule set evaluated first-match-wins.
///
/// If no rule matches, the capability is **denied**.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapabilityPolicy {
    pub rules: Vec<PolicyRule>,
}

impl Default for CapabilityPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl CapabilityPolicy {
    /// Deny everything.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: PolicyRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Every capability except [`DocumentCapability::CrossSlide`]: a unit
    /// may do anything to its own slide and nothing to the others.
    pub fn standard() -> Self {
        let mut policy = Self::empty();
        for capability in DocumentCapability::ALL {
            policy = policy.with_rule(match capability {
                DocumentCapability::CrossSlide => PolicyRule::Deny {
                    capability,
                    reason: "fragments may only touch their own slide".into(),
                },
                _ => PolicyRule::Allow { capability },
            });
        }
        policy
    }

    /// Every capability, cross-slide access included.
    pub fn permissive() -> Self {
        DocumentCapability::ALL
            .into_iter()
            .fold(Self::empty(), |policy, capability| {
                policy.with_rule(PolicyRule::Allow { capability })
            })
    }

    pub fn evaluate(&self, capability: DocumentCapability) -> PolicyVerdict {
        for rule in &self.rules {
            if rule.matches(capability) {
                return rule.verdict();
            }
        }

        PolicyVerdict::Denied {
            reason: format!("no policy rule matched capability={capability}"),
        }
    }

    /// `Ok` when allowed, otherwise [`DispatchError::PolicyDenied`].
    pub fn check(&self, capability: DocumentCapability) -> Result<(), DispatchError> {
        match self.evaluate(capability) {
            PolicyVerdict::Allowed => Ok(()),
            PolicyVerdict::Denied { reason } => Err(DispatchError::PolicyDenied {
                reason: format!("{capability}: {reason}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_deny_when_no_rules() {
        let policy = CapabilityPolicy::empty();
        assert!(!policy.evaluate(DocumentCapability::ReadShapes).is_allowed());
    }

    #[test]
    fn test_first_match_wins() {
        let policy = CapabilityPolicy::empty()
            .with_rule(PolicyRule::Deny {
                capability: DocumentCapability::DeleteShapes,
                reason: "denied first".into(),
            })
            .with_rule(PolicyRule::Allow {
                capability: DocumentCapability::DeleteShapes,
            });

        match policy.evaluate(DocumentCapability::DeleteShapes) {
            PolicyVerdict::Denied { reason } => assert!(reason.contains("denied first")),
            other => panic!("expected Denied, got {:?}", other),
        }
    }

    #[test]
    fn test_standard_denies_only_cross_slide() {
        let policy = CapabilityPolicy::standard();
        for cap in DocumentCapability::ALL {
            let allowed = policy.evaluate(cap).is_allowed();
            assert_eq!(allowed, cap != DocumentCapability::CrossSlide, "{cap}");
        }
    }

    #[test]
    fn test_permissive_allows_all() {
        let policy = CapabilityPolicy::permissive();
        assert!(DocumentCapability::ALL
            .into_iter()
            .all(|cap| policy.evaluate(cap).is_allowed()));
    }

    #[test]
    fn test_check_names_capability() {
        let err = CapabilityPolicy::standard()
            .check(DocumentCapability::CrossSlide)
            .unwrap_err();
        assert!(err.to_string().contains("cross_slide"));
    }

    #[test]
    fn test_policy_serde_roundtrip() {
        let policy = CapabilityPolicy::standard();
        let json = serde_json::to_string(&policy).unwrap();
        let back: CapabilityPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(policy, back);
    }
}
