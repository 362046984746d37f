//! Stakeholder relationship tracking.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

use crate::state::{GameState, Relationship};

/// Stakeholder group whose mean trust feeds `board_confidence`.
pub const BOARD_GROUP: &str = "board";

/// Categorical stakeholder reaction to a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionLabel {
    VeryNegative,
    Negative,
    SlightlyNegative,
    SlightlyPositive,
    Positive,
    VeryPositive,
}

impl ReactionLabel {
    pub const ALL: &'static [Self] = &[
        Self::VeryNegative,
        Self::Negative,
        Self::SlightlyNegative,
        Self::SlightlyPositive,
        Self::Positive,
        Self::VeryPositive,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VeryNegative => "very_negative",
            Self::Negative => "negative",
            Self::SlightlyNegative => "slightly_negative",
            Self::SlightlyPositive => "slightly_positive",
            Self::Positive => "positive",
            Self::VeryPositive => "very_positive",
        }
    }
}

impl fmt::Display for ReactionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change applied to one relationship for one reaction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReactionDelta {
    pub trust: f64,
    pub alignment: f64,
    pub engagement: f64,
}

impl ReactionDelta {
    #[must_use]
    pub const fn new(trust: f64, alignment: f64, engagement: f64) -> Self {
        Self {
            trust,
            alignment,
            engagement,
        }
    }
}

/// Delta per reaction label. Domains may override individual rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionTable {
    #[serde(default = "ReactionTable::default_very_negative")]
    pub very_negative: ReactionDelta,
    #[serde(default = "ReactionTable::default_negative")]
    pub negative: ReactionDelta,
    #[serde(default = "ReactionTable::default_slightly_negative")]
    pub slightly_negative: ReactionDelta,
    #[serde(default = "ReactionTable::default_slightly_positive")]
    pub slightly_positive: ReactionDelta,
    #[serde(default = "ReactionTable::default_positive")]
    pub positive: ReactionDelta,
    #[serde(default = "ReactionTable::default_very_positive")]
    pub very_positive: ReactionDelta,
}

impl ReactionTable {
    const fn default_very_negative() -> ReactionDelta {
        ReactionDelta::new(-0.15, -0.12, -0.05)
    }

    const fn default_negative() -> ReactionDelta {
        ReactionDelta::new(-0.08, -0.06, -0.02)
    }

    const fn default_slightly_negative() -> ReactionDelta {
        ReactionDelta::new(-0.03, -0.02, 0.0)
    }

    const fn default_slightly_positive() -> ReactionDelta {
        ReactionDelta::new(0.03, 0.02, 0.01)
    }

    const fn default_positive() -> ReactionDelta {
        ReactionDelta::new(0.08, 0.06, 0.03)
    }

    const fn default_very_positive() -> ReactionDelta {
        ReactionDelta::new(0.15, 0.12, 0.05)
    }

    #[must_use]
    pub const fn delta(&self, label: ReactionLabel) -> ReactionDelta {
        match label {
            ReactionLabel::VeryNegative => self.very_negative,
            ReactionLabel::Negative => self.negative,
            ReactionLabel::SlightlyNegative => self.slightly_negative,
            ReactionLabel::SlightlyPositive => self.slightly_positive,
            ReactionLabel::Positive => self.positive,
            ReactionLabel::VeryPositive => self.very_positive,
        }
    }
}

impl Default for ReactionTable {
    fn default() -> Self {
        Self {
            very_negative: Self::default_very_negative(),
            negative: Self::default_negative(),
            slightly_negative: Self::default_slightly_negative(),
            slightly_positive: Self::default_slightly_positive(),
            positive: Self::default_positive(),
            very_positive: Self::default_very_positive(),
        }
    }
}

/// Ordered list of `(stakeholder id, reaction)` pairs. One stakeholder may
/// appear more than once; each occurrence applies.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reactions(SmallVec<[(String, ReactionLabel); 4]>);

impl Reactions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, stakeholder: &str, label: ReactionLabel) -> Self {
        self.push(stakeholder, label);
        self
    }

    pub fn push(&mut self, stakeholder: &str, label: ReactionLabel) {
        self.0.push((stakeholder.to_string(), label));
    }

    pub fn extend_from(&mut self, other: &Self) {
        self.0.extend(other.0.iter().cloned());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ReactionLabel)> {
        self.0.iter().map(|(id, label)| (id.as_str(), *label))
    }
}

impl From<&BTreeMap<String, ReactionLabel>> for Reactions {
    fn from(map: &BTreeMap<String, ReactionLabel>) -> Self {
        Self(map.iter().map(|(id, label)| (id.clone(), *label)).collect())
    }
}

/// Apply reactions to known stakeholders, then refresh confidence aggregates.
///
/// Unknown stakeholder ids are ignored.
pub fn process_stakeholder_reactions(
    state: &mut GameState,
    reactions: &Reactions,
    table: &ReactionTable,
) {
    for (stakeholder, label) in reactions.iter() {
        let Some(relation) = state.relationships.get_mut(stakeholder) else {
            log::trace!("reaction for unknown stakeholder {stakeholder} ignored");
            continue;
        };
        let delta = table.delta(label);
        relation.trust += delta.trust;
        relation.alignment += delta.alignment;
        relation.engagement += delta.engagement;
        relation.clamp();
    }
    refresh_confidence(state);
}

/// Influence-weighted mean trust on a 0-100 scale, optionally for one group.
///
/// Returns `None` when no stakeholder matches or all influence is zero.
#[must_use]
pub fn weighted_trust(
    relationships: &BTreeMap<String, Relationship>,
    group: Option<&str>,
) -> Option<f64> {
    let (weighted, total) = relationships
        .values()
        .filter(|relation| group.is_none_or(|wanted| relation.group == wanted))
        .fold((0.0, 0.0), |(weighted, total), relation| {
            let influence = relation.influence.max(0.0);
            (weighted + relation.trust * influence, total + influence)
        });
    (total > 0.0).then(|| (weighted / total * 100.0).clamp(0.0, 100.0))
}

/// Write stakeholder and (when tracked) board confidence onto the company.
pub fn refresh_confidence(state: &mut GameState) {
    if let Some(confidence) = weighted_trust(&state.relationships, None) {
        state.company.stakeholder_confidence = confidence;
    }
    if state.company.board_confidence.is_some()
        && let Some(board) = weighted_trust(&state.relationships, Some(BOARD_GROUP))
    {
        state.company.board_confidence = Some(board);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_initial_game_state_with;
    use crate::scenario::ScenarioCatalog;

    fn fresh_state() -> GameState {
        let scenario = ScenarioCatalog::bundled()
            .get("lumina-assist")
            .expect("bundled scenario");
        create_initial_game_state_with(scenario, "run-rel", "team", Some(3)).expect("state")
    }

    #[test]
    fn positive_reaction_raises_all_gauges() {
        let mut state = fresh_state();
        let before = state.relationships["board"].clone();
        process_stakeholder_reactions(
            &mut state,
            &Reactions::new().with("board", ReactionLabel::Positive),
            &ReactionTable::default(),
        );
        let after = &state.relationships["board"];
        assert!((after.trust - (before.trust + 0.08).min(1.0)).abs() < 1e-9);
        assert!((after.alignment - (before.alignment + 0.06).min(1.0)).abs() < 1e-9);
        assert!((after.engagement - (before.engagement + 0.03).min(1.0)).abs() < 1e-9);
    }

    #[test]
    fn gauges_clamp_to_unit_interval() {
        let mut state = fresh_state();
        let mut reactions = Reactions::new();
        for _ in 0..20 {
            reactions.push("regulator", ReactionLabel::VeryNegative);
            reactions.push("customers", ReactionLabel::VeryPositive);
        }
        process_stakeholder_reactions(&mut state, &reactions, &ReactionTable::default());
        let regulator = &state.relationships["regulator"];
        assert!(regulator.trust.abs() < f64::EPSILON);
        assert!(regulator.alignment.abs() < f64::EPSILON);
        let customers = &state.relationships["customers"];
        assert!((customers.trust - 1.0).abs() < f64::EPSILON);
        assert!((customers.engagement - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_stakeholders_are_ignored() {
        let mut state = fresh_state();
        let before = state.relationships.clone();
        process_stakeholder_reactions(
            &mut state,
            &Reactions::new().with("martians", ReactionLabel::VeryNegative),
            &ReactionTable::default(),
        );
        assert_eq!(state.relationships, before);
    }

    #[test]
    fn slightly_negative_leaves_engagement() {
        let mut state = fresh_state();
        let before = state.relationships["employees"].clone();
        process_stakeholder_reactions(
            &mut state,
            &Reactions::new().with("employees", ReactionLabel::SlightlyNegative),
            &ReactionTable::default(),
        );
        let after = &state.relationships["employees"];
        assert!((after.engagement - before.engagement).abs() < f64::EPSILON);
        assert!(after.trust < before.trust);
    }

    #[test]
    fn table_override_changes_delta() {
        let mut state = fresh_state();
        let before = state.relationships["investors"].trust;
        let table = ReactionTable {
            positive: ReactionDelta::new(0.0, 0.0, 0.0),
            ..ReactionTable::default()
        };
        process_stakeholder_reactions(
            &mut state,
            &Reactions::new().with("investors", ReactionLabel::Positive),
            &table,
        );
        assert!((state.relationships["investors"].trust - before).abs() < f64::EPSILON);
    }

    #[test]
    fn confidence_is_influence_weighted() {
        let mut relationships = BTreeMap::new();
        relationships.insert(
            String::from("a"),
            Relationship {
                trust: 1.0,
                alignment: 0.5,
                engagement: 0.5,
                influence: 3.0,
                group: String::from("board"),
            },
        );
        relationships.insert(
            String::from("b"),
            Relationship {
                trust: 0.0,
                alignment: 0.5,
                engagement: 0.5,
                influence: 1.0,
                group: String::from("public"),
            },
        );
        let overall = weighted_trust(&relationships, None).unwrap();
        assert!((overall - 75.0).abs() < 1e-9);
        let board = weighted_trust(&relationships, Some(BOARD_GROUP)).unwrap();
        assert!((board - 100.0).abs() < 1e-9);
        assert!(weighted_trust(&relationships, Some("nobody")).is_none());
    }

    #[test]
    fn reactions_refresh_stakeholder_confidence() {
        let mut state = fresh_state();
        let before = state.company.stakeholder_confidence;
        process_stakeholder_reactions(
            &mut state,
            &Reactions::new()
                .with("board", ReactionLabel::VeryPositive)
                .with("customers", ReactionLabel::VeryPositive),
            &ReactionTable::default(),
        );
        assert!(state.company.stakeholder_confidence > before);
    }
}
