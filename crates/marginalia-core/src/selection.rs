//! Which agents' highlights a review view shows.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::decorate::Highlight;

/// Highlights produced by one evaluating agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentHighlights {
    pub agent: SmolStr,
    pub highlights: Vec<Highlight>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReviewSelection {
    /// Reviewing one agent's evaluation.
    SingleAgent {
        agent: SmolStr,
        active_tag: Option<SmolStr>,
    },
    /// Comparing several agents side by side. An empty list shows nothing.
    MultiAgent {
        agents: Vec<SmolStr>,
        active_tag: Option<SmolStr>,
    },
}

impl ReviewSelection {
    pub fn single(agent: impl Into<SmolStr>) -> Self {
        ReviewSelection::SingleAgent {
            agent: agent.into(),
            active_tag: None,
        }
    }

    pub fn multi<I, S>(agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        ReviewSelection::MultiAgent {
            agents: agents.into_iter().map(Into::into).collect(),
            active_tag: None,
        }
    }

    pub fn active_tag(&self) -> Option<&str> {
        match self {
            ReviewSelection::SingleAgent { active_tag, .. }
            | ReviewSelection::MultiAgent { active_tag, .. } => active_tag.as_deref(),
        }
    }

    pub fn set_active_tag(&mut self, tag: Option<&str>) {
        let slot = match self {
            ReviewSelection::SingleAgent { active_tag, .. }
            | ReviewSelection::MultiAgent { active_tag, .. } => active_tag,
        };
        *slot = tag.map(SmolStr::new);
    }

    pub fn includes(&self, agent: &str) -> bool {
        match self {
            ReviewSelection::SingleAgent { agent: selected, .. } => selected == agent,
            ReviewSelection::MultiAgent { agents, .. } => agents.iter().any(|a| a == agent),
        }
    }

    /// Highlights of every selected agent, in the order `all` lists them.
    pub fn visible_highlights(&self, all: &[AgentHighlights]) -> Vec<Highlight> {
        all.iter()
            .filter(|entry| self.includes(&entry.agent))
            .flat_map(|entry| entry.highlights.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> Vec<AgentHighlights> {
        vec![
            AgentHighlights {
                agent: "clarity".into(),
                highlights: vec![Highlight::new(0..4, "c1", "blue")],
            },
            AgentHighlights {
                agent: "grammar".into(),
                highlights: vec![
                    Highlight::new(5..9, "g1", "red"),
                    Highlight::new(10..12, "g2", "red"),
                ],
            },
        ]
    }

    #[test]
    fn test_single_agent() {
        let selection = ReviewSelection::single("grammar");
        let tags: Vec<_> = selection
            .visible_highlights(&fixtures())
            .into_iter()
            .map(|h| h.tag)
            .collect();
        assert_eq!(tags, vec!["g1", "g2"]);
    }

    #[test]
    fn test_multi_agent() {
        let selection = ReviewSelection::multi(["grammar", "clarity"]);
        assert_eq!(selection.visible_highlights(&fixtures()).len(), 3);
        assert!(ReviewSelection::multi(Vec::<SmolStr>::new())
            .visible_highlights(&fixtures())
            .is_empty());
    }

    #[test]
    fn test_active_tag() {
        let mut selection = ReviewSelection::multi(["clarity"]);
        assert_eq!(selection.active_tag(), None);
        selection.set_active_tag(Some("c1"));
        assert_eq!(selection.active_tag(), Some("c1"));
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(ReviewSelection::single("a")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"mode": "single_agent", "agent": "a", "active_tag": null})
        );
    }
}
