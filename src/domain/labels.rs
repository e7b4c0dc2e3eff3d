//! Entity label sets: every mention of every entity in an article.

use serde::{Deserialize, Serialize};

use super::mention::Mention;
use super::role::RoleFilter;

/// Mentions keyed by entity display text
///
/// Mentions keep their input order; entities are identified by text
/// equality only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet {
    mentions: Vec<Mention>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mentions(mentions: Vec<Mention>) -> Self {
        Self { mentions }
    }

    pub fn push(&mut self, mention: Mention) {
        self.mentions.push(mention);
    }

    pub fn mentions(&self) -> &[Mention] {
        &self.mentions
    }

    pub fn into_mentions(self) -> Vec<Mention> {
        self.mentions
    }

    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }

    /// Distinct entity texts in first-seen order
    pub fn entities(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for mention in &self.mentions {
            if !seen.contains(&mention.entity.as_str()) {
                seen.push(mention.entity.as_str());
            }
        }
        seen
    }

    /// All mentions of one entity
    pub fn get(&self, entity: &str) -> Vec<&Mention> {
        self.mentions.iter().filter(|m| m.entity == entity).collect()
    }

    /// Keep only mentions whose main role is enabled
    ///
    /// Entities left with no mentions disappear from the set.
    pub fn filter_by_role(&self, filter: &RoleFilter) -> LabelSet {
        self.mentions
            .iter()
            .filter(|m| filter.contains(m.main_role))
            .cloned()
            .collect()
    }

    /// Keep only mentions belonging to `article_id`
    pub fn for_article(&self, article_id: &str) -> LabelSet {
        self.mentions
            .iter()
            .filter(|m| m.article_id.as_deref() == Some(article_id))
            .cloned()
            .collect()
    }
}

impl FromIterator<Mention> for LabelSet {
    fn from_iter<I: IntoIterator<Item = Mention>>(iter: I) -> Self {
        Self {
            mentions: iter.into_iter().collect(),
        }
    }
}

impl Extend<Mention> for LabelSet {
    fn extend<I: IntoIterator<Item = Mention>>(&mut self, iter: I) {
        self.mentions.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MainRole;

    fn sample() -> LabelSet {
        LabelSet::from_mentions(vec![
            Mention::new("Alice", 0, 5, MainRole::Protagonist),
            Mention::new("Bob", 10, 13, MainRole::Antagonist),
            Mention::new("Alice", 20, 25, MainRole::Innocent),
        ])
    }

    #[test]
    fn test_entities_first_seen_order() {
        assert_eq!(sample().entities(), vec!["Alice", "Bob"]);
        assert_eq!(sample().get("Alice").len(), 2);
    }

    #[test]
    fn test_filter_by_role_drops_empty_entities() {
        let filter = RoleFilter::from_roles([MainRole::Innocent]);
        let filtered = sample().filter_by_role(&filter);

        assert_eq!(filtered.entities(), vec!["Alice"]);
        assert_eq!(filtered.mentions()[0].start, 20);
    }

    #[test]
    fn test_for_article() {
        let labels = LabelSet::from_mentions(vec![
            Mention::new("Alice", 0, 5, MainRole::Protagonist).with_article_id("a1"),
            Mention::new("Bob", 0, 3, MainRole::Antagonist).with_article_id("a2"),
        ]);
        let only = labels.for_article("a2");
        assert_eq!(only.len(), 1);
        assert_eq!(only.mentions()[0].entity, "Bob");
    }
}
