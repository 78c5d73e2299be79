use serde::{Deserialize, Serialize};

use super::{ArtistId, Recommendation, UserId};

/// Tags shared between a user's listening profile and a target artist
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TagOverlap {
    /// User's top tags, most frequent first
    pub user_tags: Vec<String>,
    pub artist_tags: Vec<String>,
    /// Intersection, in the order of `user_tags`
    pub shared: Vec<String>,
}

impl TagOverlap {
    pub fn new(user_tags: Vec<String>, artist_tags: Vec<String>) -> Self {
        let shared = user_tags
            .iter()
            .filter(|tag| artist_tags.contains(tag))
            .cloned()
            .collect();

        Self {
            user_tags,
            artist_tags,
            shared,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FriendActivity {
    pub friends_who_listened: Vec<UserId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Explanations {
    pub tag_overlap: TagOverlap,
    pub friend_activity: FriendActivity,
    pub similar_artists: Vec<Recommendation>,
    pub embedding_similarity: Vec<Recommendation>,
}

/// Explanation sub-query, used to report which parts could not be computed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationSection {
    TagOverlap,
    FriendActivity,
    SimilarArtists,
    EmbeddingSimilarity,
}

/// Reasons behind recommending `artist_id` to `user_id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExplanationBundle {
    pub user_id: UserId,
    pub artist_id: ArtistId,
    pub explanations: Explanations,
    /// Sections left empty because their sub-query failed
    #[serde(default)]
    pub unavailable: Vec<ExplanationSection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tag_overlap_keeps_user_order() {
        let overlap = TagOverlap::new(
            tags(&["pop", "dance", "electronic", "80s"]),
            tags(&["80s", "synthpop", "pop"]),
        );
        assert_eq!(overlap.shared, tags(&["pop", "80s"]));
    }

    #[test]
    fn test_tag_overlap_empty_when_disjoint() {
        let overlap = TagOverlap::new(tags(&["metal"]), tags(&["jazz"]));
        assert!(overlap.shared.is_empty());
    }

    #[test]
    fn test_tag_overlap_empty_artist_tags() {
        let overlap = TagOverlap::new(tags(&["metal", "rock"]), vec![]);
        assert!(overlap.shared.is_empty());
        assert_eq!(overlap.user_tags.len(), 2);
    }
}
