use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use artist_rec_api::{
    api::{create_router, AppState},
    error::{AppError, AppResult},
    models::{
        ArtistEmbedding, ArtistId, ArtistMetadata, EmbeddingNeighbor, PopularArtist,
        TagFrequency, TagNeighbor, UserId,
    },
    services::{
        BoostedTreeClassifier, EmbeddingStore, Explainer, GraphGateway, Recommender, Scorer,
    },
};

/// Small listening graph held in memory
///
/// User 1 has an embedding and has listened to artist 20. User 2 has no
/// embedding and has listened to artist 10. Friends of user 1 who listened
/// to artist 30: user 7.
struct InMemoryGateway {
    artists: Vec<ArtistEmbedding>,
    names: HashMap<ArtistId, String>,
    users: HashMap<UserId, Vec<f32>>,
    consumed: HashMap<UserId, HashSet<ArtistId>>,
    popular: Vec<ArtistId>,
    artist_tags: HashMap<ArtistId, Vec<String>>,
    user_tags: HashMap<UserId, Vec<String>>,
    friends_listened: HashMap<(UserId, ArtistId), Vec<UserId>>,
    fail_friends: bool,
}

impl InMemoryGateway {
    fn fixture() -> Self {
        let artists = vec![
            ArtistEmbedding {
                artist_id: 10,
                embedding: vec![1.0, 0.0],
            },
            ArtistEmbedding {
                artist_id: 20,
                embedding: vec![0.0, 1.0],
            },
            ArtistEmbedding {
                artist_id: 30,
                embedding: vec![0.5, 0.5],
            },
        ];

        let names = [(10, "Kraftwerk"), (20, "Madonna"), (30, "Depeche Mode")]
            .into_iter()
            .map(|(id, name)| (id, name.to_string()))
            .collect();

        let tags = |list: &[&str]| list.iter().map(|t| t.to_string()).collect::<Vec<_>>();

        Self {
            artists,
            names,
            users: [(1, vec![1.0, 0.2])].into_iter().collect(),
            consumed: [
                (1, [20].into_iter().collect()),
                (2, [10].into_iter().collect()),
            ]
            .into_iter()
            .collect(),
            popular: vec![30, 10, 20],
            artist_tags: [
                (10, tags(&["electronic", "german"])),
                (20, tags(&["pop", "80s"])),
                (30, tags(&["synthpop", "80s", "electronic"])),
            ]
            .into_iter()
            .collect(),
            user_tags: [(1, tags(&["pop", "80s"]))].into_iter().collect(),
            friends_listened: [((1, 30), vec![7])].into_iter().collect(),
            fail_friends: false,
        }
    }

    fn artist_name(&self, artist_id: ArtistId) -> Option<String> {
        self.names.get(&artist_id).cloned()
    }
}

#[async_trait]
impl GraphGateway for InMemoryGateway {
    async fn get_all_artist_embeddings(&self) -> AppResult<Vec<ArtistEmbedding>> {
        Ok(self.artists.clone())
    }

    async fn get_user_embedding(&self, user_id: UserId) -> AppResult<Option<Vec<f32>>> {
        Ok(self.users.get(&user_id).cloned())
    }

    async fn get_consumed_artists(&self, user_id: UserId) -> AppResult<HashSet<ArtistId>> {
        Ok(self.consumed.get(&user_id).cloned().unwrap_or_default())
    }

    async fn get_artist_metadata_bulk(
        &self,
        artist_ids: &[ArtistId],
    ) -> AppResult<HashMap<ArtistId, ArtistMetadata>> {
        Ok(artist_ids
            .iter()
            .filter(|id| self.names.contains_key(*id))
            .map(|&id| (id, ArtistMetadata { name: self.artist_name(id) }))
            .collect())
    }

    async fn get_popular_artists(&self, limit: usize) -> AppResult<Vec<PopularArtist>> {
        Ok(self
            .popular
            .iter()
            .enumerate()
            .take(limit)
            .map(|(rank, &artist_id)| PopularArtist {
                artist_id,
                name: self.artist_name(artist_id),
                aggregate_weight: 1000.0 - rank as f64,
            })
            .collect())
    }

    async fn get_user_top_tags(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AppResult<Vec<TagFrequency>> {
        Ok(self
            .user_tags
            .get(&user_id)
            .into_iter()
            .flatten()
            .take(limit)
            .map(|tag| TagFrequency {
                tag: tag.clone(),
                frequency: 1,
            })
            .collect())
    }

    async fn get_artist_tags(&self, artist_id: ArtistId) -> AppResult<Vec<String>> {
        Ok(self.artist_tags.get(&artist_id).cloned().unwrap_or_default())
    }

    async fn get_friends_who_consumed(
        &self,
        user_id: UserId,
        artist_id: ArtistId,
    ) -> AppResult<Vec<UserId>> {
        if self.fail_friends {
            return Err(AppError::Graph(neo4rs::Error::ConnectionError));
        }
        Ok(self
            .friends_listened
            .get(&(user_id, artist_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_tag_shared_neighbors(
        &self,
        _user_id: UserId,
        artist_id: ArtistId,
        limit: usize,
    ) -> AppResult<Vec<TagNeighbor>> {
        let target: HashSet<&String> = self
            .artist_tags
            .get(&artist_id)
            .into_iter()
            .flatten()
            .collect();

        let mut neighbors: Vec<TagNeighbor> = self
            .artist_tags
            .iter()
            .filter(|(id, _)| **id != artist_id)
            .map(|(&id, tags)| TagNeighbor {
                artist_id: id,
                name: self.artist_name(id),
                shared_tag_count: tags.iter().filter(|t| target.contains(t)).count() as u32,
            })
            .filter(|n| n.shared_tag_count > 0)
            .collect();
        neighbors.sort_by(|a, b| {
            b.shared_tag_count
                .cmp(&a.shared_tag_count)
                .then(a.artist_id.cmp(&b.artist_id))
        });
        neighbors.truncate(limit);
        Ok(neighbors)
    }

    async fn get_embedding_neighbors(
        &self,
        artist_id: ArtistId,
        limit: usize,
    ) -> AppResult<Vec<EmbeddingNeighbor>> {
        Ok(self
            .artists
            .iter()
            .filter(|a| a.artist_id != artist_id)
            .take(limit)
            .map(|a| EmbeddingNeighbor {
                artist_id: a.artist_id,
                name: self.artist_name(a.artist_id),
                similarity: 0.5,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

/// One stump on feature 0: rows with `x0 >= 0.75` score sigmoid(1), others sigmoid(-1)
fn stump_classifier() -> BoostedTreeClassifier {
    let model = json!({
        "learner": {
            "learner_model_param": {
                "base_score": "5E-1",
                "num_class": "0",
                "num_feature": "2"
            },
            "gradient_booster": {
                "name": "gbtree",
                "model": {
                    "trees": [{
                        "left_children": [1, -1, -1],
                        "right_children": [2, -1, -1],
                        "split_indices": [0, 0, 0],
                        "split_conditions": [0.75, -1.0, 1.0],
                        "default_left": [0, 0, 0],
                        "base_weights": [0.0, -1.0, 1.0]
                    }]
                }
            },
            "objective": { "name": "binary:logistic" }
        },
        "version": [2, 0, 3]
    });
    BoostedTreeClassifier::from_json_str(&model.to_string()).unwrap()
}

async fn create_test_server_with(gateway: InMemoryGateway) -> TestServer {
    let gateway: Arc<dyn GraphGateway> = Arc::new(gateway);
    let store = EmbeddingStore::load(gateway.as_ref()).await.unwrap();
    let scorer = Scorer::new(Arc::new(stump_classifier()));
    let recommender = Recommender::new(gateway.clone(), Arc::new(store), scorer).unwrap();
    let explainer = Explainer::new(gateway, 20, 5);

    let state = AppState::new(recommender, explainer, 10, 100);
    TestServer::new(create_router(state)).unwrap()
}

async fn create_test_server() -> TestServer {
    create_test_server_with(InMemoryGateway::fixture()).await
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server().await;
    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["artist_embeddings"], 3);
    assert!(body["embeddings_loaded_at"].is_string());
}

#[tokio::test]
async fn test_personalized_recommendations() {
    let server = create_test_server().await;
    let response = server.get("/users/1/recommendations").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["user_id"], 1);
    assert_eq!(body["top_k"], 10);

    // Artist 20 was already listened to
    let items = body["items"].as_array().unwrap();
    let ids: Vec<i64> = items.iter().map(|i| i["artist_id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![10, 30]);

    assert_eq!(items[0]["artist_name"], "Kraftwerk");
    assert_eq!(items[0]["source"], "personalized");
    let top = items[0]["score"].as_f64().unwrap();
    let second = items[1]["score"].as_f64().unwrap();
    assert!(top > second);
    assert!(items[0].get("tag_count").is_none());
}

#[tokio::test]
async fn test_k_limits_result_count() {
    let server = create_test_server().await;
    let response = server
        .get("/users/1/recommendations")
        .add_query_param("k", 1)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["top_k"], 1);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["artist_id"], 10);
}

#[tokio::test]
async fn test_cold_start_recommendations() {
    let server = create_test_server().await;
    let response = server
        .get("/users/2/recommendations")
        .add_query_param("k", 2)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let items = body["items"].as_array().unwrap();

    // Popularity order is 30, 10, 20; user 2 already listened to 10
    let ids: Vec<i64> = items.iter().map(|i| i["artist_id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![30, 20]);
    assert!(items
        .iter()
        .all(|i| i["source"] == "cold_start" && i.get("score").is_none()));
}

#[tokio::test]
async fn test_k_above_maximum_is_rejected() {
    let server = create_test_server().await;
    let response = server
        .get("/users/1/recommendations")
        .add_query_param("k", 101)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("100"));
}

#[tokio::test]
async fn test_zero_k_returns_empty_list() {
    let server = create_test_server().await;
    let response = server
        .get("/users/1/recommendations")
        .add_query_param("k", 0)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_explain() {
    let server = create_test_server().await;
    let response = server
        .get("/explain")
        .add_query_param("user_id", 1)
        .add_query_param("artist_id", 30)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let e = &body["explanations"];

    assert_eq!(e["tag_overlap"]["shared"], json!(["80s"]));
    assert_eq!(e["friend_activity"]["friends_who_listened"], json!([7]));

    let similar = e["similar_artists"].as_array().unwrap();
    assert_eq!(similar[0]["source"], "tag_similarity");
    assert!(similar.iter().all(|s| s["artist_id"] != 30));

    let embedded = e["embedding_similarity"].as_array().unwrap();
    assert_eq!(embedded.len(), 2);
    assert_eq!(embedded[0]["source"], "embedding_similarity");
    assert_eq!(body["unavailable"], json!([]));
}

#[tokio::test]
async fn test_explain_degrades_failed_section() {
    let gateway = InMemoryGateway {
        fail_friends: true,
        ..InMemoryGateway::fixture()
    };
    let server = create_test_server_with(gateway).await;
    let response = server
        .get("/explain")
        .add_query_param("user_id", 1)
        .add_query_param("artist_id", 30)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["unavailable"], json!(["friend_activity"]));
    assert_eq!(
        body["explanations"]["friend_activity"]["friends_who_listened"],
        json!([])
    );
    assert_eq!(body["explanations"]["tag_overlap"]["shared"], json!(["80s"]));
}

#[tokio::test]
async fn test_explain_requires_both_ids() {
    let server = create_test_server().await;
    let response = server
        .get("/explain")
        .add_query_param("user_id", 1)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("artist_id"));
}

#[tokio::test]
async fn test_malformed_k_is_json_bad_request() {
    let server = create_test_server().await;
    let response = server
        .get("/users/1/recommendations")
        .add_query_param("k", -1)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_non_numeric_user_id_is_json_bad_request() {
    let server = create_test_server().await;
    let response = server.get("/users/someone/recommendations").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server().await;
    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("trace-abc"),
        )
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("x-request-id"), "trace-abc");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let server = create_test_server().await;
    let response = server.get("/artists").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}
