//! Neo4j graph gateway
//!
//! Talks Bolt through a pooled `neo4rs::Graph`, one auto-commit statement per
//! call. Columns are read by alias with typed `Row::get`.
use std::collections::{HashMap, HashSet};

use neo4rs::{query, ConfigBuilder, Graph, Query, Row};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{
        ArtistEmbedding, ArtistId, ArtistMetadata, EmbeddingNeighbor, PopularArtist,
        TagFrequency, TagNeighbor, UserId,
    },
    services::graph::GraphGateway,
};

const ARTIST_EMBEDDINGS_QUERY: &str = r#"
MATCH (a:Artist)
WHERE a.embedding IS NOT NULL
RETURN a.id AS artist_id, a.embedding AS embedding
ORDER BY artist_id
"#;

const USER_EMBEDDING_QUERY: &str = r#"
MATCH (u:User {userID: $user_id})
WHERE u.embedding IS NOT NULL
RETURN u.embedding AS embedding
LIMIT 1
"#;

const CONSUMED_ARTISTS_QUERY: &str = r#"
MATCH (:User {userID: $user_id})-[:LISTENED]->(a:Artist)
RETURN DISTINCT a.id AS artist_id
"#;

const ARTIST_METADATA_QUERY: &str = r#"
UNWIND $ids AS aid
MATCH (a:Artist {id: aid})
RETURN a.id AS artist_id, a.name AS name
"#;

const POPULAR_ARTISTS_QUERY: &str = r#"
MATCH (:User)-[r:LISTENED]->(a:Artist)
RETURN a.id AS artist_id, a.name AS name, toFloat(sum(r.weight)) AS aggregate_weight
ORDER BY aggregate_weight DESC, artist_id ASC
LIMIT $limit
"#;

const USER_TOP_TAGS_QUERY: &str = r#"
MATCH (:User {userID: $user_id})-[:LISTENED]->(:Artist)-[:HAS_TAG]->(t:Tag)
RETURN t.value AS tag, count(*) AS frequency
ORDER BY frequency DESC, tag ASC
LIMIT $limit
"#;

const ARTIST_TAGS_QUERY: &str = r#"
MATCH (:Artist {id: $artist_id})-[:HAS_TAG]->(t:Tag)
RETURN t.value AS tag
ORDER BY tag
"#;

const FRIENDS_WHO_LISTENED_QUERY: &str = r#"
MATCH (:User {userID: $user_id})-[:FRIEND]->(f:User)-[:LISTENED]->(:Artist {id: $artist_id})
RETURN DISTINCT f.userID AS friend_id
ORDER BY friend_id
"#;

const TAG_SHARED_NEIGHBORS_QUERY: &str = r#"
MATCH (target:Artist {id: $artist_id})-[:HAS_TAG]->(t:Tag)
MATCH (:User {userID: $user_id})-[:LISTENED]->(a:Artist)-[:HAS_TAG]->(t)
WHERE a <> target
RETURN a.id AS artist_id, a.name AS name, count(t) AS shared_tag_count
ORDER BY shared_tag_count DESC, artist_id ASC
LIMIT $limit
"#;

const EMBEDDING_NEIGHBORS_QUERY: &str = r#"
MATCH (target:Artist {id: $artist_id})
WHERE target.embedding IS NOT NULL
MATCH (a:Artist)
WHERE a.embedding IS NOT NULL AND a <> target
WITH a, gds.similarity.cosine(a.embedding, target.embedding) AS similarity
ORDER BY similarity DESC, a.id ASC
LIMIT $limit
RETURN a.id AS artist_id, a.name AS name, similarity
"#;

pub struct Neo4jGateway {
    graph: Graph,
}

impl Neo4jGateway {
    /// Opens a connection pool bound to one database
    ///
    /// The database name is passed through untouched.
    pub async fn connect(uri: &str, user: &str, password: &str, database: &str) -> AppResult<Self> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .db(database)
            .build()?;
        let graph = Graph::connect(config).await?;

        Ok(Self { graph })
    }

    /// Runs a single statement and collects every row
    async fn fetch(&self, q: Query) -> AppResult<Vec<Row>> {
        let mut stream = self.graph.execute(q).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }

        tracing::debug!(rows = rows.len(), "Neo4j statement completed");

        Ok(rows)
    }
}

/// Reads one aliased column, treating a type mismatch as a data contract break
fn column<'r, T: Deserialize<'r>>(row: &'r Row, name: &str) -> AppResult<T> {
    row.get(name).map_err(|e| row_shape_error(name, e))
}

fn row_shape_error(column: &str, err: impl std::fmt::Display) -> AppError {
    tracing::error!(column, error = %err, "Unexpected Neo4j row shape");
    AppError::Internal(format!("Unexpected value in column `{}`: {}", column, err))
}

/// Neo4j stores floats as 64-bit; vectors are scored in single precision
fn embedding_from_f64(embedding: Vec<f64>) -> Vec<f32> {
    embedding.into_iter().map(|v| v as f32).collect()
}

/// Bolt integers are 64-bit and signed
fn count_from_i64(count: i64) -> u32 {
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait::async_trait]
impl GraphGateway for Neo4jGateway {
    async fn get_all_artist_embeddings(&self) -> AppResult<Vec<ArtistEmbedding>> {
        let rows = self.fetch(query(ARTIST_EMBEDDINGS_QUERY)).await?;

        rows.iter()
            .map(|row| {
                Ok(ArtistEmbedding {
                    artist_id: column(row, "artist_id")?,
                    embedding: embedding_from_f64(column(row, "embedding")?),
                })
            })
            .collect()
    }

    async fn get_user_embedding(&self, user_id: UserId) -> AppResult<Option<Vec<f32>>> {
        let rows = self
            .fetch(query(USER_EMBEDDING_QUERY).param("user_id", user_id))
            .await?;

        match rows.first() {
            Some(row) => Ok(Some(embedding_from_f64(column(row, "embedding")?))),
            None => Ok(None),
        }
    }

    async fn get_consumed_artists(&self, user_id: UserId) -> AppResult<HashSet<ArtistId>> {
        let rows = self
            .fetch(query(CONSUMED_ARTISTS_QUERY).param("user_id", user_id))
            .await?;

        rows.iter().map(|row| column(row, "artist_id")).collect()
    }

    async fn get_artist_metadata_bulk(
        &self,
        artist_ids: &[ArtistId],
    ) -> AppResult<HashMap<ArtistId, ArtistMetadata>> {
        if artist_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = self
            .fetch(query(ARTIST_METADATA_QUERY).param("ids", artist_ids.to_vec()))
            .await?;

        rows.iter()
            .map(|row| {
                let artist_id: ArtistId = column(row, "artist_id")?;
                let name: Option<String> = column(row, "name")?;
                Ok((artist_id, ArtistMetadata { name }))
            })
            .collect()
    }

    async fn get_popular_artists(&self, limit: usize) -> AppResult<Vec<PopularArtist>> {
        let rows = self
            .fetch(query(POPULAR_ARTISTS_QUERY).param("limit", limit_param(limit)))
            .await?;

        rows.iter()
            .map(|row| {
                Ok(PopularArtist {
                    artist_id: column(row, "artist_id")?,
                    name: column(row, "name")?,
                    aggregate_weight: column(row, "aggregate_weight")?,
                })
            })
            .collect()
    }

    async fn get_user_top_tags(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AppResult<Vec<TagFrequency>> {
        let rows = self
            .fetch(
                query(USER_TOP_TAGS_QUERY)
                    .param("user_id", user_id)
                    .param("limit", limit_param(limit)),
            )
            .await?;

        rows.iter()
            .map(|row| {
                let frequency: i64 = column(row, "frequency")?;
                Ok(TagFrequency {
                    tag: column(row, "tag")?,
                    frequency: frequency.max(0) as u64,
                })
            })
            .collect()
    }

    async fn get_artist_tags(&self, artist_id: ArtistId) -> AppResult<Vec<String>> {
        let rows = self
            .fetch(query(ARTIST_TAGS_QUERY).param("artist_id", artist_id))
            .await?;

        rows.iter().map(|row| column(row, "tag")).collect()
    }

    async fn get_friends_who_consumed(
        &self,
        user_id: UserId,
        artist_id: ArtistId,
    ) -> AppResult<Vec<UserId>> {
        let rows = self
            .fetch(
                query(FRIENDS_WHO_LISTENED_QUERY)
                    .param("user_id", user_id)
                    .param("artist_id", artist_id),
            )
            .await?;

        rows.iter().map(|row| column(row, "friend_id")).collect()
    }

    async fn get_tag_shared_neighbors(
        &self,
        user_id: UserId,
        artist_id: ArtistId,
        limit: usize,
    ) -> AppResult<Vec<TagNeighbor>> {
        let rows = self
            .fetch(
                query(TAG_SHARED_NEIGHBORS_QUERY)
                    .param("user_id", user_id)
                    .param("artist_id", artist_id)
                    .param("limit", limit_param(limit)),
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(TagNeighbor {
                    artist_id: column(row, "artist_id")?,
                    name: column(row, "name")?,
                    shared_tag_count: count_from_i64(column(row, "shared_tag_count")?),
                })
            })
            .collect()
    }

    async fn get_embedding_neighbors(
        &self,
        artist_id: ArtistId,
        limit: usize,
    ) -> AppResult<Vec<EmbeddingNeighbor>> {
        let rows = self
            .fetch(
                query(EMBEDDING_NEIGHBORS_QUERY)
                    .param("artist_id", artist_id)
                    .param("limit", limit_param(limit)),
            )
            .await?;

        rows.iter()
            .map(|row| {
                let similarity: f64 = column(row, "similarity")?;
                Ok(EmbeddingNeighbor {
                    artist_id: column(row, "artist_id")?,
                    name: column(row, "name")?,
                    similarity: similarity as f32,
                })
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "neo4j"
    }
}
