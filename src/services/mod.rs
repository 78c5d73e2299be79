pub mod classifier;
pub mod cold_start;
pub mod embedding_store;
pub mod explainer;
pub mod features;
pub mod graph;
pub mod recommender;
pub mod scorer;

pub use classifier::{BoostedTreeClassifier, Classifier};
pub use cold_start::ColdStartFallback;
pub use embedding_store::EmbeddingStore;
pub use explainer::Explainer;
pub use features::FeatureMatrix;
pub use graph::{CachedGateway, GraphGateway, Neo4jGateway};
pub use recommender::Recommender;
pub use scorer::Scorer;
