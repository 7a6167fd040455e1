//! Tantivy-based search index module.
//!
//! Provides full-text search over public curations with field boosting.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::{Curation, Visibility};

/// Field boost values.
const BOOST_TITLE: f32 = 10.0;
const BOOST_CONTENT: f32 = 5.0;
const BOOST_CATEGORY: f32 = 3.0;

/// Search result with curation id and relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub curation_id: i64,
    pub score: f32,
}

/// Search index schema fields.
struct SearchFields {
    curation_id: Field,
    title: Field,
    content: Field,
    category: Field,
}

/// Tantivy search index for curations.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        let curation_id = schema_builder.add_text_field("curation_id", STRING | STORED);
        let title = schema_builder.add_text_field("title", TEXT | STORED);
        let content = schema_builder.add_text_field("content", TEXT);
        let category = schema_builder.add_text_field("category", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            curation_id,
            title,
            content,
            category,
        };

        // Try to open existing index or create new one
        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index from `(curation, category name)` pairs.
    pub async fn rebuild(&self, curations: &[(Curation, String)]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;

        let mut indexed = 0;
        for (curation, category) in curations {
            if curation.visibility == Visibility::Public {
                writer.add_document(self.create_document(curation, category))?;
                indexed += 1;
            }
        }

        writer.commit()?;
        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} curations", indexed);
        Ok(())
    }

    /// Index or re-index a curation. Private curations are only removed.
    pub async fn index_curation(&self, curation: &Curation, category: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(self.id_term(curation.id));
        if curation.visibility == Visibility::Public {
            writer.add_document(self.create_document(curation, category))?;
        }
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Remove a curation from the index.
    pub async fn remove_curation(&self, curation_id: i64) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(self.id_term(curation_id));
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Search for curations matching the query.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SearchResult>, AppError> {
        if query_str.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        // TopDocs needs a non-zero limit and preallocates for it.
        let alive = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX);
        if offset >= alive {
            return Ok(Vec::new());
        }
        let fetch = limit.saturating_add(offset).min(alive);

        let query_parser = QueryParser::for_index(
            &self.index,
            vec![self.fields.title, self.fields.content, self.fields.category],
        );

        let base_query = query_parser
            .parse_query(query_str)
            .map_err(|e| AppError::BadRequest(format!("Invalid search query: {}", e)))?;

        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();

        let field_queries = [
            (self.fields.title, BOOST_TITLE),
            (self.fields.content, BOOST_CONTENT),
            (self.fields.category, BOOST_CATEGORY),
        ];

        for (field, boost) in field_queries {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = field_parser.parse_query(query_str) {
                subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
            }
        }

        let combined_query = if subqueries.is_empty() {
            base_query
        } else {
            Box::new(BooleanQuery::new(subqueries))
        };

        let top_docs = searcher
            .search(&combined_query, &TopDocs::with_limit(fetch))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let curation_id = doc
                    .get_first(self.fields.curation_id)?
                    .as_str()?
                    .parse()
                    .ok()?;
                Some(SearchResult { curation_id, score })
            })
            .collect();

        Ok(results)
    }

    fn id_term(&self, curation_id: i64) -> Term {
        Term::from_field_text(self.fields.curation_id, &curation_id.to_string())
    }

    fn create_document(&self, curation: &Curation, category: &str) -> TantivyDocument {
        doc!(
            self.fields.curation_id => curation.id.to_string(),
            self.fields.title => curation.title.clone(),
            self.fields.content => curation.content.clone(),
            self.fields.category => category.to_string()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use tempfile::TempDir;

    fn curation(id: i64, title: &str, content: &str, visibility: Visibility) -> Curation {
        Curation {
            id,
            member_id: 1,
            category_id: 1,
            emoji: "📚".to_string(),
            title: title.to_string(),
            content: content.to_string(),
            visibility,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        }
    }

    #[tokio::test]
    async fn test_rebuild_and_search() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        let curations = vec![
            (
                curation(1, "Mystery novels", "Locked room puzzles", Visibility::Public),
                "Fiction".to_string(),
            ),
            (
                curation(2, "Cooking basics", "Knife skills and stock", Visibility::Public),
                "Food".to_string(),
            ),
            (
                curation(3, "Secret mystery list", "Only for me", Visibility::Private),
                "Fiction".to_string(),
            ),
        ];

        index.rebuild(&curations).await.unwrap();

        let results = index.search("mystery", 10, 0).unwrap();
        let ids: Vec<i64> = results.iter().map(|r| r.curation_id).collect();
        assert_eq!(ids, vec![1]);

        let results = index.search("food", 10, 0).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].curation_id, 2);
    }

    #[tokio::test]
    async fn test_index_curation_turning_private_removes_it() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        let mut entry = curation(7, "Poetry picks", "Short verses", Visibility::Public);
        index.index_curation(&entry, "Poetry").await.unwrap();
        assert_eq!(index.search("verses", 10, 0).unwrap().len(), 1);

        entry.visibility = Visibility::Private;
        index.index_curation(&entry, "Poetry").await.unwrap();
        assert!(index.search("verses", 10, 0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_curation() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        let entry = curation(9, "Travel essays", "Trains across Europe", Visibility::Public);
        index.index_curation(&entry, "Essay").await.unwrap();
        index.remove_curation(9).await.unwrap();

        assert!(index.search("trains", 10, 0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_limit_and_offset_bounds() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        let curations = vec![
            (
                curation(1, "Mystery novels", "Locked room puzzles", Visibility::Public),
                "Fiction".to_string(),
            ),
            (
                curation(2, "Mystery films", "Noir on screen", Visibility::Public),
                "Film".to_string(),
            ),
        ];
        index.rebuild(&curations).await.unwrap();

        assert!(index.search("mystery", 0, 0).unwrap().is_empty());
        assert!(index.search("mystery", 20, usize::MAX).unwrap().is_empty());
        assert!(index.search("mystery", 20, 2).unwrap().is_empty());
        assert_eq!(index.search("mystery", usize::MAX, 0).unwrap().len(), 2);

        let first = index.search("mystery", 1, 0).unwrap();
        let second = index.search("mystery", 1, 1).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_ne!(first[0].curation_id, second[0].curation_id);
    }

    #[tokio::test]
    async fn test_search_empty_query() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        let results = index.search("   ", 10, 0).unwrap();
        assert!(results.is_empty());
    }
}
