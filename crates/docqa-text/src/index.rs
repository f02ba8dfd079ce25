use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::tokenizer::TextAnalyzer;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{debug, info};

use docqa_core::error::{Error, Result};
use docqa_core::traits::LexicalIndex;
use docqa_core::types::{Chunk, Domain, LexicalHit, SearchFilter};

use crate::search::overlap_score;
use crate::tantivy_utils::{analyze, build_analyzer, build_schema, register_tokenizer, Fields};

const WRITER_MEMORY: usize = 50_000_000;
/// BM25 candidates fetched per requested hit before overlap re-scoring.
const CANDIDATE_FACTOR: usize = 4;

fn op_err(context: &str) -> impl Fn(tantivy::TantivyError) -> Error + '_ {
    move |e| Error::Operation(format!("tantivy {context}: {e}"))
}

pub struct TantivyLexicalIndex {
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    fields: Fields,
    analyzer: TextAnalyzer,
}

impl TantivyLexicalIndex {
    pub fn in_memory() -> Result<Self> {
        Self::from_index(Index::create_in_ram(build_schema()))
    }

    /// Opens the index in `index_dir`, creating it (and the directory) when absent.
    pub fn open_or_create(index_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(index_dir)
            .map_err(|e| Error::Operation(format!("create {}: {e}", index_dir.display())))?;
        let dir = tantivy::directory::MmapDirectory::open(index_dir)
            .map_err(|e| Error::Operation(format!("open {}: {e}", index_dir.display())))?;
        let index = Index::open_or_create(dir, build_schema()).map_err(op_err("open"))?;
        info!(dir = %index_dir.display(), "opened lexical index");
        Self::from_index(index)
    }

    /// Drops every indexed chunk. Returns how many were removed.
    pub fn clear(&self) -> Result<u64> {
        let existing = self.reader.searcher().num_docs();
        if existing > 0 {
            self.with_writer(|writer, _| {
                writer.delete_all_documents().map_err(op_err("clear"))?;
                Ok(())
            })?;
        }
        Ok(existing)
    }

    fn from_index(index: Index) -> Result<Self> {
        register_tokenizer(&index);
        let fields = Fields::resolve(&index.schema())?;
        let writer = index
            .writer_with_num_threads(1, WRITER_MEMORY)
            .map_err(op_err("writer"))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(op_err("reader"))?;
        Ok(Self { reader, writer: Mutex::new(writer), fields, analyzer: build_analyzer() })
    }

    fn with_writer<T>(&self, f: impl FnOnce(&mut IndexWriter, &Fields) -> Result<T>) -> Result<T> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::Operation("tantivy writer lock poisoned".into()))?;
        let out = f(&mut writer, &self.fields)?;
        writer.commit().map_err(op_err("commit"))?;
        self.reader.reload().map_err(op_err("reload"))?;
        Ok(out)
    }

    fn filter_clauses(&self, filter: &SearchFilter) -> Vec<(Occur, Box<dyn Query>)> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        if let Some(id) = &filter.document_id {
            let term = Term::from_field_text(self.fields.document_id, id);
            clauses.push((Occur::Must, Box::new(TermQuery::new(term, IndexRecordOption::Basic))));
        }
        if let Some(domain) = filter.domain {
            let term = Term::from_field_text(self.fields.domain, domain.as_str());
            clauses.push((Occur::Must, Box::new(TermQuery::new(term, IndexRecordOption::Basic))));
        }
        clauses
    }

    fn to_chunk(&self, doc: &TantivyDocument) -> Result<Chunk> {
        let f = &self.fields;
        let text = |field| doc.get_first(field).and_then(|v| v.as_str()).map(str::to_string);
        let num = |field| doc.get_first(field).and_then(|v| v.as_u64()).unwrap_or(0) as usize;
        let chunk_id = text(f.chunk_id).ok_or_else(|| Error::Operation("stored chunk without id".into()))?;
        let domain = text(f.domain)
            .and_then(|d| d.parse::<Domain>().ok())
            .unwrap_or_default();
        Ok(Chunk {
            id: chunk_id,
            document_id: text(f.document_id).unwrap_or_default(),
            index: num(f.chunk_index),
            start: num(f.start),
            end: num(f.end),
            overlap: num(f.overlap),
            text: text(f.text).unwrap_or_default(),
            domain,
            uploaded_at: doc.get_first(f.uploaded_at).and_then(|v| v.as_i64()).unwrap_or(0),
        })
    }
}

#[async_trait]
impl LexicalIndex for TantivyLexicalIndex {
    async fn index(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        self.with_writer(|writer, f| {
            for c in chunks {
                writer.delete_term(Term::from_field_text(f.chunk_id, &c.id));
                writer
                    .add_document(doc!(
                        f.chunk_id => c.id.clone(),
                        f.document_id => c.document_id.clone(),
                        f.domain => c.domain.as_str(),
                        f.chunk_index => c.index as u64,
                        f.start => c.start as u64,
                        f.end => c.end as u64,
                        f.overlap => c.overlap as u64,
                        f.uploaded_at => c.uploaded_at,
                        f.text => c.text.clone(),
                    ))
                    .map_err(op_err("add_document"))?;
            }
            Ok(())
        })?;
        debug!(chunks = chunks.len(), "indexed chunks lexically");
        Ok(())
    }

    async fn search(&self, query: &str, k: usize, filter: &SearchFilter) -> Result<Vec<LexicalHit>> {
        if k == 0 {
            return Ok(vec![]);
        }
        let query_terms = analyze(&self.analyzer, query);
        if query_terms.is_empty() {
            return Ok(vec![]);
        }

        let mut unique = query_terms.clone();
        unique.sort();
        unique.dedup();
        let any_term: Vec<(Occur, Box<dyn Query>)> = unique
            .iter()
            .map(|t| {
                let term = Term::from_field_text(self.fields.text, t);
                let q: Box<dyn Query> = Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
                (Occur::Should, q)
            })
            .collect();
        let mut clauses = self.filter_clauses(filter);
        clauses.push((Occur::Must, Box::new(BooleanQuery::new(any_term))));
        let q = BooleanQuery::new(clauses);

        let searcher = self.reader.searcher();
        let limit = k
            .saturating_mul(CANDIDATE_FACTOR)
            .min(searcher.num_docs() as usize)
            .max(1);
        let top_docs = searcher
            .search(&q, &TopDocs::with_limit(limit))
            .map_err(op_err("search"))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (bm25, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr).map_err(op_err("doc"))?;
            let chunk = self.to_chunk(&doc)?;
            let score = overlap_score(&query_terms, &analyze(&self.analyzer, &chunk.text));
            if score > 0.0 {
                hits.push((LexicalHit { chunk, score }, bm25));
            }
        }
        hits.sort_by(|(a, a_bm25), (b, b_bm25)| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b_bm25.total_cmp(a_bm25))
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        hits.truncate(k);
        Ok(hits.into_iter().map(|(h, _)| h).collect())
    }

    async fn delete(&self, document_id: &str) -> Result<usize> {
        let term = Term::from_field_text(self.fields.document_id, document_id);
        let existing = self
            .reader
            .searcher()
            .search(&TermQuery::new(term.clone(), IndexRecordOption::Basic), &Count)
            .map_err(op_err("count"))?;
        if existing == 0 {
            return Ok(0);
        }
        self.with_writer(|writer, _| {
            writer.delete_term(term);
            Ok(())
        })?;
        debug!(document_id, removed = existing, "deleted lexical chunks");
        Ok(existing)
    }
}
