use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, INDEXED, STORED, STRING,
};
use tantivy::tokenizer::{Language, LowerCaser, SimpleTokenizer, Stemmer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

use docqa_core::error::{Error, Result};
use docqa_core::stopwords::STOP_WORDS;

pub const TOKENIZER_NAME: &str = "docqa_text";

pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    schema_builder.add_text_field("chunk_id", STRING | STORED);
    schema_builder.add_text_field("document_id", STRING | STORED);
    schema_builder.add_text_field("domain", STRING | STORED);
    schema_builder.add_u64_field("chunk_index", INDEXED | STORED);
    schema_builder.add_u64_field("start", STORED);
    schema_builder.add_u64_field("end", STORED);
    schema_builder.add_u64_field("overlap", STORED);
    schema_builder.add_i64_field("uploaded_at", STORED);
    let text_field_indexing = TextFieldIndexing::default()
        .set_tokenizer(TOKENIZER_NAME)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
    schema_builder.add_text_field("text", text_options);
    schema_builder.build()
}

pub fn build_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string())))
        .filter(Stemmer::new(Language::English))
        .build()
}

pub fn register_tokenizer(index: &Index) {
    index.tokenizers().register(TOKENIZER_NAME, build_analyzer());
}

/// Runs `text` through the index analyzer, returning terms in order.
pub fn analyze(analyzer: &TextAnalyzer, text: &str) -> Vec<String> {
    let mut analyzer = analyzer.clone();
    let mut stream = analyzer.token_stream(text);
    let mut terms = Vec::new();
    while stream.advance() {
        terms.push(stream.token().text.clone());
    }
    terms
}

/// Schema fields, resolved once.
#[derive(Clone, Copy)]
pub struct Fields {
    pub chunk_id: Field,
    pub document_id: Field,
    pub domain: Field,
    pub chunk_index: Field,
    pub start: Field,
    pub end: Field,
    pub overlap: Field,
    pub uploaded_at: Field,
    pub text: Field,
}

impl Fields {
    pub fn resolve(schema: &Schema) -> Result<Self> {
        let get = |name: &str| {
            schema
                .get_field(name)
                .map_err(|e| Error::Operation(format!("tantivy schema missing '{name}': {e}")))
        };
        Ok(Self {
            chunk_id: get("chunk_id")?,
            document_id: get("document_id")?,
            domain: get("domain")?,
            chunk_index: get("chunk_index")?,
            start: get("start")?,
            end: get("end")?,
            overlap: get("overlap")?,
            uploaded_at: get("uploaded_at")?,
            text: get("text")?,
        })
    }
}
