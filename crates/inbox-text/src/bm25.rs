use std::cmp::Ordering;

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::tokenizer::TokenStream;
use tantivy::{doc, Index, IndexWriter, TantivyDocument, TantivyError, Term};
use tracing::debug;

use inbox_core::error::{Error, Result};
use inbox_core::types::{Ranking, Scored};

use crate::tantivy_utils::{build_schema, email_analyzer, register_tokenizer, LexicalFields};

fn index_err(e: TantivyError) -> Error {
	Error::Index(e.to_string())
}

/// Lower-cases a free-text query and splits it on spaces. Empty pieces are dropped.
pub fn keywords_from_query(query: &str) -> Vec<String> {
	query.to_lowercase().split(' ').filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Scores every corpus item against `keywords` with BM25 (k1=1.2, b=0.75).
///
/// Each keyword contributes its own term score, so repeats add up.
/// Matching items come first by descending score, followed by the rest at
/// score 0; ties keep corpus order. No keywords or no corpus gives an empty
/// ranking.
pub fn rank_bm25<T, F>(keywords: &[String], corpus: &[T], to_text: F) -> Result<Ranking<T>>
where
	T: Clone,
	F: Fn(&T) -> String,
{
	if corpus.is_empty() || keywords.iter().all(|k| k.trim().is_empty()) {
		return Ok(Vec::new());
	}

	let (index, fields) = build_index(corpus, &to_text)?;
	let terms = analyze_keywords(keywords);
	let mut scores: Vec<Option<f64>> = vec![None; corpus.len()];

	if terms.is_empty() {
		debug!(?keywords, "keywords reduced to nothing after analysis");
	} else {
		let clauses: Vec<(Occur, Box<dyn Query>)> = terms
			.iter()
			.map(|t| {
				let term = Term::from_field_text(fields.text, t);
				(Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)) as Box<dyn Query>)
			})
			.collect();
		let query = BooleanQuery::new(clauses);

		let reader = index.reader().map_err(index_err)?;
		let searcher = reader.searcher();
		let top_docs = searcher.search(&query, &TopDocs::with_limit(corpus.len())).map_err(index_err)?;
		for (score, address) in top_docs {
			let stored: TantivyDocument = searcher.doc(address).map_err(index_err)?;
			let ord = stored
				.get_first(fields.ord)
				.and_then(|v| v.as_u64())
				.ok_or_else(|| Error::Index("stored document is missing its ordinal".into()))?;
			if let Some(slot) = scores.get_mut(ord as usize) {
				*slot = Some(score as f64);
			}
		}
	}

	let mut matched: Vec<(usize, f64)> = scores.iter().enumerate().filter_map(|(i, s)| s.map(|s| (i, s))).collect();
	matched.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
	debug!(matched = matched.len(), corpus = corpus.len(), "bm25 ranking");

	let mut ranking: Ranking<T> = matched.iter().map(|&(i, score)| Scored { item: corpus[i].clone(), score }).collect();
	ranking.extend(
		scores
			.iter()
			.zip(corpus)
			.filter(|(s, _)| s.is_none())
			.map(|(_, item)| Scored { item: item.clone(), score: 0.0 }),
	);
	Ok(ranking)
}

fn build_index<T, F>(corpus: &[T], to_text: &F) -> Result<(Index, LexicalFields)>
where
	F: Fn(&T) -> String,
{
	let (schema, fields) = build_schema();
	let index = Index::create_in_ram(schema);
	register_tokenizer(&index);

	let mut writer: IndexWriter = index.writer_with_num_threads(1, 50_000_000).map_err(index_err)?;
	for (ord, item) in corpus.iter().enumerate() {
		writer
			.add_document(doc!(fields.ord => ord as u64, fields.text => to_text(item)))
			.map_err(index_err)?;
	}
	writer.commit().map_err(index_err)?;
	Ok((index, fields))
}

/// Runs keywords through the same analyzer as the indexed text. Repeats are
/// kept so a term given twice contributes its score twice.
fn analyze_keywords(keywords: &[String]) -> Vec<String> {
	let mut analyzer = email_analyzer();
	let mut terms = Vec::new();
	for keyword in keywords {
		let mut stream = analyzer.token_stream(keyword);
		stream.process(&mut |token| {
			terms.push(token.text.clone());
		});
	}
	terms
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn query_is_lowercased_and_split() {
		assert_eq!(keywords_from_query("Invoice  MARCH"), vec!["invoice", "march"]);
		assert!(keywords_from_query("").is_empty());
	}

	#[test]
	fn stop_words_are_not_terms() {
		let terms = analyze_keywords(&["The".to_string(), "Lease".to_string()]);
		assert_eq!(terms, vec!["lease".to_string()]);
	}

	#[test]
	fn repeated_keywords_keep_multiplicity() {
		let terms = analyze_keywords(&["Invoice".to_string(), "invoice".to_string(), "march".to_string()]);
		assert_eq!(terms, vec!["invoice", "invoice", "march"]);
	}
}
