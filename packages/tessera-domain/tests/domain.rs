use tessera_domain::{
	AlphanumericTokenizer, Bm25Params, DocumentTerms, NamespaceStatistics, Similarity, Tokenizer,
	bm25, stats,
};

const CORPUS: [(&str, &str); 6] = [
	("1", "Hello world"),
	("2", "Hello world"),
	("3", "lorem ipsum dolor sit amet"),
	("4", "lorem ipsum world"),
	("5", "Foo bar"),
	("6", "Bar"),
];

fn corpus_terms() -> Vec<(&'static str, DocumentTerms)> {
	CORPUS
		.iter()
		.map(|(id, text)| (*id, DocumentTerms::from_tokens(AlphanumericTokenizer.tokenize(text))))
		.collect()
}

fn corpus_statistics(terms: &[(&str, DocumentTerms)]) -> NamespaceStatistics {
	let mut value = serde_json::to_value(NamespaceStatistics::default())
		.expect("Failed to serialize statistics.");

	for (_, doc) in terms {
		for word in doc.words() {
			stats::assign_word_index(&mut value, word).expect("Statistics must be well formed.");
		}
	}

	let mut stats: NamespaceStatistics =
		serde_json::from_value(value).expect("Failed to deserialize statistics.");

	for (_, doc) in terms {
		for word in doc.words() {
			if let Some(stat) = stats.word_statistics.get_mut(word) {
				stat.documents_containing_word += 1;
			}
		}

		stats.index_statistics.number_of_documents += 1;
		stats.index_statistics.total_document_length += doc.length as i64;
	}

	stats.snapshot_baseline();

	stats
}

fn rank(query: &str) -> Vec<(&'static str, f64)> {
	let terms = corpus_terms();
	let stats = corpus_statistics(&terms);
	let query = bm25::query_vector(&stats, &AlphanumericTokenizer.tokenize(query));
	let mut scored: Vec<(&'static str, f64)> = terms
		.iter()
		.map(|(id, doc)| {
			let vector = bm25::document_vector(&stats, doc, &Bm25Params::default());

			(*id, Similarity::DotProduct.score(&vector, &query))
		})
		.filter(|(_, score)| *score != tessera_domain::similarity::NO_MATCH_SCORE)
		.collect();

	scored.sort_by(|a, b| tessera_domain::cmp_score_desc(a.1, b.1));

	scored
}

#[test]
fn corpus_statistics_match_reference_counts() {
	let stats = corpus_statistics(&corpus_terms());

	assert_eq!(stats.index_statistics.number_of_documents, 6);
	assert_eq!(stats.index_statistics.total_document_length, 15);
	assert_eq!(stats.number_of_words, 9);
	assert_eq!(stats.documents_containing("world"), 3);
	assert_eq!(stats.word_index("hello"), Some(0));
	assert_eq!(stats.word_index("world"), Some(1));
	assert_eq!(stats.word_index("bar"), Some(8));
}

#[test]
fn word_indices_are_unique_and_below_word_count() {
	let stats = corpus_statistics(&corpus_terms());
	let mut indices: Vec<u64> = stats.word_statistics.values().filter_map(|stat| stat.index).collect();

	indices.sort_unstable();
	indices.dedup();

	assert_eq!(indices.len(), stats.word_statistics.len());
	assert!(indices.iter().all(|idx| (*idx as i64) < stats.number_of_words));
}

#[test]
fn shorter_document_ranks_first_for_shared_term() {
	let ranked = rank("lorem");
	let ids: Vec<&str> = ranked.iter().map(|(id, _)| *id).collect();

	assert_eq!(ids, vec!["4", "3"]);
}

#[test]
fn rare_term_dominates_query() {
	let ranked = rank("foo world");

	assert_eq!(ranked.first().map(|(id, _)| *id), Some("5"));
	assert_eq!(ranked.len(), 4);
}
