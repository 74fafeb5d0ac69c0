use inbox_text::{keywords_from_query, rank_bm25};

fn corpus() -> Vec<&'static str> {
	vec![
		"Weekly garden report: tomatoes and peppers",
		"Invoice for March electricity",
		"Re: invoice dispute with the landlord about the invoice",
		"Lunch on Friday?",
	]
}

fn words(ws: &[&str]) -> Vec<String> {
	ws.iter().map(|s| s.to_string()).collect()
}

#[test]
fn matches_come_first_then_rest_in_corpus_order() {
	let docs = corpus();
	let ranking = rank_bm25(&words(&["invoice"]), &docs, |d| d.to_string()).expect("rank");

	assert_eq!(ranking.len(), docs.len(), "every item is returned");
	let top: Vec<_> = ranking.iter().take(2).map(|s| s.item).collect();
	assert!(top.contains(&docs[1]) && top.contains(&docs[2]));
	assert!(ranking[0].score >= ranking[1].score);
	assert!(ranking[1].score > 0.0);
	assert_eq!(ranking[2].item, docs[0]);
	assert_eq!(ranking[3].item, docs[3]);
	assert_eq!(ranking[2].score, 0.0);
	assert_eq!(ranking[3].score, 0.0);
}

#[test]
fn keyword_case_does_not_matter() {
	let docs = corpus();
	let lower = rank_bm25(&words(&["tomatoes"]), &docs, |d| d.to_string()).expect("rank");
	let upper = rank_bm25(&words(&["TOMATOES"]), &docs, |d| d.to_string()).expect("rank");
	assert_eq!(lower[0].item, docs[0]);
	assert_eq!(lower, upper);
}

#[test]
fn ranking_is_deterministic() {
	let docs = corpus();
	let kws = keywords_from_query("invoice garden lunch");
	let a = rank_bm25(&kws, &docs, |d| d.to_string()).expect("rank");
	let b = rank_bm25(&kws, &docs, |d| d.to_string()).expect("rank");
	assert_eq!(a, b);
	for pair in a.windows(2) {
		assert!(pair[0].score >= pair[1].score);
	}
}

#[test]
fn empty_inputs_give_empty_ranking() {
	let docs = corpus();
	assert!(rank_bm25(&[], &docs, |d| d.to_string()).expect("rank").is_empty());
	let none: Vec<&str> = Vec::new();
	assert!(rank_bm25(&words(&["invoice"]), &none, |d| d.to_string()).expect("rank").is_empty());
}

#[test]
fn stop_word_keywords_score_nothing() {
	let docs = corpus();
	let ranking = rank_bm25(&words(&["the", "and"]), &docs, |d| d.to_string()).expect("rank");
	assert_eq!(ranking.len(), docs.len());
	assert!(ranking.iter().all(|s| s.score == 0.0));
	let order: Vec<_> = ranking.iter().map(|s| s.item).collect();
	assert_eq!(order, docs);
}

#[test]
fn repeated_keyword_adds_its_score_again() {
	let docs = corpus();
	let once = rank_bm25(&words(&["invoice"]), &docs, |d| d.to_string()).expect("rank");
	let twice = rank_bm25(&words(&["invoice", "invoice"]), &docs, |d| d.to_string()).expect("rank");

	let once_order: Vec<_> = once.iter().map(|s| s.item).collect();
	let twice_order: Vec<_> = twice.iter().map(|s| s.item).collect();
	assert_eq!(once_order, twice_order);
	for (a, b) in once.iter().zip(&twice) {
		assert!((b.score - 2.0 * a.score).abs() < 1e-4, "{} vs {}", b.score, a.score);
	}
}
