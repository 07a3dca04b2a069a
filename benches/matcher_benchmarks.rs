#![allow(missing_docs)]
//! Benchmarks for keyword matching and record filtering.
//!
//! Compares the automaton-backed matcher against scanning each keyword on its
//! own, for keyword lists of growing size.

use bibsift::{ContainsFilter, EventCollector, KeywordMatcher, StreamEvent, StreamReceiver};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Generate `n` hbz-style identifiers.
fn keywords(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("HT{:09}", 12_700_000 + i * 7)).collect()
}

/// Literal values typical of a MARC record, none of which hit the keywords.
fn haystacks() -> Vec<String> {
    (0..200)
        .map(|i| format!("(DE-605)HT{:09} Geschichte der Stadt Köln, Band {i}", 99_000_000 + i))
        .collect()
}

/// Per-keyword scan with the same whole-word rule.
fn naive_is_match(keywords: &[String], text: &str) -> bool {
    keywords.iter().any(|keyword| {
        text.match_indices(keyword.as_str()).any(|(start, _)| {
            let end = start + keyword.len();
            let before = text[..start].chars().next_back();
            let after = text[end..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
    })
}

fn benchmark_matcher_vs_naive(c: &mut Criterion) {
    let texts = haystacks();
    let mut group = c.benchmark_group("keyword_matching");

    for size in [1, 10, 100, 1_000] {
        let list = keywords(size);
        let matcher = KeywordMatcher::new(&list).unwrap();

        group.bench_with_input(BenchmarkId::new("automaton", size), &texts, |b, texts| {
            b.iter(|| texts.iter().filter(|t| matcher.is_match(black_box(t))).count());
        });
        group.bench_with_input(BenchmarkId::new("per_keyword", size), &texts, |b, texts| {
            b.iter(|| {
                texts
                    .iter()
                    .filter(|t| naive_is_match(&list, black_box(t)))
                    .count()
            });
        });
    }

    group.finish();
}

fn benchmark_filter_records(c: &mut Criterion) {
    let list = keywords(1_000);
    let mut events = Vec::new();
    for (i, text) in haystacks().into_iter().enumerate() {
        events.push(StreamEvent::record_start(i.to_string()));
        events.push(StreamEvent::entity_start("035  "));
        events.push(StreamEvent::literal("a", text));
        events.push(StreamEvent::EntityEnd);
        events.push(StreamEvent::RecordEnd);
    }

    c.bench_function("filter_200_records_1k_keywords", |b| {
        b.iter(|| {
            let matcher = KeywordMatcher::new(&list).unwrap();
            let mut filter = ContainsFilter::new(matcher, EventCollector::new());
            for event in &events {
                event.dispatch_to(&mut filter).unwrap();
            }
            filter.close_stream().unwrap();
            filter.stats().records_discarded
        });
    });
}

criterion_group!(benches, benchmark_matcher_vs_naive, benchmark_filter_records);
criterion_main!(benches);
