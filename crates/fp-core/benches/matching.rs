//! Benchmarks for trigger lookups and sharded URL matching.
//!
//! Run with: cargo bench --bench matching

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fp_core::{
    CategoryId, FilterRule, ListType, Request, RuleMatchError, RuleParseError, RuleParser, ShardedMatcher,
    TriggerTree,
};

struct ContainsRule(String);

impl FilterRule for ContainsRule {
    fn matches(&self, request: &Request<'_>) -> Result<bool, RuleMatchError> {
        Ok(request.host.ends_with(&self.0))
    }
}

struct ContainsParser;

impl RuleParser for ContainsParser {
    type Rule = ContainsRule;

    fn parse_rule(&self, line: &str) -> Result<ContainsRule, RuleParseError> {
        Ok(ContainsRule(line.to_string()))
    }
}

fn trigger_tree(count: usize) -> TriggerTree {
    let mut tree = TriggerTree::new();
    for i in 0..count {
        tree.add_trigger(&format!("trigger phrase {i}"), CategoryId(1 + (i % 8) as u32));
    }
    tree.sort_tree();
    tree
}

fn bench_triggers(c: &mut Criterion) {
    let mut group = c.benchmark_group("trie/contains_trigger");
    let text = "The quick brown fox jumps over the lazy dog, and then a trigger phrase 4999 shows up at the end.";
    let clean = "The quick brown fox jumps over the lazy dog without anything interesting happening at all.";

    for count in [100, 5_000] {
        let tree = trigger_tree(count);
        group.bench_with_input(BenchmarkId::new("hit", count), &tree, |b, tree| {
            b.iter(|| black_box(tree.contains_trigger(black_box(text))))
        });
        group.bench_with_input(BenchmarkId::new("miss", count), &tree, |b, tree| {
            b.iter(|| black_box(tree.contains_trigger(black_box(clean))))
        });
    }

    group.finish();
}

fn bench_sharded(c: &mut Criterion) {
    let mut group = c.benchmark_group("matcher/test_url");

    for capacity in [100, 1000] {
        let mut matcher = ShardedMatcher::with_shard_capacity(capacity);
        // Four categories of 2500 rules each, added category by category.
        for i in 0..10_000u32 {
            let line = format!("host{i}.example");
            matcher
                .add_rule(&ContainsParser, &line, CategoryId(1 + i / 2500), ListType::Blacklist)
                .unwrap();
        }
        assert!(matcher.shard_count() <= 10_000 / capacity + 4);

        let hit = Request::new("https://host9999.example/", "host9999.example");
        let miss = Request::new("https://clean.example/", "clean.example");

        group.bench_with_input(BenchmarkId::new("hit", capacity), &matcher, |b, m| {
            b.iter(|| black_box(m.test_url(black_box(&hit))))
        });
        group.bench_with_input(BenchmarkId::new("miss", capacity), &matcher, |b, m| {
            b.iter(|| black_box(m.test_url(black_box(&miss))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_triggers, bench_sharded);
criterion_main!(benches);
