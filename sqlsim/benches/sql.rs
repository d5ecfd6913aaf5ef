use divan::{Bencher, black_box};
use sqlsim::{Dialect, Options, compare_sql, parse_sql};

fn main() {
    divan::main();
}

const JOIN_QUERY: &str = include_str!("../tests/fixtures/orders_by_user.sql");
const JOIN_QUERY_PENDING: &str = include_str!("../tests/fixtures/orders_by_user_pending.sql");
const AGGREGATE_QUERY: &str = include_str!("../tests/fixtures/revenue_by_region.sql");

#[divan::bench]
fn parse_join_query(bencher: Bencher) {
    bencher.bench_local(|| {
        let tree = parse_sql(black_box(JOIN_QUERY), Dialect::Generic).unwrap();
        black_box(tree);
    });
}

// Parse both sides and compare
#[divan::bench]
fn compare_near_duplicates(bencher: Bencher) {
    let options = Options::default();
    bencher.bench_local(|| {
        let cmp = compare_sql(black_box(JOIN_QUERY), black_box(JOIN_QUERY_PENDING), &options);
        black_box(cmp).unwrap();
    });
}

#[divan::bench]
fn compare_unrelated(bencher: Bencher) {
    let options = Options::default();
    bencher.bench_local(|| {
        let cmp = compare_sql(black_box(JOIN_QUERY), black_box(AGGREGATE_QUERY), &options);
        black_box(cmp).unwrap();
    });
}
