use divan::{Bencher, black_box};
use treedist::{
    BatchOptions, CompareOptions, NamedTree, NodeData, PathStrategy, Tree, UnitCost, compare,
    compare_all,
};

fn main() {
    divan::main();
}

/// Balanced tree with `fanout` children per node down to `depth`.
fn balanced(depth: usize, fanout: usize, salt: usize) -> Tree {
    let mut tree = Tree::new(NodeData::new("Root"));
    let Some(root) = tree.root() else {
        return tree;
    };
    let mut frontier = vec![root];
    let mut counter = 0usize;
    for level in 0..depth {
        let mut next = Vec::with_capacity(frontier.len() * fanout);
        for parent in frontier {
            for _ in 0..fanout {
                counter += 1;
                let value = if counter % 7 == salt % 7 { "changed" } else { "same" };
                next.push(tree.add_child(parent, NodeData::with_value(format!("L{level}"), value)));
            }
        }
        frontier = next;
    }
    tree
}

/// Chain where every node has a leaf on the left and continues on the right.
fn right_skewed(length: usize, last: &str) -> Tree {
    let mut tree = Tree::new(NodeData::new("Expr"));
    let Some(mut spine) = tree.root() else {
        return tree;
    };
    for _ in 0..length {
        tree.add_child(spine, NodeData::with_value("Literal", "1"));
        spine = tree.add_child(spine, NodeData::new("BinaryOp"));
    }
    tree.add_child(spine, NodeData::with_value("Identifier", last));
    tree
}

/// Spine whose continuation alternates between the first and the last child.
fn zigzag(levels: usize, last: &str) -> Tree {
    let mut tree = Tree::new(NodeData::new("BinaryOp"));
    let Some(mut spine) = tree.root() else {
        return tree;
    };
    for level in 0..levels {
        let next = if level + 1 == levels {
            NodeData::with_value("Identifier", last)
        } else {
            NodeData::new("BinaryOp")
        };
        if level % 2 == 0 {
            let child = tree.add_child(spine, next);
            tree.add_child(spine, NodeData::with_value("Literal", "1"));
            spine = child;
        } else {
            tree.add_child(spine, NodeData::with_value("Literal", "1"));
            spine = tree.add_child(spine, next);
        }
    }
    tree
}

#[divan::bench(args = [2, 3, 4])]
fn balanced_pair(bencher: Bencher, depth: usize) {
    let a = balanced(depth, 4, 1);
    let b = balanced(depth, 4, 3);
    bencher.bench_local(|| {
        let result = compare(black_box(&a), black_box(&b), &UnitCost, &CompareOptions::default());
        black_box(result).unwrap();
    });
}

#[divan::bench(args = [2, 3, 4])]
fn balanced_pair_score_only(bencher: Bencher, depth: usize) {
    let a = balanced(depth, 4, 1);
    let b = balanced(depth, 4, 3);
    let options = CompareOptions {
        compute_script: false,
        ..CompareOptions::default()
    };
    bencher.bench_local(|| {
        let result = compare(black_box(&a), black_box(&b), &UnitCost, &options);
        black_box(result).unwrap();
    });
}

#[divan::bench(args = [
    PathStrategy::Auto,
    PathStrategy::Leftmost,
    PathStrategy::Rightmost,
    PathStrategy::HeavyPath,
])]
fn skewed_pair(bencher: Bencher, strategy: PathStrategy) {
    let a = right_skewed(60, "x");
    let b = right_skewed(60, "y");
    let options = CompareOptions {
        strategy,
        ..CompareOptions::default()
    };
    bencher.bench_local(|| {
        let result = compare(black_box(&a), black_box(&b), &UnitCost, &options);
        black_box(result).unwrap();
    });
}

#[divan::bench(args = [
    PathStrategy::Auto,
    PathStrategy::Leftmost,
    PathStrategy::HeavyPath,
])]
fn zigzag_pair(bencher: Bencher, strategy: PathStrategy) {
    let a = zigzag(50, "x");
    let b = zigzag(50, "y");
    let options = CompareOptions {
        compute_script: false,
        strategy,
        ..CompareOptions::default()
    };
    bencher.bench_local(|| {
        let result = compare(black_box(&a), black_box(&b), &UnitCost, &options);
        black_box(result).unwrap();
    });
}

#[divan::bench]
fn identical_fast_path(bencher: Bencher) {
    let a = balanced(4, 4, 1);
    let b = a.clone();
    bencher.bench_local(|| {
        let result = compare(black_box(&a), black_box(&b), &UnitCost, &CompareOptions::default());
        black_box(result).unwrap();
    });
}

#[divan::bench]
fn batch_of_twelve(bencher: Bencher) {
    let trees: Vec<NamedTree> = (0..12)
        .map(|i| NamedTree::new(format!("q{i:02}.sql"), balanced(3, 3, i)))
        .collect();
    bencher.bench_local(|| {
        let outcome = compare_all(black_box(&trees), &UnitCost, &BatchOptions::default());
        black_box(outcome).unwrap();
    });
}
