use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use foldcmp_common::{AppConfig, RelativePath};
use foldcmp_core::{ContentHasher, LocalVfs, NoopSink, ParallelVerifier, TreeDiffWalker, TreeNode};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// Helper to create test directory structure
fn create_test_tree(root: &Path, depth: usize, files_per_dir: usize, file_size: usize) {
    if depth == 0 {
        return;
    }

    for i in 0..files_per_dir {
        fs::write(root.join(format!("file_{}.txt", i)), vec![b'x'; file_size]).unwrap();
    }

    if depth > 1 {
        for i in 0..3 {
            let dir_path = root.join(format!("subdir_{}", i));
            fs::create_dir(&dir_path).unwrap();
            create_test_tree(&dir_path, depth - 1, files_per_dir, file_size);
        }
    }
}

fn collect_files(root: &Path, base: &Path, out: &mut Vec<RelativePath>) {
    for entry in fs::read_dir(root).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect_files(&path, base, out);
        } else {
            out.push(RelativePath::from_path(path.strip_prefix(base).unwrap()));
        }
    }
}

fn bench_walker_identical(c: &mut Criterion) {
    let mut group = c.benchmark_group("walker_identical");

    for depth in [2, 3, 4].iter() {
        let left = TempDir::new().unwrap();
        let right = TempDir::new().unwrap();
        create_test_tree(left.path(), *depth, 10, 64);
        create_test_tree(right.path(), *depth, 10, 64);
        let left_vfs = LocalVfs::new(left.path().to_path_buf());
        let right_vfs = LocalVfs::new(right.path().to_path_buf());
        let walker = TreeDiffWalker::new(&AppConfig::default());

        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, _| {
            b.iter(|| {
                let outcome = walker
                    .walk(black_box(&left_vfs), black_box(&right_vfs), true, None)
                    .unwrap();
                black_box(outcome);
            });
        });
    }

    group.finish();
}

fn bench_walker_pruned(c: &mut Criterion) {
    c.bench_function("walker_pruned_missing_subtrees", |b| {
        let left = TempDir::new().unwrap();
        let right = TempDir::new().unwrap();
        create_test_tree(left.path(), 4, 10, 64);
        let left_vfs = LocalVfs::new(left.path().to_path_buf());
        let right_vfs = LocalVfs::new(right.path().to_path_buf());
        let walker = TreeDiffWalker::new(&AppConfig::default());

        b.iter(|| {
            let outcome = walker
                .walk(black_box(&left_vfs), black_box(&right_vfs), false, None)
                .unwrap();
            black_box(outcome);
        });
    });
}

fn bench_hasher_sizes(c: &mut Criterion) {
    let temp = TempDir::new().unwrap();
    let hasher = ContentHasher::new();
    let mut group = c.benchmark_group("hasher");

    for size in [1024usize, 1024 * 1024, 8 * 1024 * 1024].iter() {
        let path = temp.path().join(format!("blob_{}", size));
        fs::write(&path, vec![0xA5u8; *size]).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let digest = hasher.digest_file(black_box(&path));
                black_box(digest);
            });
        });
    }

    group.finish();
}

fn bench_verifier_workers(c: &mut Criterion) {
    let left = TempDir::new().unwrap();
    let right = TempDir::new().unwrap();
    create_test_tree(left.path(), 3, 20, 16 * 1024);
    create_test_tree(right.path(), 3, 20, 16 * 1024);

    let mut common = Vec::new();
    collect_files(left.path(), left.path(), &mut common);
    let left_vfs = LocalVfs::new(left.path().to_path_buf());
    let right_vfs = LocalVfs::new(right.path().to_path_buf());

    let mut group = c.benchmark_group("verifier_workers");

    for workers in [1, 4, 16].iter() {
        let verifier = ParallelVerifier::new(*workers);
        group.bench_with_input(BenchmarkId::from_parameter(workers), workers, |b, _| {
            b.iter(|| {
                let mismatches = verifier
                    .verify(black_box(&common), &left_vfs, &right_vfs, &NoopSink, None)
                    .unwrap();
                black_box(mismatches);
            });
        });
    }

    group.finish();
}

fn bench_tree_compression(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_rows");

    for count in [100, 1000, 10000].iter() {
        let paths: Vec<RelativePath> = (0..*count)
            .map(|i| RelativePath::new(format!("a{}/b/c{}/file_{}.txt", i % 10, i % 37, i)))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| {
                let tree = TreeNode::build(black_box(&paths));
                black_box(tree.rows());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_walker_identical,
    bench_walker_pruned,
    bench_hasher_sizes,
    bench_verifier_workers,
    bench_tree_compression,
);
criterion_main!(benches);
