use std::hint::black_box;

use codspeed_criterion_compat::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sylva_syntax::{GreenElement, GreenNode, GreenToken, ListShape, SyntaxKind};

fn list(shape: ListShape, len: usize) -> GreenNode {
    let children = (0..len)
        .map(|index| {
            let width = (index % 7 + 1) as u32;
            Some(GreenElement::from(GreenToken::new(SyntaxKind::NAME, width.into())))
        })
        .collect();
    GreenNode::with_shape(SyntaxKind::ARG_LIST, shape, children)
}

fn benchmark_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("Child Lookup");

    for len in [4, 9, 32, 256] {
        for (name, shape) in [("short", ListShape::Short), ("long", ListShape::Long)] {
            let node = list(shape, len);
            let width = u32::from(node.full_width());
            group.bench_with_input(BenchmarkId::new(name, len), &node, |b, node| {
                b.iter(|| {
                    for offset in (0..width).step_by(3) {
                        black_box(node.index_at_offset(offset.into()));
                    }
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, benchmark_lookup);
criterion_main!(benches);
